//! Token/usage accounting merged across nested agent invocations.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Named non-negative counters describing model consumption for a run.
///
/// Merging is field-wise saturating addition: commutative, associative, and
/// an absent counter contributes zero. Counters present in either side
/// survive the merge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UsageRecord(BTreeMap<String, u64>);

impl UsageRecord {
    pub const INPUT: &'static str = "input";
    pub const OUTPUT: &'static str = "output";
    pub const TOTAL: &'static str = "total";
    pub const CACHED: &'static str = "cached";

    pub fn new() -> Self {
        Self::default()
    }

    /// Build a record from `(name, value)` pairs; zero values are kept.
    pub fn from_counters<I, K>(counters: I) -> Self
    where
        I: IntoIterator<Item = (K, u64)>,
        K: Into<String>,
    {
        Self(counters.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn get(&self, name: &str) -> u64 {
        self.0.get(name).copied().unwrap_or(0)
    }

    pub fn set(&mut self, name: impl Into<String>, value: u64) {
        self.0.insert(name.into(), value);
    }

    pub fn add(&mut self, name: &str, value: u64) {
        let entry = self.0.entry(name.to_string()).or_insert(0);
        *entry = entry.saturating_add(value);
    }

    /// Fold `other` into `self`, summing same-named counters.
    pub fn merge(&mut self, other: &UsageRecord) {
        for (name, value) in &other.0 {
            self.add(name, *value);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn counters(&self) -> impl Iterator<Item = (&str, u64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_is_additive_and_order_independent() {
        let a = UsageRecord::from_counters([("input", 10u64), ("output", 5)]);
        let b = UsageRecord::from_counters([("output", 3u64), ("total", 8)]);

        let mut ab = a.clone();
        ab.merge(&b);
        let mut ba = b.clone();
        ba.merge(&a);

        let expected = UsageRecord::from_counters([("input", 10u64), ("output", 8), ("total", 8)]);
        assert_eq!(ab, expected);
        assert_eq!(ba, expected);
    }

    #[test]
    fn absent_counters_contribute_zero() {
        let mut a = UsageRecord::new();
        a.merge(&UsageRecord::from_counters([("cached", 4u64)]));
        assert_eq!(a.get("cached"), 4);
        assert_eq!(a.get("input"), 0);
    }

    #[test]
    fn merge_never_drops_a_counter() {
        let mut a = UsageRecord::from_counters([("input", 1u64)]);
        let b = UsageRecord::from_counters([("exotic", 2u64)]);
        a.merge(&b);
        assert_eq!(a.get("input"), 1);
        assert_eq!(a.get("exotic"), 2);
    }

    #[test]
    fn add_saturates() {
        let mut a = UsageRecord::from_counters([("total", u64::MAX)]);
        a.add("total", 1);
        assert_eq!(a.get("total"), u64::MAX);
    }
}
