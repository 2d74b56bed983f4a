//! Append-only record of tool executions within one loop run.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::tools::ToolId;

/// One successful tool execution: its 1-based position, the validated input
/// as the model supplied it, and the serialized output fed back to the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceRecord {
    pub step: u32,
    pub tool: ToolId,
    pub input: Value,
    pub output: Value,
}

/// Ordered trace accumulator. Step numbers are assigned monotonically for
/// successful executions only; rejected tool calls never consume a number.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ToolTrace {
    records: Vec<TraceRecord>,
}

impl ToolTrace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record and return its assigned step number.
    pub fn record(&mut self, tool: ToolId, input: Value, output: Value) -> u32 {
        let step = self.records.len() as u32 + 1;
        self.records.push(TraceRecord {
            step,
            tool,
            input,
            output,
        });
        step
    }

    pub fn records(&self) -> &[TraceRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn into_records(self) -> Vec<TraceRecord> {
        self.records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn steps_are_one_based_and_gapless() {
        let mut trace = ToolTrace::new();
        let s1 = trace.record(ToolId::Navigate, json!({"url": "https://a"}), json!({}));
        let s2 = trace.record(ToolId::ExtractText, json!({}), json!({"text": "x"}));
        let s3 = trace.record(ToolId::DomSnapshot, json!({}), json!({"html": "<p/>"}));
        assert_eq!((s1, s2, s3), (1, 2, 3));

        let steps: Vec<u32> = trace.records().iter().map(|r| r.step).collect();
        assert_eq!(steps, vec![1, 2, 3]);
    }
}
