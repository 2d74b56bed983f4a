use serde::{Deserialize, Serialize};

/// Loop bounds and options for one agent run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LoopConfig {
    /// Hard cap on model↔tool turns. The loop never exceeds this.
    pub max_steps: u32,
    /// Run the single-shot reflection pass after the loop ends.
    pub reflect: bool,
}

impl LoopConfig {
    pub const BROWSER_MAX_STEPS: u32 = 6;
    pub const GENERAL_MAX_STEPS: u32 = 14;

    /// Defaults for the narrow browser-research loop.
    pub fn browser() -> Self {
        Self {
            max_steps: Self::BROWSER_MAX_STEPS,
            reflect: true,
        }
    }

    /// Defaults for the general loop.
    pub fn general() -> Self {
        Self {
            max_steps: Self::GENERAL_MAX_STEPS,
            reflect: false,
        }
    }

    pub fn with_max_steps(mut self, max_steps: u32) -> Self {
        self.max_steps = max_steps.max(1);
        self
    }

    pub fn with_reflection(mut self, reflect: bool) -> Self {
        self.reflect = reflect;
        self
    }
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self::browser()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_variants() {
        assert_eq!(LoopConfig::browser().max_steps, 6);
        assert!(LoopConfig::browser().reflect);
        assert_eq!(LoopConfig::general().max_steps, 14);
        assert!(!LoopConfig::general().reflect);
    }

    #[test]
    fn max_steps_never_drops_to_zero() {
        assert_eq!(LoopConfig::browser().with_max_steps(0).max_steps, 1);
    }
}
