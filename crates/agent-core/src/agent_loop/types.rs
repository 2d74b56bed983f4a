use serde::{Deserialize, Serialize};

use crate::trace::TraceRecord;
use crate::usage::UsageRecord;
use webscout_sandbox::CommandOutcome;

/// An immutable request describing one agent run. Built by the caller,
/// never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub goal: String,
    pub url: Option<String>,
    pub selector: Option<String>,
    pub max_characters: Option<u32>,
    pub context: Option<String>,
}

impl Task {
    /// A browser-research task against a target URL.
    pub fn research(goal: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            goal: goal.into(),
            url: Some(url.into()),
            selector: None,
            max_characters: None,
            context: None,
        }
    }

    /// A general task with no predetermined target page.
    pub fn general(goal: impl Into<String>) -> Self {
        Self {
            goal: goal.into(),
            url: None,
            selector: None,
            max_characters: None,
            context: None,
        }
    }

    pub fn with_selector(mut self, selector: impl Into<String>) -> Self {
        self.selector = Some(selector.into());
        self
    }

    pub fn with_max_characters(mut self, max_characters: u32) -> Self {
        self.max_characters = Some(max_characters);
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}

/// Result of a browser-research run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutcome {
    pub summary: String,
    pub trace: Vec<TraceRecord>,
    pub usage: UsageRecord,
}

/// A nested browser-research run carried alongside the parent's own trace.
/// The sub-run's steps keep their own 1-based numbering and are never
/// interleaved with the parent's.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserFindings {
    pub goal: String,
    pub summary: String,
    pub trace: Vec<TraceRecord>,
}

/// Result of a general-agent run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralOutcome {
    pub summary: String,
    pub roadmap: Option<String>,
    pub trace: Vec<TraceRecord>,
    pub usage: UsageRecord,
    pub browser_findings: Vec<BrowserFindings>,
    pub commands: Vec<CommandOutcome>,
    /// Workspace-relative paths of artifacts written during the run.
    pub artifacts: Vec<String>,
}
