//! The bounded model↔tool loop, in two variants.
//!
//! [`BrowserResearchAgent`] drives the narrow navigate/extract/snapshot loop;
//! [`GeneralAgent`] adds planning, shell, and artifact tools and can run a
//! full browser research sub-task as a single tool call. Both terminate by
//! construction: a hard turn cap bounds every run regardless of what the
//! model does.

mod browser_agent;
mod config;
mod general_agent;
pub mod prompt;
mod types;

pub use browser_agent::BrowserResearchAgent;
pub use config::LoopConfig;
pub use general_agent::GeneralAgent;
pub use types::{BrowserFindings, GeneralOutcome, RunOutcome, Task};
