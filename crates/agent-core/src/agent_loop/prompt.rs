//! System prompts, task framing, and completion-marker detection.

use crate::tools::ToolDescriptor;

use super::types::Task;

/// The sentinel the model must emit, at the start of a line, to signal it
/// considers the task finished.
pub const COMPLETION_MARKER: &str = "DONE:";

/// Case-insensitive line-start scan for the completion marker.
///
/// This is a plain-text heuristic: a model that quotes the marker inside a
/// sentence mid-line will not trip it, and one that emits it spuriously at a
/// line start will. Known limitation, kept deliberately simple and covered
/// by tests.
pub fn contains_completion_marker(text: &str) -> bool {
    text.lines()
        .any(|line| starts_with_ignore_case(line.trim_start(), COMPLETION_MARKER))
}

fn starts_with_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack
        .get(..needle.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(needle))
}

pub fn browser_system_prompt(tools: &[ToolDescriptor]) -> String {
    let mut lines = vec![
        "You are a web research agent. Work towards the goal by calling the \
         tools below, one call per turn."
            .to_string(),
        String::new(),
        "Tools:".to_string(),
    ];
    lines.extend(tools.iter().map(ToolDescriptor::prompt_block));
    lines.push(String::new());
    lines.push(format!(
        "Typical flow: navigate to the target URL, extract the relevant text, \
         inspect the DOM only if extraction is insufficient. When you have \
         enough to answer, reply with a Markdown summary whose final line \
         starts with \"{COMPLETION_MARKER}\" followed by a one-sentence \
         conclusion."
    ));
    lines.join("\n")
}

pub fn general_system_prompt(tools: &[ToolDescriptor]) -> String {
    let mut lines = vec![
        "You are an autonomous research-and-build agent operating inside a \
         sandboxed workspace. Call at most one tool per turn."
            .to_string(),
        String::new(),
        "Tools:".to_string(),
    ];
    lines.extend(tools.iter().map(ToolDescriptor::prompt_block));
    lines.push(String::new());
    lines.push(format!(
        "Plan before acting on multi-stage goals. All paths are relative to \
         the workspace root; commands outside it are rejected. When the goal \
         is met, reply with a final summary whose last line starts with \
         \"{COMPLETION_MARKER}\"."
    ));
    lines.join("\n")
}

/// Initial user message for the browser-research loop: the task as data
/// lines, then the completion instruction.
pub fn browser_task_framing(task: &Task) -> String {
    let mut lines = vec![format!("Goal: {}", task.goal)];
    if let Some(url) = &task.url {
        lines.push(format!("URL: {url}"));
    }
    if let Some(selector) = &task.selector {
        lines.push(format!("Selector: {selector}"));
    }
    if let Some(max_characters) = task.max_characters {
        lines.push(format!("Max characters: {max_characters}"));
    }
    lines.push(format!(
        "Finish with a line starting with \"{COMPLETION_MARKER}\"."
    ));
    lines.join("\n")
}

pub fn general_task_framing(task: &Task) -> String {
    let mut lines = vec![format!("Goal: {}", task.goal)];
    if let Some(context) = &task.context {
        lines.push(format!("Context: {context}"));
    }
    lines.push(format!(
        "Finish with a line starting with \"{COMPLETION_MARKER}\"."
    ));
    lines.join("\n")
}

/// Prompt for the single-shot reflection pass over a draft summary.
pub fn reflection_prompt(goal: &str, transcript: &str, draft: &str) -> String {
    format!(
        "Review this research run and improve the draft summary if you can.\n\
         Goal: {goal}\n\nTool transcript:\n{transcript}\n\nDraft summary:\n{draft}\n\n\
         Reply with the final Markdown summary. Its last line must start with \
         \"{COMPLETION_MARKER}\"."
    )
}

/// Prompt used by the `plan` tool to produce a roadmap.
pub fn plan_prompt(objective: &str) -> String {
    format!(
        "Produce a concise, numbered roadmap for the following objective. \
         Each step on its own line.\nObjective: {objective}"
    )
}

/// Prompt used by the `design_automation` tool.
pub fn design_prompt(prompt: &str, channels: &[String], languages: &[String]) -> String {
    let mut lines = vec![
        "Draft an automation design as Markdown: overview, message flows, and \
         rollout notes."
            .to_string(),
        format!("Brief: {prompt}"),
    ];
    if !channels.is_empty() {
        lines.push(format!("Channels: {}", channels.join(", ")));
    }
    if !languages.is_empty() {
        lines.push(format!("Languages: {}", languages.join(", ")));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marker_detection_is_case_insensitive_at_line_start() {
        assert!(contains_completion_marker("DONE: all set"));
        assert!(contains_completion_marker("done: all set"));
        assert!(contains_completion_marker("Summary first.\nDone: wrapped up"));
        assert!(contains_completion_marker("  DONE: indented still counts"));
    }

    #[test]
    fn marker_mid_line_does_not_count() {
        assert!(!contains_completion_marker("The work is DONE: or is it"));
        assert!(!contains_completion_marker("nothing to see"));
        assert!(!contains_completion_marker("DONE without the colon"));
    }

    #[test]
    fn framing_lists_task_data() {
        let task = Task::research("Summarise the homepage", "https://example.com")
            .with_selector("main")
            .with_max_characters(1200);
        let framing = browser_task_framing(&task);
        assert!(framing.contains("Goal: Summarise the homepage"));
        assert!(framing.contains("URL: https://example.com"));
        assert!(framing.contains("Selector: main"));
        assert!(framing.contains("Max characters: 1200"));
        assert!(framing.contains(COMPLETION_MARKER));
    }
}
