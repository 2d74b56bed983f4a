//! Workspace-rooted sandbox for the general agent's tooling.
//!
//! Every path-bearing operation resolves its argument against a single
//! workspace root before any I/O happens; anything that escapes the root is
//! rejected. Command execution is limited to a fixed allow-list with extra
//! scrutiny for destructive or interpretive programs.

mod artifacts;
mod command;
mod paths;

use std::path::{Path, PathBuf};

use thiserror::Error;

pub use artifacts::{ArtifactEntry, ArtifactKind, ListingOptions, ReadOutcome, WriteOutcome};
pub use command::{CommandOutcome, CommandRequest, DEFAULT_COMMAND_TIMEOUT_MS, MAX_COMMAND_TIMEOUT_MS};
pub use paths::workspace_relative;

/// Hard cap on a single artifact read, in bytes.
pub const MAX_READ_BYTES: u64 = 200_000;
/// Hard cap on directory listing entries.
pub const MAX_LIST_ENTRIES: usize = 200;
/// Captured stdout/stderr are truncated to this many characters each.
pub const MAX_STREAM_CHARS: usize = 4_000;

/// Errors emitted by the sandbox crate.
///
/// `CommandOutcome` with a non-zero exit code is *not* an error: a process
/// that ran and failed is reported as data. These variants cover operations
/// that never reached, or never should reach, the operating system.
#[derive(Debug, Error)]
pub enum SandboxError {
    /// A path argument resolves outside the workspace root.
    #[error("path `{path}` escapes workspace root {root}")]
    PathEscape { path: String, root: String },

    /// A path argument is empty or otherwise unusable.
    #[error("invalid path argument: {0}")]
    InvalidPath(String),

    /// The executable name is not on the allow-list.
    #[error("command `{0}` is not allow-listed")]
    DisallowedCommand(String),

    /// An allow-listed but high-risk command failed extra scrutiny.
    #[error("command `{command}` rejected: {reason}")]
    HighRiskRejected { command: String, reason: String },

    /// The process could not be spawned at all (missing binary, permissions).
    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// Filesystem failure inside the workspace.
    #[error("workspace I/O failed for `{path}`: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// A sandbox bound to one workspace root for the duration of a run.
///
/// The root is resolved exactly once at construction; nothing in the
/// sandbox re-reads configuration afterwards.
#[derive(Debug, Clone)]
pub struct Sandbox {
    root: PathBuf,
}

impl Sandbox {
    /// Bind the sandbox to `root`. The directory is created if missing and
    /// canonicalised so later prefix checks compare resolved paths.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, SandboxError> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|source| SandboxError::Io {
            path: root.display().to_string(),
            source,
        })?;
        let root = root.canonicalize().map_err(|source| SandboxError::Io {
            path: root.display().to_string(),
            source,
        })?;
        Ok(Self { root })
    }

    /// The canonical workspace root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `raw` to an absolute path inside the workspace root, or fail
    /// with [`SandboxError::PathEscape`] before any I/O takes place.
    pub fn resolve_path(&self, raw: &str) -> Result<PathBuf, SandboxError> {
        paths::resolve_inside_root(&self.root, raw)
    }
}

/// Truncate `text` to at most `limit` characters, appending nothing.
///
/// Idempotent: truncating an already-truncated string to the same or a
/// larger limit returns it unchanged.
pub fn truncate_chars(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    text.chars().take(limit).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_is_idempotent() {
        let input = "abcdef";
        let once = truncate_chars(input, 4);
        assert_eq!(once, "abcd");
        assert_eq!(truncate_chars(&once, 4), once);
        assert_eq!(truncate_chars(&once, 10), once);
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        let input = "héllö wörld";
        let out = truncate_chars(input, 5);
        assert_eq!(out.chars().count(), 5);
        assert_eq!(out, "héllö");
    }

    #[test]
    fn truncate_short_input_unchanged() {
        assert_eq!(truncate_chars("ok", 100), "ok");
    }
}
