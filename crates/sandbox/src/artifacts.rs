//! Workspace file access: write, bounded read, bounded listing.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::paths::workspace_relative;
use crate::{Sandbox, SandboxError, MAX_LIST_ENTRIES, MAX_READ_BYTES};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    File,
    Directory,
}

/// One entry from a workspace listing, path workspace-relative.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactEntry {
    pub path: String,
    pub kind: ArtifactKind,
    pub size_bytes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WriteOutcome {
    pub path: String,
    pub bytes_written: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadOutcome {
    pub path: String,
    pub content: String,
    /// True when the file held more bytes than the read budget.
    pub truncated: bool,
    pub total_bytes: u64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ListingOptions {
    pub recursive: bool,
    /// Entry cap; `None` means [`MAX_LIST_ENTRIES`], larger values are clamped.
    pub max_entries: Option<usize>,
}

impl Sandbox {
    /// Write `content` to a workspace path, creating parent directories.
    pub async fn write_artifact(&self, raw_path: &str, content: &str) -> Result<WriteOutcome, SandboxError> {
        let path = self.resolve_path(raw_path)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| SandboxError::Io {
                    path: parent.display().to_string(),
                    source,
                })?;
        }
        tokio::fs::write(&path, content)
            .await
            .map_err(|source| SandboxError::Io {
                path: path.display().to_string(),
                source,
            })?;
        let relative = workspace_relative(self.root(), &path);
        debug!(path = %relative, bytes = content.len(), "wrote artifact");
        Ok(WriteOutcome {
            path: relative,
            bytes_written: content.len() as u64,
        })
    }

    /// Read a workspace file, returning at most `max_bytes` of it (clamped to
    /// [`MAX_READ_BYTES`]). Truncation lands on a UTF-8 boundary.
    pub async fn read_artifact(&self, raw_path: &str, max_bytes: Option<u64>) -> Result<ReadOutcome, SandboxError> {
        let path = self.resolve_path(raw_path)?;
        let budget = max_bytes.unwrap_or(MAX_READ_BYTES).min(MAX_READ_BYTES) as usize;
        let bytes = tokio::fs::read(&path).await.map_err(|source| SandboxError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let total_bytes = bytes.len() as u64;
        let truncated = bytes.len() > budget;
        let window = if truncated { &bytes[..budget] } else { &bytes[..] };
        let mut content = String::from_utf8_lossy(window).into_owned();
        if truncated {
            // from_utf8_lossy may have minted a replacement char from a byte
            // cut mid-codepoint; drop it rather than report mangled text.
            if content.ends_with('\u{FFFD}') {
                content.pop();
            }
        }
        Ok(ReadOutcome {
            path: workspace_relative(self.root(), &path),
            content,
            truncated,
            total_bytes,
        })
    }

    /// List a workspace directory, sorted lexicographically by relative
    /// path. The walk stops as soon as the entry cap ([`MAX_LIST_ENTRIES`]
    /// at most) is reached, so a huge tree never costs more than a capped
    /// answer's worth of traversal.
    pub async fn list_artifacts(&self, raw_path: &str, options: ListingOptions) -> Result<Vec<ArtifactEntry>, SandboxError> {
        let start = self.resolve_path(raw_path)?;
        let cap = options
            .max_entries
            .unwrap_or(MAX_LIST_ENTRIES)
            .min(MAX_LIST_ENTRIES);

        let mut entries = Vec::new();
        let mut pending: Vec<PathBuf> = vec![start];
        'walk: while let Some(dir) = pending.pop() {
            let mut reader = tokio::fs::read_dir(&dir)
                .await
                .map_err(|source| SandboxError::Io {
                    path: dir.display().to_string(),
                    source,
                })?;
            while let Some(entry) = reader.next_entry().await.map_err(|source| SandboxError::Io {
                path: dir.display().to_string(),
                source,
            })? {
                let path = entry.path();
                let metadata = entry.metadata().await.map_err(|source| SandboxError::Io {
                    path: path.display().to_string(),
                    source,
                })?;
                let kind = if metadata.is_dir() {
                    ArtifactKind::Directory
                } else {
                    ArtifactKind::File
                };
                if options.recursive && metadata.is_dir() {
                    pending.push(path.clone());
                }
                entries.push(ArtifactEntry {
                    path: workspace_relative(self.root(), &path),
                    kind,
                    size_bytes: if metadata.is_dir() { 0 } else { metadata.len() },
                });
                if entries.len() >= cap {
                    break 'walk;
                }
            }
        }
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(entries)
    }
}
