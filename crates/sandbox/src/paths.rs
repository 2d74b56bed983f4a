//! Path resolution against the workspace boundary.

use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};

use crate::SandboxError;

/// Resolve `raw` against `root`, rejecting anything that would land outside.
///
/// Relative inputs join onto the root; absolute inputs are accepted only when
/// already inside it. `..` components are folded lexically first so a path
/// like `a/../../etc` is caught even when none of its segments exist yet,
/// then existing prefixes are canonicalised to defeat symlink detours.
pub(crate) fn resolve_inside_root(root: &Path, raw: &str) -> Result<PathBuf, SandboxError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(SandboxError::InvalidPath(
            "path must be a non-empty string".to_string(),
        ));
    }

    let candidate = if Path::new(trimmed).is_absolute() {
        PathBuf::from(trimmed)
    } else {
        root.join(trimmed)
    };

    let folded = fold_dot_segments(&candidate).ok_or_else(|| SandboxError::PathEscape {
        path: raw.to_string(),
        root: root.display().to_string(),
    })?;

    let resolved = canonicalize_with_missing_segments(&folded)?;
    if !resolved.starts_with(root) {
        return Err(SandboxError::PathEscape {
            path: raw.to_string(),
            root: root.display().to_string(),
        });
    }
    Ok(resolved)
}

/// Render `path` relative to `root` with forward slashes, for result payloads.
pub fn workspace_relative(root: &Path, path: &Path) -> String {
    match path.strip_prefix(root) {
        Ok(relative) => {
            let text = relative.to_string_lossy().replace('\\', "/");
            if text.is_empty() {
                ".".to_string()
            } else {
                text
            }
        }
        Err(_) => path.display().to_string(),
    }
}

/// Lexically fold `.` and `..` components. Returns None when `..` would
/// climb past the path's own prefix.
fn fold_dot_segments(path: &Path) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    return None;
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    Some(out)
}

/// Canonicalise the longest existing prefix of `path` and re-append the
/// missing tail, so not-yet-created artifact paths still resolve.
fn canonicalize_with_missing_segments(path: &Path) -> Result<PathBuf, SandboxError> {
    let mut cursor = path.to_path_buf();
    let mut missing = Vec::<OsString>::new();
    loop {
        if cursor.exists() {
            let mut resolved = cursor.canonicalize().map_err(|source| SandboxError::Io {
                path: cursor.display().to_string(),
                source,
            })?;
            for part in missing.iter().rev() {
                resolved.push(part);
            }
            return Ok(resolved);
        }

        let file_name = cursor
            .file_name()
            .ok_or_else(|| SandboxError::InvalidPath(format!("unresolvable path {}", path.display())))?;
        missing.push(file_name.to_os_string());
        cursor = cursor
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| SandboxError::InvalidPath(format!("unresolvable path {}", path.display())))?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Sandbox;

    #[test]
    fn relative_path_resolves_under_root() {
        let dir = tempfile::tempdir().expect("tempdir");
        let sandbox = Sandbox::new(dir.path()).expect("sandbox");
        let resolved = sandbox.resolve_path("notes/log.txt").expect("resolve");
        assert!(resolved.starts_with(sandbox.root()));
        assert!(resolved.ends_with("notes/log.txt"));
    }

    #[test]
    fn parent_traversal_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let sandbox = Sandbox::new(dir.path()).expect("sandbox");
        let err = sandbox.resolve_path("../../etc/passwd").unwrap_err();
        assert!(matches!(err, SandboxError::PathEscape { .. }));
    }

    #[test]
    fn absolute_path_outside_root_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let sandbox = Sandbox::new(dir.path()).expect("sandbox");
        let err = sandbox.resolve_path("/etc/passwd").unwrap_err();
        assert!(matches!(err, SandboxError::PathEscape { .. }));
    }

    #[test]
    fn traversal_inside_root_is_allowed() {
        let dir = tempfile::tempdir().expect("tempdir");
        let sandbox = Sandbox::new(dir.path()).expect("sandbox");
        let resolved = sandbox.resolve_path("a/b/../c.txt").expect("resolve");
        assert!(resolved.starts_with(sandbox.root()));
        assert!(resolved.ends_with("a/c.txt"));
    }

    #[test]
    fn empty_path_is_invalid() {
        let dir = tempfile::tempdir().expect("tempdir");
        let sandbox = Sandbox::new(dir.path()).expect("sandbox");
        assert!(matches!(
            sandbox.resolve_path("   "),
            Err(SandboxError::InvalidPath(_))
        ));
    }

    #[test]
    fn workspace_relative_renders_dot_for_root() {
        let dir = tempfile::tempdir().expect("tempdir");
        let sandbox = Sandbox::new(dir.path()).expect("sandbox");
        assert_eq!(workspace_relative(sandbox.root(), sandbox.root()), ".");
    }
}
