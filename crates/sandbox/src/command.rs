//! Allow-listed process execution with bounded wall-clock time and output.

use std::process::Stdio;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::paths::workspace_relative;
use crate::{truncate_chars, Sandbox, SandboxError, MAX_STREAM_CHARS};

/// Default per-command wall-clock budget.
pub const DEFAULT_COMMAND_TIMEOUT_MS: u64 = 120_000;
/// Upper bound a caller may request.
pub const MAX_COMMAND_TIMEOUT_MS: u64 = 300_000;

/// Executables the sandbox will spawn. Anything else is rejected outright.
const ALLOWED_COMMANDS: &[&str] = &[
    "ls", "cat", "head", "tail", "wc", "grep", "find", "echo", "pwd", "mkdir", "touch", "sort",
    "uniq", "diff", "sed", "awk", "tar", "du", "stat", "cp", "mv", "rm", "node", "npm", "npx",
    "pnpm", "yarn", "python", "python3", "pip", "cargo", "git",
];

/// Destructive or interpretive commands that get extra argument scrutiny.
const HIGH_RISK_COMMANDS: &[&str] = &["rm", "cp", "mv", "node", "python", "python3", "sed", "awk"];

/// Flags that would let an interpreter run inline code, bypassing the
/// workspace boundary entirely.
const INLINE_CODE_FLAGS: &[&str] = &["-c", "-e", "-p", "--eval", "-lc", "-Command"];

/// A validated request to run one process inside the workspace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandRequest {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// Wall-clock budget in milliseconds; clamped to [`MAX_COMMAND_TIMEOUT_MS`].
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

/// What happened when a command ran. A non-zero or absent exit code is data,
/// not an error: "ran and failed" is distinct from "could not run".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandOutcome {
    pub command: String,
    pub args: Vec<String>,
    /// Working directory, workspace-relative.
    pub cwd: String,
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
    pub timed_out: bool,
}

impl Sandbox {
    /// Validate and execute `request` inside the workspace root.
    ///
    /// Rejections (allow-list, inline-code flags, path escapes) happen before
    /// any process is spawned. On timeout the child is forcibly terminated
    /// and the outcome reports `timed_out`.
    pub async fn run_command(&self, request: CommandRequest) -> Result<CommandOutcome, SandboxError> {
        let program = validate_command_name(&request.command)?;
        if is_high_risk(program) {
            self.scrutinise_high_risk(program, &request.args)?;
        }

        let timeout = Duration::from_millis(
            request
                .timeout_ms
                .unwrap_or(DEFAULT_COMMAND_TIMEOUT_MS)
                .min(MAX_COMMAND_TIMEOUT_MS),
        );

        debug!(command = program, args = ?request.args, "spawning sandboxed command");
        let child = Command::new(program)
            .args(&request.args)
            .current_dir(self.root())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| SandboxError::Spawn {
                command: program.to_string(),
                source,
            })?;

        let cwd = workspace_relative(self.root(), self.root());
        match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => Ok(CommandOutcome {
                command: program.to_string(),
                args: request.args,
                cwd,
                stdout: truncate_chars(&String::from_utf8_lossy(&output.stdout), MAX_STREAM_CHARS),
                stderr: truncate_chars(&String::from_utf8_lossy(&output.stderr), MAX_STREAM_CHARS),
                exit_code: output.status.code(),
                timed_out: false,
            }),
            Ok(Err(source)) => Err(SandboxError::Spawn {
                command: program.to_string(),
                source,
            }),
            // Dropping the wait future drops the child, which kills the
            // process (kill_on_drop).
            Err(_) => {
                warn!(command = program, timeout_ms = timeout.as_millis() as u64, "command timed out");
                Ok(CommandOutcome {
                    command: program.to_string(),
                    args: request.args,
                    cwd,
                    stdout: String::new(),
                    stderr: String::new(),
                    exit_code: None,
                    timed_out: true,
                })
            }
        }
    }

    /// High-risk commands must not carry inline-code flags and must target at
    /// least one argument that resolves inside the workspace.
    fn scrutinise_high_risk(&self, command: &str, args: &[String]) -> Result<(), SandboxError> {
        let mut workspace_path_seen = false;
        for arg in args {
            if arg.starts_with('-') {
                if INLINE_CODE_FLAGS.contains(&arg.as_str()) {
                    return Err(SandboxError::HighRiskRejected {
                        command: command.to_string(),
                        reason: format!("inline code flag `{arg}` is not permitted"),
                    });
                }
                continue;
            }
            match self.resolve_path(arg) {
                Ok(_) => workspace_path_seen = true,
                Err(err @ SandboxError::PathEscape { .. }) => return Err(err),
                Err(_) => {}
            }
        }
        if !workspace_path_seen {
            return Err(SandboxError::HighRiskRejected {
                command: command.to_string(),
                reason: "no argument resolves to an in-workspace path".to_string(),
            });
        }
        Ok(())
    }
}

fn validate_command_name(raw: &str) -> Result<&str, SandboxError> {
    let name = raw.trim();
    if name.is_empty() || name.contains(['/', '\\']) {
        return Err(SandboxError::DisallowedCommand(raw.to_string()));
    }
    ALLOWED_COMMANDS
        .iter()
        .find(|candidate| **candidate == name)
        .copied()
        .ok_or_else(|| SandboxError::DisallowedCommand(raw.to_string()))
}

fn is_high_risk(command: &str) -> bool {
    HIGH_RISK_COMMANDS.contains(&command)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sandbox() -> (tempfile::TempDir, Sandbox) {
        let dir = tempfile::tempdir().expect("tempdir");
        let sandbox = Sandbox::new(dir.path()).expect("sandbox");
        (dir, sandbox)
    }

    fn request(command: &str, args: &[&str]) -> CommandRequest {
        CommandRequest {
            command: command.to_string(),
            args: args.iter().map(|s| s.to_string()).collect(),
            timeout_ms: None,
        }
    }

    #[tokio::test]
    async fn disallowed_command_is_rejected_without_spawning() {
        let (_dir, sandbox) = sandbox();
        let err = sandbox.run_command(request("curl", &["https://example.com"])).await;
        assert!(matches!(err, Err(SandboxError::DisallowedCommand(name)) if name == "curl"));
    }

    #[tokio::test]
    async fn allow_listed_command_runs() {
        let (_dir, sandbox) = sandbox();
        let outcome = sandbox
            .run_command(request("ls", &["-la", "."]))
            .await
            .expect("ls runs");
        assert_eq!(outcome.exit_code, Some(0));
        assert!(!outcome.timed_out);
        assert_eq!(outcome.cwd, ".");
    }

    #[tokio::test]
    async fn high_risk_without_path_argument_is_rejected() {
        let (_dir, sandbox) = sandbox();
        let err = sandbox.run_command(request("rm", &["-rf", "--force"])).await;
        assert!(matches!(err, Err(SandboxError::HighRiskRejected { .. })));
    }

    #[tokio::test]
    async fn high_risk_with_workspace_path_is_accepted() {
        let (_dir, sandbox) = sandbox();
        std::fs::create_dir_all(sandbox.root().join("build")).expect("mkdir");
        let outcome = sandbox
            .run_command(request("rm", &["-rf", "build"]))
            .await
            .expect("rm runs");
        assert_eq!(outcome.exit_code, Some(0));
    }

    #[tokio::test]
    async fn inline_code_flag_is_rejected() {
        let (_dir, sandbox) = sandbox();
        let err = sandbox
            .run_command(request("python3", &["-c", "print(1)"]))
            .await;
        assert!(matches!(err, Err(SandboxError::HighRiskRejected { .. })));
    }

    #[tokio::test]
    async fn high_risk_path_escape_beats_allow_list() {
        let (_dir, sandbox) = sandbox();
        let err = sandbox
            .run_command(request("rm", &["-rf", "../../etc"]))
            .await;
        assert!(matches!(err, Err(SandboxError::PathEscape { .. })));
    }

    #[tokio::test]
    async fn nonzero_exit_is_reported_not_raised() {
        let (_dir, sandbox) = sandbox();
        let outcome = sandbox
            .run_command(request("ls", &["definitely-not-here"]))
            .await
            .expect("ls spawns");
        assert_ne!(outcome.exit_code, Some(0));
    }

    #[tokio::test]
    async fn command_path_separators_are_rejected() {
        let (_dir, sandbox) = sandbox();
        let err = sandbox.run_command(request("/bin/ls", &[])).await;
        assert!(matches!(err, Err(SandboxError::DisallowedCommand(_))));
    }
}
