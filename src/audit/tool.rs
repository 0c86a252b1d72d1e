//! External tool invocation for dependency resolution and auditing.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

use super::workspace::Workspace;
use crate::error::AuditError;
use crate::model::Manifest;

/// File name the manifest is written to inside a workspace.
pub const MANIFEST_FILE: &str = "package.json";

/// A program plus its arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl ToolCommand {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Lockfile-only resolution: silent, no bin links, no audit, and no
    /// lifecycle scripts from the dependency graph.
    pub fn npm_install() -> Self {
        Self::new(
            npm_program(),
            [
                "i",
                "--silent",
                "--package-lock-only",
                "--no-bin-links",
                "--no-audit",
                "--ignore-scripts",
            ],
        )
    }

    /// Audit of the resolved tree as a single JSON document on stdout.
    pub fn npm_audit() -> Self {
        Self::new(npm_program(), ["audit", "--json"])
    }

    /// Runs the command in `cwd` and captures its output.
    ///
    /// A non-zero exit is not an error here. Failing to start the process,
    /// or exceeding `timeout`, is. The child is killed if this future is
    /// dropped before it finishes.
    pub async fn run(&self, cwd: &Path, timeout: Option<Duration>) -> Result<ToolOutput, AuditError> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .kill_on_drop(true);
        let child = command.output();

        let output = match timeout {
            Some(limit) => tokio::time::timeout(limit, child)
                .await
                .map_err(|_| AuditError::Timeout {
                    command: self.to_string(),
                    timeout: limit,
                })?,
            None => child.await,
        }
        .map_err(|source| AuditError::Invocation {
            command: self.to_string(),
            source,
        })?;

        let result = ToolOutput {
            code: output.status.code(),
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        debug!(command = %self, code = ?result.code, "tool finished");
        Ok(result)
    }
}

impl std::fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Captured result of one tool run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    /// Exit code, `None` when the process was killed by a signal.
    pub code: Option<i32>,
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    fn code_string(&self) -> String {
        self.code
            .map(|c| c.to_string())
            .unwrap_or_else(|| "signal".to_string())
    }
}

/// Writes the manifest into the workspace and resolves its dependency graph.
///
/// Resolution is a prerequisite for auditing, so a non-zero exit fails.
pub async fn resolve(
    workspace: &Workspace,
    manifest: &Manifest,
    command: &ToolCommand,
    timeout: Option<Duration>,
) -> Result<ToolOutput, AuditError> {
    let path = workspace.file(MANIFEST_FILE);
    let text = manifest.to_text()?;
    tokio::fs::write(&path, text)
        .await
        .map_err(|source| AuditError::Write { path, source })?;

    let output = command.run(workspace.path(), timeout).await?;
    if !output.success {
        return Err(AuditError::ToolFailed {
            command: command.to_string(),
            code: output.code_string(),
            stderr: output.stderr.trim().to_string(),
        });
    }

    Ok(output)
}

/// Audits the resolved tree in the workspace.
///
/// Audit tools exit non-zero when they find vulnerabilities, so the exit
/// code is only logged; the caller decides based on stdout.
pub async fn scan(
    workspace: &Workspace,
    command: &ToolCommand,
    timeout: Option<Duration>,
) -> Result<ToolOutput, AuditError> {
    let output = command.run(workspace.path(), timeout).await?;
    if !output.success {
        warn!(
            command = %command,
            code = %output.code_string(),
            "audit tool exited non-zero"
        );
    }
    Ok(output)
}

fn npm_program() -> &'static str {
    if cfg!(target_os = "windows") {
        "npm.cmd"
    } else {
        "npm"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_npm_install_disables_scripts() {
        let cmd = ToolCommand::npm_install();
        assert!(cmd.args.contains(&"--ignore-scripts".to_string()));
        assert!(cmd.args.contains(&"--package-lock-only".to_string()));
        assert!(cmd.args.contains(&"--no-audit".to_string()));
        assert!(cmd.args.contains(&"--no-bin-links".to_string()));
        assert!(cmd.args.contains(&"--silent".to_string()));
    }

    #[test]
    fn test_display() {
        let cmd = ToolCommand::new("npm", ["audit", "--json"]);
        assert_eq!(cmd.to_string(), "npm audit --json");
    }

    #[tokio::test]
    async fn test_missing_program_is_invocation_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let cmd = ToolCommand::new("pkgmon-no-such-program", Vec::<String>::new());
        let result = cmd.run(dir.path(), None).await;
        assert!(matches!(result, Err(AuditError::Invocation { .. })));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_non_zero_exit_is_captured() {
        let dir = tempfile::TempDir::new().unwrap();
        let cmd = ToolCommand::new("sh", ["-c", "echo out; echo err >&2; exit 3"]);
        let output = cmd.run(dir.path(), None).await.unwrap();
        assert_eq!(output.code, Some(3));
        assert!(!output.success);
        assert_eq!(output.stdout.trim(), "out");
        assert_eq!(output.stderr.trim(), "err");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout() {
        let dir = tempfile::TempDir::new().unwrap();
        let cmd = ToolCommand::new("sh", ["-c", "sleep 5"]);
        let result = cmd.run(dir.path(), Some(Duration::from_millis(100))).await;
        assert!(matches!(result, Err(AuditError::Timeout { .. })));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_runs_in_workspace() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("marker"), "here").unwrap();
        let cmd = ToolCommand::new("sh", ["-c", "cat marker"]);
        let output = cmd.run(dir.path(), None).await.unwrap();
        assert_eq!(output.stdout, "here");
    }
}
