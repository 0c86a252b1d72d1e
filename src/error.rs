//! Error types for audits and package sources.
//!
//! None of these escape the audit pipeline: [`AuditError`] is logged and
//! turned into [`Rating::Error`](crate::Rating::Error), and a
//! [`SourceError`] makes the scheduler skip one package.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Failures creating or removing an audit workspace.
#[derive(Error, Debug)]
pub enum WorkspaceError {
    #[error("failed to create workspace under {root}: {source}")]
    Create {
        root: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to remove workspace {path}: {source}")]
    Remove {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failures of a single audit run.
#[derive(Error, Debug)]
pub enum AuditError {
    #[error(transparent)]
    Workspace(#[from] WorkspaceError),

    #[error("failed to serialize manifest: {0}")]
    Manifest(#[from] serde_json::Error),

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The external command could not be started or waited on.
    #[error("failed to run `{command}`: {source}")]
    Invocation {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` did not finish within {timeout:?}")]
    Timeout { command: String, timeout: Duration },

    /// The command ran but reported failure.
    #[error("`{command}` exited with {code}: {stderr}")]
    ToolFailed {
        command: String,
        code: String,
        stderr: String,
    },

    #[error("audit output is not valid JSON: {0}")]
    Parse(String),

    #[error("audit output has no `{0}` field")]
    MissingField(&'static str),
}

/// Failures reading package names or documents from a package source.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("package not found: {0}")]
    NotFound(String),

    #[error("package document for {0} is empty")]
    Empty(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid package document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("registry request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("failed to walk storage: {0}")]
    Walk(#[from] walkdir::Error),
}

/// An unparseable recurrence expression.
#[derive(Error, Debug)]
#[error("invalid schedule `{expression}`: {reason}")]
pub struct ScheduleError {
    pub expression: String,
    pub reason: String,
}
