//! Disposable scratch directories for audit runs.
//!
//! Every audit gets its own uniquely named directory under a shared root,
//! so concurrent or consecutive runs never see each other's lockfiles or
//! `node_modules`. A [`Workspace`] deletes its directory when closed,
//! released or dropped, whichever happens first. Async callers close it so
//! the removal does not block the executor; dropping is the fallback for
//! cancelled runs.

use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::WorkspaceError;

const WORKSPACE_PREFIX: &str = "audit-";

/// Hands out workspaces below a fixed root directory.
#[derive(Debug, Clone)]
pub struct WorkspaceManager {
    root: PathBuf,
}

impl WorkspaceManager {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Creates a fresh workspace directory.
    ///
    /// The root is created on demand. The directory name carries a random
    /// suffix and never collides with a live workspace.
    pub fn acquire(&self) -> Result<Workspace, WorkspaceError> {
        let create_err = |source| WorkspaceError::Create {
            root: self.root.clone(),
            source,
        };

        fs::create_dir_all(&self.root).map_err(create_err)?;
        let dir = tempfile::Builder::new()
            .prefix(WORKSPACE_PREFIX)
            .tempdir_in(&self.root)
            .map_err(create_err)?;

        let path = dir.keep();
        debug!(workspace = %path.display(), "workspace acquired");

        Ok(Workspace {
            path,
            released: false,
        })
    }
}

/// A workspace owned by exactly one audit run.
#[derive(Debug)]
pub struct Workspace {
    path: PathBuf,
    released: bool,
}

impl Workspace {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of a file inside the workspace.
    pub fn file(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }

    /// Deletes the workspace directory.
    ///
    /// Never fails: a directory that is already gone counts as removed and
    /// any other error is logged. Only the first call does any work.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        self.log_removal(remove_workspace(&self.path));
    }

    /// Deletes the workspace directory without blocking the runtime.
    ///
    /// Same guarantees as [`Workspace::release`].
    pub async fn close(mut self) {
        if self.released {
            return;
        }
        self.released = true;

        let result = removal_result(&self.path, tokio::fs::remove_dir_all(&self.path).await);
        self.log_removal(result);
    }

    fn log_removal(&self, result: Result<(), WorkspaceError>) {
        match result {
            Ok(()) => debug!(workspace = %self.path.display(), "workspace released"),
            Err(e) => warn!(error = %e, "workspace cleanup failed"),
        }
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        self.release();
    }
}

/// Recursively removes a workspace directory, treating "not found" as success.
pub fn remove_workspace(path: &Path) -> Result<(), WorkspaceError> {
    removal_result(path, fs::remove_dir_all(path))
}

fn removal_result(path: &Path, result: io::Result<()>) -> Result<(), WorkspaceError> {
    match result {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(source) => Err(WorkspaceError::Remove {
            path: path.to_path_buf(),
            source,
        }),
    }
}
