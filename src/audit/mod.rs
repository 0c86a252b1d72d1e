//! The audit pipeline: one manifest in, one rating out.
//!
//! ```text
//! acquire workspace --> write package.json --> resolve --> audit --> parse --> rate
//!        |                                                                      |
//!        +------------------------- release (always) --------------------------+
//! ```
//!
//! Every failure along the way is logged and rated [`Rating::Error`], so
//! [`AuditPipeline::run`] always produces a rating.

pub mod report;
pub mod tool;
pub mod workspace;

pub use report::parse_report;
pub use tool::{ToolCommand, ToolOutput};
pub use workspace::{Workspace, WorkspaceManager};

use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, error, info};

use crate::config::Config;
use crate::error::AuditError;
use crate::model::{Manifest, Rating, SeverityDistribution};

/// Anything that can turn a manifest into a rating.
///
/// Implementations must be total: failures are reported as
/// [`Rating::Error`], never as a panic or error.
#[async_trait]
pub trait Auditor: Send + Sync {
    async fn audit(&self, manifest: &Manifest) -> Rating;
}

/// Resolves a manifest's dependencies in a throwaway workspace and rates
/// the audit tool's findings.
#[derive(Debug, Clone)]
pub struct AuditPipeline {
    workspaces: WorkspaceManager,
    resolver: ToolCommand,
    scanner: ToolCommand,
    timeout: Option<Duration>,
}

impl AuditPipeline {
    /// Creates a pipeline using `npm` for resolution and auditing, with no
    /// invocation timeout.
    pub fn new(workspace_root: impl Into<PathBuf>) -> Self {
        Self {
            workspaces: WorkspaceManager::new(workspace_root),
            resolver: ToolCommand::npm_install(),
            scanner: ToolCommand::npm_audit(),
            timeout: None,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            workspaces: WorkspaceManager::new(config.workspace_root()),
            resolver: config.tools.resolver(),
            scanner: config.tools.scanner(),
            timeout: config.tools.timeout(),
        }
    }

    pub fn with_resolver(mut self, resolver: ToolCommand) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_scanner(mut self, scanner: ToolCommand) -> Self {
        self.scanner = scanner;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Audits a manifest. Never fails; see [`AuditPipeline::try_run`] for
    /// the underlying result.
    pub async fn run(&self, manifest: &Manifest) -> Rating {
        match self.try_run(manifest).await {
            Ok(distribution) => {
                let rating = distribution.rating();
                info!(
                    score = distribution.score(),
                    findings = distribution.total(),
                    rating = %rating,
                    "audit completed"
                );
                rating
            }
            Err(e) => {
                error!(error = %e, "audit failed");
                Rating::Error
            }
        }
    }

    /// Audits a manifest and returns the raw severity counts.
    ///
    /// The workspace is released before returning, on success and failure
    /// alike. If this future is dropped mid-run, dropping the workspace
    /// releases it instead.
    pub async fn try_run(&self, manifest: &Manifest) -> Result<SeverityDistribution, AuditError> {
        let workspace = self.workspaces.acquire()?;
        let result = self.run_in(&workspace, manifest).await;
        workspace.close().await;
        result
    }

    async fn run_in(
        &self,
        workspace: &Workspace,
        manifest: &Manifest,
    ) -> Result<SeverityDistribution, AuditError> {
        tool::resolve(workspace, manifest, &self.resolver, self.timeout).await?;
        debug!(workspace = %workspace.path().display(), "dependencies resolved");

        let output = tool::scan(workspace, &self.scanner, self.timeout).await?;

        parse_report(&output.stdout).inspect_err(|e| {
            error!(
                error = %e,
                stdout = %output.stdout,
                stderr = %output.stderr,
                "unusable audit output"
            );
        })
    }
}

#[async_trait]
impl Auditor for AuditPipeline {
    async fn audit(&self, manifest: &Manifest) -> Rating {
        self.run(manifest).await
    }
}
