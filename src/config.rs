//! Configuration file handling.
//!
//! This module provides loading and saving of pkgmon configuration from a
//! TOML file. Every field has a default, so a partial file (or none at all)
//! is valid.
//!
//! # Configuration Location
//!
//! - Linux: `~/.config/pkgmon/config.toml`
//! - macOS: `~/Library/Application Support/pkgmon/config.toml`
//! - Windows: `%APPDATA%\pkgmon\config.toml`
//!
//! # Example Configuration
//!
//! ```toml
//! schedule = "0 0 3 * * *"
//! scope = "@acme"
//! max_versions = 5
//!
//! [source]
//! kind = "storage"
//! storage_dir = "/var/lib/verdaccio/storage"
//!
//! [tools]
//! program = "npm"
//! timeout_secs = 300
//!
//! [logging]
//! level = "info"
//! format = "pretty"
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::audit::ToolCommand;
use crate::error::ScheduleError;
use crate::platform;
use crate::schedule::{AuditSchedule, DEFAULT_SCHEDULE};
use crate::source::DEFAULT_REGISTRY;

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Recurrence expression for audit cycles.
    ///
    /// Default: every day at 03:00 UTC
    pub schedule: String,

    /// Only packages whose name starts with this prefix are displayed.
    /// The prefix is stripped from displayed names.
    ///
    /// Default: "" (all packages)
    pub scope: String,

    /// Maximum number of versions shown per package.
    ///
    /// Default: 5
    pub max_versions: usize,

    /// Directory audit workspaces are created in.
    ///
    /// Default: a `pkgmon/workspaces` directory in the user cache dir
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace_root: Option<PathBuf>,

    pub source: SourceConfig,

    pub tools: ToolsConfig,

    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// A registry storage directory on disk.
    #[default]
    Storage,
    /// A fixed package list fetched over HTTP.
    Registry,
}

/// Where the packages to audit come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub kind: SourceKind,

    /// Storage directory for `kind = "storage"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_dir: Option<PathBuf>,

    /// Registry base URL for `kind = "registry"`.
    pub registry_url: String,

    /// Packages to audit for `kind = "registry"`, in order.
    pub packages: Vec<String>,
}

impl SourceConfig {
    pub fn storage_dir(&self) -> PathBuf {
        self.storage_dir
            .clone()
            .unwrap_or_else(platform::registry_storage_dir)
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::default(),
            storage_dir: None,
            registry_url: DEFAULT_REGISTRY.to_string(),
            packages: Vec::new(),
        }
    }
}

/// The external resolver and audit commands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// Package manager executable.
    pub program: String,

    /// Arguments for lockfile-only dependency resolution. Must keep
    /// lifecycle scripts disabled.
    pub install_args: Vec<String>,

    /// Arguments for the audit, which must print one JSON document.
    pub audit_args: Vec<String>,

    /// Limit per tool invocation, in seconds. 0 disables the limit.
    pub timeout_secs: u64,
}

impl ToolsConfig {
    pub fn resolver(&self) -> ToolCommand {
        ToolCommand::new(&self.program, &self.install_args)
    }

    pub fn scanner(&self) -> ToolCommand {
        ToolCommand::new(&self.program, &self.audit_args)
    }

    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

impl Default for ToolsConfig {
    fn default() -> Self {
        let install = ToolCommand::npm_install();
        let audit = ToolCommand::npm_audit();
        Self {
            program: install.program,
            install_args: install.args,
            audit_args: audit.args,
            timeout_secs: 300,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive, overridden by `PKGMON_LOG`.
    pub level: String,

    /// `pretty` or `json`.
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            schedule: DEFAULT_SCHEDULE.to_string(),
            scope: String::new(),
            max_versions: 5,
            workspace_root: None,
            source: SourceConfig::default(),
            tools: ToolsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Loads configuration from `path`.
    ///
    /// If the file doesn't exist, returns default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(config)
    }

    /// Saves the configuration to `path`.
    ///
    /// Creates the parent directory if it doesn't exist.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Returns the path to the configuration file.
    pub fn config_path() -> PathBuf {
        platform::config_file()
    }

    pub fn schedule(&self) -> Result<AuditSchedule, ScheduleError> {
        AuditSchedule::parse(&self.schedule)
    }

    pub fn workspace_root(&self) -> PathBuf {
        self.workspace_root
            .clone()
            .unwrap_or_else(platform::workspace_root)
    }

    /// Generates a string containing the default configuration.
    pub fn generate_default_config() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}
