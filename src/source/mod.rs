//! Where package names and package documents come from.
//!
//! | Source | Package names | Documents |
//! |--------|---------------|-----------|
//! | [`StorageSource`] | directories in registry storage | `<name>/package.json` |
//! | [`RegistrySource`] | configured list | `GET <registry>/<name>` |
//!
//! # Example
//!
//! ```no_run
//! use pkgmon::source::{PackageSource, StorageSource};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let source = StorageSource::new("/var/lib/registry/storage");
//!
//!     for name in source.package_names().await? {
//!         let manifest = source.read_manifest(&name).await?;
//!         println!("{}: {:?}", name, manifest);
//!     }
//!     Ok(())
//! }
//! ```

mod registry;
mod storage;

pub use registry::{RegistrySource, DEFAULT_REGISTRY};
pub use storage::StorageSource;

use async_trait::async_trait;

use crate::config::{SourceConfig, SourceKind};
use crate::error::SourceError;
use crate::model::{Manifest, PackageDocument};

/// A collaborator that lists packages and serves their documents.
///
/// Package names are read again at the start of every cycle, so the set
/// may change between cycles.
#[async_trait]
pub trait PackageSource: Send + Sync {
    /// Returns the human-readable name of this source.
    fn name(&self) -> &'static str;

    /// The ordered set of packages to audit.
    async fn package_names(&self) -> Result<Vec<String>, SourceError>;

    /// Reads the registry document for one package.
    async fn read_package(&self, package: &str) -> Result<PackageDocument, SourceError>;

    /// Reads the manifest to audit for one package.
    ///
    /// An empty document is an error, so callers can skip the package.
    async fn read_manifest(&self, package: &str) -> Result<Manifest, SourceError> {
        let document = self.read_package(package).await?;
        if document.is_empty() {
            return Err(SourceError::Empty(package.to_string()));
        }
        Ok(document.manifest())
    }
}

/// Builds the source described by the configuration.
pub fn from_config(config: &SourceConfig) -> Box<dyn PackageSource> {
    match config.kind {
        SourceKind::Storage => Box::new(StorageSource::new(config.storage_dir())),
        SourceKind::Registry => Box::new(RegistrySource::new(
            &config.registry_url,
            config.packages.clone(),
        )),
    }
}
