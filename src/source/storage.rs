use async_trait::async_trait;
use serde_json::Value;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::SourceError;
use crate::model::PackageDocument;

const DOCUMENT_FILE: &str = "package.json";

/// Reads packages from a registry's local storage directory.
///
/// Layout: `<root>/<name>/package.json` for plain packages and
/// `<root>/@scope/<name>/package.json` for scoped ones.
pub struct StorageSource {
    root: PathBuf,
}

impl StorageSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn document_path(&self, package: &str) -> Option<PathBuf> {
        let relative = Path::new(package);
        let plain = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if package.is_empty() || !plain {
            return None;
        }
        Some(self.root.join(relative).join(DOCUMENT_FILE))
    }
}

#[async_trait]
impl super::PackageSource for StorageSource {
    fn name(&self) -> &'static str {
        "Registry Storage"
    }

    async fn package_names(&self) -> Result<Vec<String>, SourceError> {
        let mut names = Vec::new();

        let walker = WalkDir::new(&self.root)
            .min_depth(2)
            .max_depth(3)
            .follow_links(true);

        for entry in walker {
            // Only an unreadable root fails the listing; a package directory
            // that vanishes or cannot be read mid-walk is skipped.
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.depth() == 0 => return Err(e.into()),
                Err(e) => {
                    warn!(error = %e, "skipping unreadable storage entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() || entry.file_name() != DOCUMENT_FILE {
                continue;
            }

            let Ok(relative) = entry.path().strip_prefix(&self.root) else {
                continue;
            };
            let parts: Vec<String> = relative
                .parent()
                .map(|p| {
                    p.components()
                        .map(|c| c.as_os_str().to_string_lossy().into_owned())
                        .collect()
                })
                .unwrap_or_default();

            match parts.as_slice() {
                [name] if !name.starts_with('@') && !name.starts_with('.') => {
                    names.push(name.clone())
                }
                [scope, name] if scope.starts_with('@') => names.push(format!("{}/{}", scope, name)),
                _ => debug!(path = %entry.path().display(), "ignoring document outside package layout"),
            }
        }

        names.sort();
        Ok(names)
    }

    async fn read_package(&self, package: &str) -> Result<PackageDocument, SourceError> {
        let path = self
            .document_path(package)
            .ok_or_else(|| SourceError::NotFound(package.to_string()))?;

        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(SourceError::NotFound(package.to_string()))
            }
            Err(e) => return Err(e.into()),
        };

        let doc: Value = serde_json::from_str(&content)?;
        Ok(PackageDocument::new(package, doc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Manifest;
    use crate::source::PackageSource;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn write_doc(root: &Path, name: &str, doc: &str) {
        let dir = root.join(name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(DOCUMENT_FILE), doc).unwrap();
    }

    fn storage() -> TempDir {
        let root = TempDir::new().unwrap();
        write_doc(
            root.path(),
            "left-pad",
            &json!({
                "name": "left-pad",
                "dist-tags": { "latest": "1.3.0" },
                "versions": { "1.3.0": { "name": "left-pad", "version": "1.3.0" } }
            })
            .to_string(),
        );
        write_doc(root.path(), "@acme/widgets", r#"{"name":"@acme/widgets"}"#);
        write_doc(root.path(), "broken", "{ not json");
        write_doc(root.path(), "empty", "{}");
        fs::write(root.path().join("config.yaml"), "storage: ./").unwrap();
        fs::create_dir_all(root.path().join("no-document")).unwrap();
        root
    }

    #[tokio::test]
    async fn test_package_names() {
        let root = storage();
        let source = StorageSource::new(root.path());

        let names = source.package_names().await.unwrap();
        assert_eq!(names, vec!["@acme/widgets", "broken", "empty", "left-pad"]);
    }

    #[tokio::test]
    async fn test_read_manifest_uses_latest() {
        let root = storage();
        let source = StorageSource::new(root.path());

        let manifest = source.read_manifest("left-pad").await.unwrap();
        assert_eq!(
            manifest,
            Manifest::Document(json!({ "name": "left-pad", "version": "1.3.0" }))
        );
    }

    #[tokio::test]
    async fn test_read_scoped_package() {
        let root = storage();
        let source = StorageSource::new(root.path());

        let doc = source.read_package("@acme/widgets").await.unwrap();
        assert_eq!(doc.name(), "@acme/widgets");
    }

    #[tokio::test]
    async fn test_read_errors() {
        let root = storage();
        let source = StorageSource::new(root.path());

        assert!(matches!(
            source.read_package("missing").await,
            Err(SourceError::NotFound(_))
        ));
        assert!(matches!(
            source.read_package("broken").await,
            Err(SourceError::Json(_))
        ));
        assert!(matches!(
            source.read_manifest("empty").await,
            Err(SourceError::Empty(_))
        ));
    }

    #[tokio::test]
    async fn test_rejects_paths_outside_storage() {
        let root = storage();
        let source = StorageSource::new(root.path().join("@acme"));

        assert!(matches!(
            source.read_package("../left-pad").await,
            Err(SourceError::NotFound(_))
        ));
        assert!(matches!(
            source.read_package("").await,
            Err(SourceError::NotFound(_))
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_unreadable_entries_are_skipped() {
        let root = storage();
        std::os::unix::fs::symlink(root.path().join("gone"), root.path().join("dangling")).unwrap();
        std::os::unix::fs::symlink(root.path(), root.path().join("@acme").join("loop")).unwrap();
        let source = StorageSource::new(root.path());

        let names = source.package_names().await.unwrap();
        assert_eq!(names, vec!["@acme/widgets", "broken", "empty", "left-pad"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlinked_package_is_listed() {
        let root = storage();
        let elsewhere = TempDir::new().unwrap();
        write_doc(elsewhere.path(), "linked", r#"{"name":"linked"}"#);
        std::os::unix::fs::symlink(elsewhere.path().join("linked"), root.path().join("linked"))
            .unwrap();
        let source = StorageSource::new(root.path());

        let names = source.package_names().await.unwrap();
        assert!(names.contains(&"linked".to_string()));
    }

    #[tokio::test]
    async fn test_missing_storage_root() {
        let root = TempDir::new().unwrap();
        let source = StorageSource::new(root.path().join("absent"));
        assert!(matches!(
            source.package_names().await,
            Err(SourceError::Walk(_))
        ));
    }
}
