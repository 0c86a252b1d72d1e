use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;

use crate::error::SourceError;
use crate::model::PackageDocument;

pub const DEFAULT_REGISTRY: &str = "https://registry.npmjs.org";

/// Fetches package documents for a fixed list of packages from an npm
/// compatible registry.
pub struct RegistrySource {
    client: reqwest::Client,
    base_url: String,
    packages: Vec<String>,
}

impl RegistrySource {
    pub fn new(base_url: &str, packages: Vec<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            packages,
        }
    }

    fn document_url(&self, package: &str) -> String {
        format!("{}/{}", self.base_url, encode_name(package))
    }
}

/// Registries expect the scope separator of `@scope/name` percent-encoded.
fn encode_name(package: &str) -> String {
    package.replace('/', "%2f")
}

#[async_trait]
impl super::PackageSource for RegistrySource {
    fn name(&self) -> &'static str {
        "npm Registry"
    }

    async fn package_names(&self) -> Result<Vec<String>, SourceError> {
        Ok(self.packages.clone())
    }

    async fn read_package(&self, package: &str) -> Result<PackageDocument, SourceError> {
        let response = self
            .client
            .get(self.document_url(package))
            .header("Accept", "application/json")
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(SourceError::NotFound(package.to_string()));
        }

        let doc: Value = response.error_for_status()?.json().await?;
        Ok(PackageDocument::new(package, doc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::PackageSource;

    #[test]
    fn test_encode_name() {
        assert_eq!(encode_name("left-pad"), "left-pad");
        assert_eq!(encode_name("@acme/widgets"), "@acme%2fwidgets");
    }

    #[test]
    fn test_document_url() {
        let source = RegistrySource::new("http://localhost:4873/", vec![]);
        assert_eq!(
            source.document_url("@acme/widgets"),
            "http://localhost:4873/@acme%2fwidgets"
        );
    }

    #[tokio::test]
    async fn test_package_names_keep_configured_order() {
        let packages = vec!["zlib".to_string(), "acorn".to_string()];
        let source = RegistrySource::new(DEFAULT_REGISTRY, packages.clone());
        assert_eq!(source.package_names().await.unwrap(), packages);
        assert_eq!(source.name(), "npm Registry");
    }
}
