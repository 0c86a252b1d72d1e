use serde::Serialize;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;

use super::Rating;

/// A package's dependency declaration, as handed to one audit run.
///
/// Either an already parsed document or the raw text of a `package.json`.
/// Raw text is written to the workspace untouched.
#[derive(Debug, Clone, PartialEq)]
pub enum Manifest {
    Document(Value),
    Raw(String),
}

impl Manifest {
    /// Serializes the manifest into the text written as `package.json`.
    pub fn to_text(&self) -> Result<String, serde_json::Error> {
        match self {
            Manifest::Document(value) => serde_json::to_string_pretty(value),
            Manifest::Raw(text) => Ok(text.clone()),
        }
    }
}

impl From<Value> for Manifest {
    fn from(value: Value) -> Self {
        Manifest::Document(value)
    }
}

impl From<String> for Manifest {
    fn from(text: String) -> Self {
        Manifest::Raw(text)
    }
}

impl From<&str> for Manifest {
    fn from(text: &str) -> Self {
        Manifest::Raw(text.to_string())
    }
}

/// A registry package document: every published version's manifest plus
/// dist-tags and publish times. Plain `package.json` files are accepted too.
#[derive(Debug, Clone, PartialEq)]
pub struct PackageDocument {
    name: String,
    doc: Value,
}

impl PackageDocument {
    pub fn new(name: impl Into<String>, doc: Value) -> Self {
        Self {
            name: name.into(),
            doc,
        }
    }

    /// True for `null` and `{}` documents.
    pub fn is_empty(&self) -> bool {
        match &self.doc {
            Value::Null => true,
            Value::Object(map) => map.is_empty(),
            _ => false,
        }
    }

    /// The package name, preferring the one recorded in the document.
    pub fn name(&self) -> &str {
        self.doc
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or(&self.name)
    }

    pub fn latest(&self) -> Option<&str> {
        self.doc.get("dist-tags")?.get("latest")?.as_str()
    }

    pub fn modified(&self) -> Option<&str> {
        self.doc.get("time")?.get("modified")?.as_str()
    }

    /// The manifest to audit.
    ///
    /// For registry documents this is the manifest of the `latest` version;
    /// anything else is audited as a manifest in its own right.
    pub fn manifest(&self) -> Manifest {
        let latest = self
            .latest()
            .and_then(|version| self.doc.get("versions")?.get(version));

        match latest {
            Some(version_manifest) => Manifest::Document(version_manifest.clone()),
            None => Manifest::Document(self.doc.clone()),
        }
    }

    /// All published versions with their dist-tags and publish times.
    pub fn versions(&self) -> Vec<VersionInfo> {
        let mut tags: HashMap<&str, Vec<String>> = HashMap::new();
        if let Some(Value::Object(dist_tags)) = self.doc.get("dist-tags") {
            for (tag, version) in dist_tags {
                if let Some(version) = version.as_str() {
                    tags.entry(version).or_default().push(tag.clone());
                }
            }
        }

        let times = self.doc.get("time");

        match self.doc.get("versions") {
            Some(Value::Object(versions)) => versions
                .keys()
                .map(|version| {
                    let mut version_tags = tags.get(version.as_str()).cloned().unwrap_or_default();
                    version_tags.sort();
                    VersionInfo {
                        version: version.clone(),
                        published: times
                            .and_then(|t| t.get(version))
                            .and_then(Value::as_str)
                            .map(str::to_string),
                        tags: version_tags,
                    }
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Display data for this package.
    pub fn summary(&self, scope: &str, max_versions: usize) -> PackageSummary {
        let name = self.name().to_string();
        PackageSummary {
            display_name: display_name(&name, scope).to_string(),
            latest: self.latest().map(str::to_string),
            modified: self.modified().map(str::to_string),
            versions: reduce_versions(self.versions(), max_versions),
            rating: Rating::Unknown,
            name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionInfo {
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published: Option<String>,
    pub tags: Vec<String>,
}

/// One row of the package overview.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PackageSummary {
    pub name: String,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified: Option<String>,
    pub versions: Vec<VersionInfo>,
    pub rating: Rating,
}

impl PackageSummary {
    pub fn with_rating(mut self, rating: Rating) -> Self {
        self.rating = rating;
        self
    }
}

/// Returns true if `name` belongs to `scope`. The empty scope matches all.
pub fn in_scope(name: &str, scope: &str) -> bool {
    name.starts_with(scope)
}

/// Strips the scope prefix (and its separator) from a package name.
pub fn display_name<'a>(name: &'a str, scope: &str) -> &'a str {
    if scope.len() <= 1 {
        return name;
    }
    match name.strip_prefix(scope) {
        Some(rest) => rest.strip_prefix('/').unwrap_or(rest),
        None => name,
    }
}

/// Keeps the `max` most relevant versions, newest first.
///
/// Tagged versions win over untagged ones (more tags first), then newer
/// versions over older ones.
pub fn reduce_versions(mut versions: Vec<VersionInfo>, max: usize) -> Vec<VersionInfo> {
    versions.sort_by(|a, b| {
        b.tags
            .len()
            .cmp(&a.tags.len())
            .then_with(|| compare_versions(&b.version, &a.version))
    });
    versions.truncate(max);
    versions.sort_by(|a, b| compare_versions(&b.version, &a.version));
    versions
}

/// Semver ordering when both sides parse, lexical otherwise.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    match (
        semver::Version::parse(a.trim_start_matches('v')),
        semver::Version::parse(b.trim_start_matches('v')),
    ) {
        (Ok(a), Ok(b)) => a.cmp(&b),
        _ => a.cmp(b),
    }
}
