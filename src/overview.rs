//! The package overview: every displayed package with its versions and
//! current rating, plus the audit schedule.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;

use crate::cache::RatingCache;
use crate::error::SourceError;
use crate::model::{in_scope, PackageSummary};
use crate::schedule::AuditSchedule;
use crate::source::PackageSource;

#[derive(Debug, Clone, Serialize)]
pub struct Overview {
    pub title: String,
    pub schedule: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_audit: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_audit: Option<DateTime<Utc>>,
    pub packages: Vec<PackageSummary>,
}

/// Collects the overview for all packages in `scope`.
///
/// Ratings are read from the cache and never wait for a running audit.
/// Packages whose document cannot be read are left out.
pub async fn build_overview(
    source: &dyn PackageSource,
    cache: &RatingCache,
    schedule: &AuditSchedule,
    scope: &str,
    max_versions: usize,
) -> Result<Overview, SourceError> {
    let now = Utc::now();
    let mut packages = Vec::new();

    for name in source.package_names().await? {
        if !in_scope(&name, scope) {
            continue;
        }

        match source.read_package(&name).await {
            Ok(doc) => packages.push(
                doc.summary(scope, max_versions)
                    .with_rating(cache.get(&name)),
            ),
            Err(e) => warn!(package = %name, error = %e, "failed to read package"),
        }
    }

    Ok(Overview {
        title: title(scope),
        schedule: schedule.to_string(),
        last_audit: schedule.previous_before(now),
        next_audit: schedule.next_after(now),
        packages,
    })
}

fn title(scope: &str) -> String {
    if scope.is_empty() {
        "Package Monitoring".to_string()
    } else {
        format!("{} - Package Monitoring", scope)
    }
}
