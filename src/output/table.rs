use crate::model::{PackageSummary, Rating, VersionInfo};
use crate::overview::Overview;
use anyhow::Result;
use chrono::{DateTime, Utc};
use tabled::{settings::Style, Table, Tabled};

#[derive(Tabled)]
struct PackageRow {
    #[tabled(rename = "Package")]
    name: String,
    #[tabled(rename = "Latest")]
    latest: String,
    #[tabled(rename = "Modified")]
    modified: String,
    #[tabled(rename = "Versions")]
    versions: String,
    #[tabled(rename = "Audit")]
    rating: String,
}

pub fn print_table(overview: &Overview) -> Result<()> {
    println!();
    println!("{}", overview.title);
    println!(
        "Last audit: {}   Next audit: {}   ({})",
        format_time(overview.last_audit),
        format_time(overview.next_audit),
        overview.schedule
    );
    println!();

    if overview.packages.is_empty() {
        println!("No packages found.");
        return Ok(());
    }

    let rows: Vec<PackageRow> = overview.packages.iter().map(package_row).collect();
    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{}", table);

    println!();
    print_summary(&overview.packages);

    Ok(())
}

fn package_row(p: &PackageSummary) -> PackageRow {
    PackageRow {
        name: truncate(&p.display_name, 40),
        latest: p.latest.clone().unwrap_or_else(|| "-".to_string()),
        modified: p
            .modified
            .as_deref()
            .map(format_date)
            .unwrap_or_else(|| "-".to_string()),
        versions: format_versions(&p.versions),
        rating: format_rating(p.rating),
    }
}

fn print_summary(packages: &[PackageSummary]) {
    println!("{}", summary_line(packages));
}

fn summary_line(packages: &[PackageSummary]) -> String {
    let count = |rating: Rating| packages.iter().filter(|p| p.rating == rating).count();
    let attention = packages.iter().filter(|p| p.rating.needs_attention()).count();

    format!(
        "{} packages, {} need attention: {} error, {} warn, {} ok, {} unknown",
        packages.len(),
        attention,
        count(Rating::Error),
        count(Rating::Warn),
        count(Rating::Ok),
        count(Rating::Unknown)
    )
}

fn format_rating(rating: Rating) -> String {
    match rating {
        Rating::Error => "ERROR".to_string(),
        Rating::Warn => "WARN".to_string(),
        Rating::Ok => "ok".to_string(),
        Rating::Unknown => "?".to_string(),
    }
}

fn format_versions(versions: &[VersionInfo]) -> String {
    if versions.is_empty() {
        return "-".to_string();
    }

    versions
        .iter()
        .map(|v| {
            if v.tags.is_empty() {
                v.version.clone()
            } else {
                format!("{} ({})", v.version, v.tags.join(", "))
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_time(time: Option<DateTime<Utc>>) -> String {
    time.map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Shortens RFC 3339 timestamps to their date; anything else is shown as is.
fn format_date(value: &str) -> String {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|_| value.to_string())
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_versions() {
        let versions = vec![
            VersionInfo {
                version: "2.0.0".to_string(),
                published: None,
                tags: vec!["latest".to_string(), "stable".to_string()],
            },
            VersionInfo {
                version: "1.0.0".to_string(),
                published: None,
                tags: vec![],
            },
        ];
        assert_eq!(format_versions(&versions), "2.0.0 (latest, stable)\n1.0.0");
        assert_eq!(format_versions(&[]), "-");
    }

    #[test]
    fn test_format_date() {
        assert_eq!(format_date("2024-05-01T10:00:00.000Z"), "2024-05-01");
        assert_eq!(format_date("yesterday"), "yesterday");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("left-pad", 40), "left-pad");
        assert_eq!(truncate("abcdefghij", 6), "abc...");
    }

    #[test]
    fn test_summary_line_counts_attention() {
        let package = |name: &str, rating: Rating| PackageSummary {
            name: name.to_string(),
            display_name: name.to_string(),
            latest: None,
            modified: None,
            versions: vec![],
            rating,
        };
        let packages = vec![
            package("a", Rating::Error),
            package("b", Rating::Warn),
            package("c", Rating::Ok),
            package("d", Rating::Unknown),
            package("e", Rating::Error),
        ];

        assert_eq!(
            summary_line(&packages),
            "5 packages, 3 need attention: 2 error, 1 warn, 1 ok, 1 unknown"
        );
    }

    #[test]
    fn test_format_rating() {
        assert_eq!(format_rating(Rating::Error), "ERROR");
        assert_eq!(format_rating(Rating::Unknown), "?");
    }
}
