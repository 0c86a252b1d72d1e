//! Parsing of the audit tool's JSON report.
//!
//! Only the severity counts under `metadata.vulnerabilities` are read; the
//! rest of the report is ignored.

use serde::Deserialize;

use crate::error::AuditError;
use crate::model::SeverityDistribution;

#[derive(Deserialize)]
struct AuditReport {
    metadata: Option<AuditMetadata>,
}

#[derive(Deserialize)]
struct AuditMetadata {
    vulnerabilities: Option<SeverityDistribution>,
}

/// Extracts the severity distribution from the audit tool's stdout.
pub fn parse_report(stdout: &str) -> Result<SeverityDistribution, AuditError> {
    let stdout = stdout.trim();
    if stdout.is_empty() {
        return Err(AuditError::Parse("empty output".to_string()));
    }

    let report: AuditReport =
        serde_json::from_str(stdout).map_err(|e| AuditError::Parse(e.to_string()))?;

    report
        .metadata
        .and_then(|m| m.vulnerabilities)
        .ok_or(AuditError::MissingField("metadata.vulnerabilities"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Rating;

    const NPM_REPORT: &str = r#"{
        "auditReportVersion": 2,
        "vulnerabilities": {
            "minimist": { "name": "minimist", "severity": "critical", "isDirect": false }
        },
        "metadata": {
            "vulnerabilities": {
                "info": 0, "low": 0, "moderate": 2, "high": 0, "critical": 1, "total": 3
            },
            "dependencies": { "prod": 12, "dev": 0, "total": 12 }
        }
    }"#;

    #[test]
    fn test_parse_npm_report() {
        let dist = parse_report(NPM_REPORT).unwrap();
        assert_eq!(dist.moderate, 2);
        assert_eq!(dist.critical, 1);
        assert_eq!(dist.rating(), Rating::Error);
    }

    #[test]
    fn test_parse_clean_report() {
        let dist = parse_report(
            r#"{"metadata":{"vulnerabilities":{"info":0,"low":0,"moderate":0,"high":0,"critical":0}}}"#,
        )
        .unwrap();
        assert_eq!(dist.rating(), Rating::Ok);
    }

    #[test]
    fn test_parse_partial_counts() {
        let dist = parse_report(r#"{"metadata":{"vulnerabilities":{"low":4}}}"#).unwrap();
        assert_eq!(dist.low, 4);
        assert_eq!(dist.high, 0);
    }

    #[test]
    fn test_parse_empty_output() {
        assert!(matches!(parse_report("  \n"), Err(AuditError::Parse(_))));
    }

    #[test]
    fn test_parse_truncated_output() {
        assert!(matches!(
            parse_report(r#"{"metadata":{"vulnerabilities":{"low""#),
            Err(AuditError::Parse(_))
        ));
    }

    #[test]
    fn test_parse_error_document() {
        let result = parse_report(
            r#"{"error":{"code":"ENOLOCK","summary":"This command requires an existing lockfile."}}"#,
        );
        assert!(matches!(
            result,
            Err(AuditError::MissingField("metadata.vulnerabilities"))
        ));
    }

    #[test]
    fn test_parse_wrong_shape() {
        assert!(matches!(
            parse_report(r#"{"metadata":{"vulnerabilities":"many"}}"#),
            Err(AuditError::Parse(_))
        ));
        assert!(matches!(parse_report("[1,2,3]"), Err(AuditError::Parse(_))));
    }
}
