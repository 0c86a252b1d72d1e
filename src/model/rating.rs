use serde::{Deserialize, Serialize};

/// Outcome of auditing one package.
///
/// Variants are declared in severity order, so `Ord` follows
/// `Unknown < Ok < Warn < Error`. An audit that could not run at all is
/// reported as [`Rating::Error`], the same as one that found severe
/// vulnerabilities; both mean "needs attention".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rating {
    /// Never audited.
    #[default]
    Unknown,
    Ok,
    Warn,
    Error,
}

impl Rating {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rating::Unknown => "unknown",
            Rating::Ok => "ok",
            Rating::Warn => "warn",
            Rating::Error => "error",
        }
    }

    /// Returns true for ratings that should draw attention.
    pub fn needs_attention(&self) -> bool {
        matches!(self, Rating::Warn | Rating::Error)
    }
}

impl std::fmt::Display for Rating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Rating {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "unknown" => Ok(Rating::Unknown),
            "ok" => Ok(Rating::Ok),
            "warn" => Ok(Rating::Warn),
            "error" => Ok(Rating::Error),
            _ => Err(format!(
                "Unknown rating: {}. Use 'unknown', 'ok', 'warn' or 'error'",
                s
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_order() {
        assert!(Rating::Unknown < Rating::Ok);
        assert!(Rating::Ok < Rating::Warn);
        assert!(Rating::Warn < Rating::Error);
        assert_eq!(
            [Rating::Error, Rating::Unknown, Rating::Warn, Rating::Ok]
                .into_iter()
                .max(),
            Some(Rating::Error)
        );
    }

    #[test]
    fn test_rating_default_is_unknown() {
        assert_eq!(Rating::default(), Rating::Unknown);
    }

    #[test]
    fn test_rating_serde_lowercase() {
        assert_eq!(serde_json::to_string(&Rating::Warn).unwrap(), "\"warn\"");
        let rating: Rating = serde_json::from_str("\"error\"").unwrap();
        assert_eq!(rating, Rating::Error);
    }

    #[test]
    fn test_rating_from_str() {
        assert_eq!("OK".parse::<Rating>().unwrap(), Rating::Ok);
        assert!("fine".parse::<Rating>().is_err());
    }
}
