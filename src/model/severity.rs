use serde::{Deserialize, Serialize};

use super::Rating;

/// Score at or above which a distribution rates as [`Rating::Error`].
const ERROR_THRESHOLD: u32 = 8;

/// Score at or above which a distribution rates as [`Rating::Warn`].
const WARN_THRESHOLD: u32 = 2;

/// Number of findings per severity level, as reported by the audit tool.
///
/// Missing fields deserialize as zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeverityDistribution {
    pub info: u64,
    pub low: u64,
    pub moderate: u64,
    pub high: u64,
    pub critical: u64,
}

impl SeverityDistribution {
    /// Per-level weights paired with the level's count.
    fn weighted(&self) -> [(u32, u64); 5] {
        [
            (1, self.info),
            (2, self.low),
            (4, self.moderate),
            (8, self.high),
            (16, self.critical),
        ]
    }

    /// Presence score: the sum of the weights of every level with at least
    /// one finding. Counts never act as multipliers.
    pub fn score(&self) -> u32 {
        self.weighted()
            .iter()
            .filter(|(_, count)| *count > 0)
            .map(|(weight, _)| weight)
            .sum()
    }

    /// Total number of findings. Counts come from an external tool, so the
    /// sum saturates instead of overflowing.
    pub fn total(&self) -> u64 {
        self.weighted()
            .iter()
            .fold(0u64, |acc, (_, count)| acc.saturating_add(*count))
    }

    /// Collapses the distribution into a rating.
    pub fn rating(&self) -> Rating {
        match self.score() {
            s if s >= ERROR_THRESHOLD => Rating::Error,
            s if s >= WARN_THRESHOLD => Rating::Warn,
            _ => Rating::Ok,
        }
    }
}
