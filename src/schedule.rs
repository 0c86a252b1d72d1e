//! Recurrence expressions for audit cycles.
//!
//! Expressions use cron syntax with a leading seconds field
//! (`sec min hour day-of-month month day-of-week [year]`) or one of the
//! `@hourly`/`@daily`/`@weekly`/`@monthly`/`@yearly` shorthands. All times
//! are UTC.
//!
//! # Example
//!
//! ```
//! use pkgmon::AuditSchedule;
//!
//! let schedule: AuditSchedule = "0 0 3 * * *".parse().unwrap();
//! let next = schedule.next_after(chrono::Utc::now()).unwrap();
//! println!("next audit at {}", next);
//! ```

use chrono::{DateTime, Utc};
use std::str::FromStr;
use std::time::Duration;

use crate::error::ScheduleError;

/// Every day at 03:00.
pub const DEFAULT_SCHEDULE: &str = "0 0 3 * * *";

/// A parsed recurrence expression. Immutable once created.
#[derive(Debug, Clone)]
pub struct AuditSchedule {
    expression: String,
    schedule: cron::Schedule,
}

impl AuditSchedule {
    pub fn parse(expression: &str) -> Result<Self, ScheduleError> {
        let expression = expression.trim();
        let schedule = cron::Schedule::from_str(expression).map_err(|e| ScheduleError {
            expression: expression.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            expression: expression.to_string(),
            schedule,
        })
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// The first fire time strictly after `t`.
    pub fn next_after(&self, t: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.schedule.after(&t).next()
    }

    /// The last fire time strictly before `t`.
    pub fn previous_before(&self, t: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.schedule.after(&t).next_back()
    }

    /// True if a fire time has passed since `last_fire`.
    pub fn is_due(&self, last_fire: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        self.next_after(last_fire).is_some_and(|next| next <= now)
    }

    /// How long to wait from `now` until the next fire time.
    pub fn until_next(&self, now: DateTime<Utc>) -> Option<Duration> {
        let next = self.next_after(now)?;
        Some((next - now).to_std().unwrap_or(Duration::ZERO))
    }
}

impl FromStr for AuditSchedule {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl std::fmt::Display for AuditSchedule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.expression)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn test_default_is_daily_at_three() {
        let schedule = AuditSchedule::parse(DEFAULT_SCHEDULE).unwrap();
        assert_eq!(schedule.expression(), "0 0 3 * * *");
        assert_eq!(
            schedule.next_after(at(2024, 1, 1, 12, 0)),
            Some(at(2024, 1, 2, 3, 0))
        );
    }

    #[test]
    fn test_previous_before() {
        let schedule = AuditSchedule::parse("0 0 3 * * *").unwrap();
        assert_eq!(
            schedule.previous_before(at(2024, 1, 1, 12, 0)),
            Some(at(2024, 1, 1, 3, 0))
        );
    }

    #[test]
    fn test_is_due() {
        let schedule = AuditSchedule::parse("0 */15 * * * *").unwrap();
        let last = at(2024, 1, 1, 10, 0);
        assert!(!schedule.is_due(last, at(2024, 1, 1, 10, 14)));
        assert!(schedule.is_due(last, at(2024, 1, 1, 10, 15)));
        assert!(schedule.is_due(last, at(2024, 1, 1, 11, 0)));
    }

    #[test]
    fn test_until_next() {
        let schedule = AuditSchedule::parse("0 0 * * * *").unwrap();
        let wait = schedule.until_next(at(2024, 1, 1, 10, 30)).unwrap();
        assert_eq!(wait, Duration::from_secs(30 * 60));
    }

    #[test]
    fn test_shorthand() {
        let schedule: AuditSchedule = "@hourly".parse().unwrap();
        assert_eq!(
            schedule.next_after(at(2024, 1, 1, 10, 30)),
            Some(at(2024, 1, 1, 11, 0))
        );
    }

    #[test]
    fn test_invalid_expression() {
        let err = AuditSchedule::parse("every 1 day at 03:00").unwrap_err();
        assert_eq!(err.expression, "every 1 day at 03:00");
        assert!(err.to_string().contains("invalid schedule"));
    }

    #[test]
    fn test_expression_trimmed() {
        let schedule = AuditSchedule::parse("  0 0 3 * * *\n").unwrap();
        assert_eq!(schedule.to_string(), "0 0 3 * * *");
    }
}
