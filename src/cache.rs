//! In-memory rating cache shared by the scheduler and readers.
//!
//! The scheduler is the only writer; any number of readers may look up
//! ratings while a cycle is running. Locks are held only for a single map
//! operation, never across an audit, so readers are not held up by the
//! audit tool. Nothing is persisted: after a restart every package reads
//! as [`Rating::Unknown`] until its first audit.
//!
//! # Example
//!
//! ```
//! use pkgmon::{Rating, RatingCache};
//!
//! let cache = RatingCache::new();
//! assert_eq!(cache.get("left-pad"), Rating::Unknown);
//!
//! cache.set("left-pad", Rating::Warn);
//! assert_eq!(cache.get("left-pad"), Rating::Warn);
//! ```

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use crate::model::Rating;

/// A cached rating and when it was recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RatingEntry {
    pub rating: Rating,
    pub audited_at: DateTime<Utc>,
}

/// Process-wide map from package name to its last known rating.
#[derive(Debug, Default)]
pub struct RatingCache {
    entries: RwLock<HashMap<String, RatingEntry>>,
}

impl RatingCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the last rating for `name`, or [`Rating::Unknown`].
    pub fn get(&self, name: &str) -> Rating {
        self.entry(name)
            .map(|e| e.rating)
            .unwrap_or(Rating::Unknown)
    }

    pub fn entry(&self, name: &str) -> Option<RatingEntry> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.get(name).copied()
    }

    /// Replaces the entry for `name`. The last write wins.
    pub fn set(&self, name: &str, rating: Rating) {
        let entry = RatingEntry {
            rating,
            audited_at: Utc::now(),
        };
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(name.to_string(), entry);
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A point-in-time copy of every entry, sorted by package name.
    pub fn snapshot(&self) -> Vec<(String, RatingEntry)> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let mut items: Vec<_> = entries
            .iter()
            .map(|(name, entry)| (name.clone(), *entry))
            .collect();
        items.sort_by(|a, b| a.0.cmp(&b.0));
        items
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_unset_is_unknown() {
        let cache = RatingCache::new();
        assert_eq!(cache.get("missing"), Rating::Unknown);
        assert!(cache.entry("missing").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_last_write_wins() {
        let cache = RatingCache::new();
        cache.set("a", Rating::Warn);
        cache.set("a", Rating::Ok);
        assert_eq!(cache.get("a"), Rating::Ok);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_entry_records_time() {
        let cache = RatingCache::new();
        let before = Utc::now();
        cache.set("a", Rating::Error);
        let entry = cache.entry("a").unwrap();
        assert_eq!(entry.rating, Rating::Error);
        assert!(entry.audited_at >= before);
    }

    #[test]
    fn test_snapshot_sorted() {
        let cache = RatingCache::new();
        cache.set("b", Rating::Ok);
        cache.set("@scope/a", Rating::Warn);
        cache.set("a", Rating::Error);

        let names: Vec<String> = cache.snapshot().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["@scope/a", "a", "b"]);
    }

    #[test]
    fn test_concurrent_readers_see_whole_values() {
        let cache = Arc::new(RatingCache::new());
        cache.set("pkg", Rating::Ok);

        let writer = {
            let cache = Arc::clone(&cache);
            std::thread::spawn(move || {
                for i in 0..1000 {
                    let rating = if i % 2 == 0 { Rating::Warn } else { Rating::Error };
                    cache.set("pkg", rating);
                }
            })
        };

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        let rating = cache.get("pkg");
                        assert!(matches!(rating, Rating::Ok | Rating::Warn | Rating::Error));
                    }
                })
            })
            .collect();

        writer.join().unwrap();
        for reader in readers {
            reader.join().unwrap();
        }
        assert_eq!(cache.get("pkg"), Rating::Error);
    }
}
