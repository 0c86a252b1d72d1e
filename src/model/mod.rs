//! Core data types for manifests, severity counts and ratings.
//!
//! - [`Manifest`] - The dependency declaration handed to one audit run
//! - [`PackageDocument`] - A registry package document
//! - [`SeverityDistribution`] - Findings per severity level
//! - [`Rating`] - The ordinal audit outcome
//!
//! # Example
//!
//! ```
//! use pkgmon::{Rating, SeverityDistribution};
//!
//! let findings = SeverityDistribution {
//!     moderate: 3,
//!     ..Default::default()
//! };
//!
//! assert_eq!(findings.rating(), Rating::Warn);
//! ```

mod manifest;
mod rating;
mod severity;

pub use manifest::*;
pub use rating::*;
pub use severity::*;
