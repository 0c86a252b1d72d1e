pub mod audit;
pub mod cache;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod output;
pub mod overview;
pub mod platform;
pub mod schedule;
pub mod scheduler;
pub mod source;

pub use audit::{AuditPipeline, Auditor};
pub use cache::RatingCache;
pub use config::Config;
pub use model::{Manifest, PackageDocument, Rating, SeverityDistribution};
pub use schedule::AuditSchedule;
pub use scheduler::{BatchScheduler, CycleOutcome, CycleReport, SchedulerState};
pub use source::PackageSource;
