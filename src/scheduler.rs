//! Recurring audit cycles over the whole package set.
//!
//! ```text
//!          fire (timer or first activation)
//!   Idle ------------------------------------> Running
//!    ^                                           |
//!    +------------ cycle finished --------------+
//!
//!   fire while Running: dropped, no audits
//! ```
//!
//! A cycle reads the package names, then for each package in order reads
//! its manifest, audits it and stores the rating. Packages are audited one
//! at a time because every audit spawns a resource-heavy external process.
//! A package whose manifest cannot be read is skipped and keeps whatever
//! rating it had.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::audit::Auditor;
use crate::cache::RatingCache;
use crate::schedule::AuditSchedule;
use crate::source::PackageSource;

/// Whether a cycle is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
}

/// Summary of one finished cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Packages that were audited and had their rating stored.
    pub audited: usize,
    /// Packages whose manifest could not be read.
    pub skipped: usize,
}

/// Result of a single fire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    Completed(CycleReport),
    /// Another cycle was already running.
    Suppressed,
}

/// Holds the running flag for the lifetime of a cycle, including cycles
/// that are cancelled part-way.
struct RunningGuard<'a>(&'a AtomicBool);

impl<'a> RunningGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Runs audit cycles and writes their ratings into a shared cache.
pub struct BatchScheduler {
    source: Arc<dyn PackageSource>,
    auditor: Arc<dyn Auditor>,
    cache: Arc<RatingCache>,
    running: AtomicBool,
    reports: Option<mpsc::UnboundedSender<CycleReport>>,
}

impl BatchScheduler {
    pub fn new(
        source: Arc<dyn PackageSource>,
        auditor: Arc<dyn Auditor>,
        cache: Arc<RatingCache>,
    ) -> Self {
        Self {
            source,
            auditor,
            cache,
            running: AtomicBool::new(false),
            reports: None,
        }
    }

    /// Sends a [`CycleReport`] on `tx` after every completed cycle.
    pub fn with_reports(mut self, tx: mpsc::UnboundedSender<CycleReport>) -> Self {
        self.reports = Some(tx);
        self
    }

    pub fn cache(&self) -> &Arc<RatingCache> {
        &self.cache
    }

    pub fn state(&self) -> SchedulerState {
        if self.running.load(Ordering::Acquire) {
            SchedulerState::Running
        } else {
            SchedulerState::Idle
        }
    }

    /// Starts a cycle unless one is already running.
    ///
    /// A suppressed fire is dropped, not queued.
    pub async fn fire(&self) -> CycleOutcome {
        let Some(_guard) = RunningGuard::acquire(&self.running) else {
            debug!("audit cycle already running, fire suppressed");
            return CycleOutcome::Suppressed;
        };

        let report = self.run_cycle().await;
        if let Some(tx) = &self.reports {
            let _ = tx.send(report.clone());
        }
        CycleOutcome::Completed(report)
    }

    async fn fire_owned(self: Arc<Self>) -> CycleOutcome {
        self.fire().await
    }

    async fn run_cycle(&self) -> CycleReport {
        let started_at = Utc::now();
        let mut audited = 0;
        let mut skipped = 0;

        let names = match self.source.package_names().await {
            Ok(names) => names,
            Err(e) => {
                error!(source = self.source.name(), error = %e, "failed to list packages");
                Vec::new()
            }
        };

        info!(packages = names.len(), "audit cycle started");

        for name in &names {
            let manifest = match self.source.read_manifest(name).await {
                Ok(manifest) => manifest,
                Err(e) => {
                    warn!(package = %name, error = %e, "failed to read manifest, skipping");
                    skipped += 1;
                    continue;
                }
            };

            let rating = self
                .auditor
                .audit(&manifest)
                .instrument(info_span!("audit", package = %name))
                .await;
            self.cache.set(name, rating);
            audited += 1;
        }

        let report = CycleReport {
            started_at,
            finished_at: Utc::now(),
            audited,
            skipped,
        };
        info!(audited, skipped, "audit cycle finished");
        report
    }

    /// Fires once immediately and then at every fire time of `schedule`
    /// until `shutdown` resolves.
    ///
    /// Each cycle runs in its own task so the timer keeps ticking while a
    /// cycle is in flight; those ticks are suppressed. On shutdown the
    /// in-flight cycle is aborted and awaited, which drops its workspace
    /// and kills any running tool.
    pub async fn run<F>(self: Arc<Self>, schedule: AuditSchedule, shutdown: F)
    where
        F: Future<Output = ()> + Send,
    {
        tokio::pin!(shutdown);
        let mut cycles = JoinSet::new();

        info!(schedule = %schedule, "audit scheduler started");
        cycles.spawn(Arc::clone(&self).fire_owned());

        loop {
            let Some(wait) = schedule.until_next(Utc::now()) else {
                warn!(schedule = %schedule, "schedule has no further fire times");
                break;
            };

            tokio::select! {
                _ = &mut shutdown => {
                    info!("audit scheduler shutting down");
                    break;
                }
                _ = tokio::time::sleep(wait) => {
                    cycles.spawn(Arc::clone(&self).fire_owned());
                }
                Some(joined) = cycles.join_next() => {
                    if let Err(e) = joined {
                        if !e.is_cancelled() {
                            error!(error = %e, "audit cycle task failed");
                        }
                    }
                }
            }
        }

        cycles.shutdown().await;
    }
}
