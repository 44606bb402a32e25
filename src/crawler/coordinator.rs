//! Run coordinator - main crawl orchestration logic
//!
//! This module contains the loop that drives a run:
//! - Seeding the frontier with the configured listing URLs
//! - Filling a bounded worker pool with seed and item tasks
//! - Applying every completion to the frontier, builder and report
//! - Enforcing the failure threshold and the deadline
//! - Finalizing the snapshot
//!
//! The coordinator task is the only writer of the frontier, the catalog
//! builder and the report. Workers only fetch and parse.

use crate::catalog::{CatalogBuilder, CatalogEntry, Snapshot, SnapshotDiff};
use crate::config::Config;
use crate::crawler::frontier::{Frontier, FrontierError, ItemTask, ListingPage, SeedTask, Task};
use crate::crawler::resolver::ResolveError;
use crate::crawler::source::{CatalogSource, ListingError};
use crate::output::{RunReport, RunStatus};
use crate::state::ItemState;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinSet;
use tokio::time::Instant;

/// Completed attempts required before the failure ratio can abort a run early
///
/// The ratio is always checked once more when the frontier drains.
pub const EARLY_ABORT_MIN_SAMPLE: u64 = 200;

/// Knobs for one run
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Abort when the failure ratio reaches this value
    pub failure_threshold: f64,

    /// Stop dispatching after this long
    pub deadline: Option<Duration>,

    /// Worker pool size
    pub max_in_flight: usize,

    /// Log progress every this many completions
    pub progress_every: u64,
}

impl RunOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            failure_threshold: config.run.failure_threshold,
            deadline: (config.run.deadline_secs > 0)
                .then(|| Duration::from_secs(config.run.deadline_secs)),
            max_in_flight: config.fetcher.max_concurrency.max(1) as usize,
            progress_every: config.run.progress_every.max(1),
        }
    }
}

impl Default for RunOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Why a run produced no snapshot
#[derive(Debug, Clone, Error)]
pub enum AbortReason {
    #[error("failure ratio {ratio:.4} reached threshold {threshold}")]
    FailureThreshold { ratio: f64, threshold: f64 },

    #[error("seed failure ratio {ratio:.4} reached threshold {threshold}")]
    SeedFailureThreshold { ratio: f64, threshold: f64 },

    #[error("frontier inconsistency: {0}")]
    FrontierInconsistency(#[from] FrontierError),

    #[error("no items were resolved")]
    EmptyCatalog,

    #[error("setup failed: {0}")]
    Setup(String),
}

/// A run that ended with a snapshot
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub snapshot: Snapshot,
    pub report: RunReport,

    /// Difference from the previous snapshot, when one was supplied
    pub diff: Option<SnapshotDiff>,
}

/// A run that ended without a snapshot; the previous artifact stands
#[derive(Debug, Clone, Error)]
#[error("run aborted: {reason}")]
pub struct RunAborted {
    pub reason: AbortReason,
    pub report: RunReport,
}

/// What a worker hands back
enum Completion {
    Seed {
        task: SeedTask,
        result: Result<ListingPage, ListingError>,
    },
    Item {
        task: ItemTask,
        result: Result<CatalogEntry, ResolveError>,
    },
}

/// Main run coordinator structure
pub struct Coordinator<S: CatalogSource> {
    source: S,
    options: RunOptions,
    seeds: Vec<String>,
    previous: Option<Vec<CatalogEntry>>,
    frontier: Frontier,
    builder: CatalogBuilder,
    report: RunReport,
    completions: u64,
}

impl<S: CatalogSource> Coordinator<S> {
    pub fn new(source: S, options: RunOptions, seeds: Vec<String>) -> Self {
        Self {
            source,
            options,
            seeds,
            previous: None,
            frontier: Frontier::new(),
            builder: CatalogBuilder::new(),
            report: RunReport::new(),
            completions: 0,
        }
    }

    /// Supplies the previous snapshot's entries for diffing
    pub fn with_previous(mut self, previous: Option<Vec<CatalogEntry>>) -> Self {
        self.previous = previous;
        self
    }

    /// Records the configuration hash in the report
    pub fn with_config_hash(mut self, hash: Option<String>) -> Self {
        self.report.config_hash = hash;
        self
    }

    /// Runs until the frontier drains, the deadline passes or the run aborts
    pub async fn run(mut self) -> Result<RunOutcome, RunAborted> {
        let started = Instant::now();
        let deadline = self.options.deadline.map(|d| started + d);
        let mut deadline_hit = false;
        let mut in_flight: JoinSet<Completion> = JoinSet::new();

        let seeded = self.frontier.seed(&self.seeds);
        tracing::info!(
            "Starting run with {} seed(s), {} workers, failure threshold {}",
            seeded,
            self.options.max_in_flight,
            self.options.failure_threshold
        );

        loop {
            if !deadline_hit && deadline.is_some_and(|d| Instant::now() >= d) {
                deadline_hit = true;
                tracing::warn!(
                    "Deadline reached, waiting for {} in-flight task(s); {} seeds and {} items left undispatched",
                    in_flight.len(),
                    self.frontier.pending_seeds(),
                    self.frontier.pending_items()
                );
            }

            if !deadline_hit {
                while in_flight.len() < self.options.max_in_flight {
                    match self.frontier.next_task() {
                        Some(task) => self.dispatch(&mut in_flight, task),
                        None => break,
                    }
                }
            }

            if in_flight.is_empty() {
                break;
            }

            let joined = match deadline {
                Some(deadline) if !deadline_hit => {
                    tokio::select! {
                        joined = in_flight.join_next() => joined,
                        _ = tokio::time::sleep_until(deadline) => continue,
                    }
                }
                _ => in_flight.join_next().await,
            };

            let Some(joined) = joined else {
                break;
            };

            match joined {
                Ok(completion) => {
                    if let Err(reason) = self.apply(completion) {
                        in_flight.abort_all();
                        return Err(self.abort(reason));
                    }
                }
                Err(e) => {
                    tracing::error!("Worker task failed: {}", e);
                    self.report.failed_permanent += 1;
                }
            }

            if let Err(reason) = self.check_thresholds(EARLY_ABORT_MIN_SAMPLE) {
                in_flight.abort_all();
                return Err(self.abort(reason));
            }
        }

        let partial = deadline_hit && !self.frontier.is_exhausted();
        self.finalize(partial)
    }

    fn dispatch(&self, in_flight: &mut JoinSet<Completion>, task: Task) {
        let source = self.source.clone();
        match task {
            Task::Seed(task) => {
                tracing::debug!("Dispatching seed {}", task.url);
                in_flight.spawn(async move {
                    let result = source.fetch_listing(&task).await;
                    Completion::Seed { task, result }
                });
            }
            Task::Item(task) => {
                tracing::debug!("Dispatching item {}", task.id);
                in_flight.spawn(async move {
                    let result = source.resolve(&task).await;
                    Completion::Item { task, result }
                });
            }
        }
    }

    /// Applies one completion; only structural problems are returned
    fn apply(&mut self, completion: Completion) -> Result<(), AbortReason> {
        match completion {
            Completion::Seed { task, result } => {
                self.report.seeds_visited += 1;
                match result {
                    Ok(page) => {
                        let absorbed = self.frontier.submit_listing(page)?;
                        self.report.duplicates_ignored += absorbed.duplicate_items as u64;
                        tracing::debug!(
                            "Listing {}: {} new items, {} new seeds",
                            task.url,
                            absorbed.new_items,
                            absorbed.new_seeds
                        );
                    }
                    Err(e) => {
                        tracing::warn!("Listing {} failed: {}", task.url, e);
                        self.report.seeds_failed += 1;
                        self.frontier.mark_seed_failed(&task);
                    }
                }
            }
            Completion::Item { task, result } => {
                let state = match result {
                    Ok(entry) => {
                        self.builder.add(entry);
                        ItemState::Resolved
                    }
                    Err(e) => {
                        let state = e.item_state();
                        if state.is_failure() {
                            tracing::warn!("Item {} {}: {}", task.id, state, e);
                        } else {
                            tracing::debug!("{}", e);
                        }
                        state
                    }
                };
                self.frontier.mark_done(&task.id, state)?;
                self.report.record_item(state);
            }
        }

        self.report.discovered = self.frontier.discovered() as u64;
        self.completions += 1;
        if self.completions % self.options.progress_every == 0 {
            self.log_progress();
        }
        Ok(())
    }

    /// Checks both failure ratios once at least `min_sample` attempts completed
    fn check_thresholds(&self, min_sample: u64) -> Result<(), AbortReason> {
        let threshold = self.options.failure_threshold;

        if self.report.seeds_visited >= min_sample.max(1) {
            let ratio = self.report.seed_failure_ratio();
            if ratio >= threshold {
                return Err(AbortReason::SeedFailureThreshold { ratio, threshold });
            }
        }

        if self.report.attempted() >= min_sample.max(1) {
            let ratio = self.report.failure_ratio();
            if ratio >= threshold {
                return Err(AbortReason::FailureThreshold { ratio, threshold });
            }
        }

        Ok(())
    }

    fn finalize(mut self, partial: bool) -> Result<RunOutcome, RunAborted> {
        self.sync_request_counters();

        if let Err(reason) = self.check_thresholds(1) {
            return Err(self.abort(reason));
        }
        if self.builder.is_empty() {
            return Err(self.abort(AbortReason::EmptyCatalog));
        }

        let snapshot = self.builder.finalize(partial);
        self.report.partial = partial;
        match snapshot.content_hash() {
            Ok(hash) => self.report.snapshot_hash = Some(hash),
            Err(e) => tracing::warn!("Could not hash snapshot: {}", e),
        }

        let diff = self
            .previous
            .as_deref()
            .map(|previous| CatalogBuilder::diff(&snapshot, Some(previous)));
        if let Some(diff) = &diff {
            self.report.apply_diff(diff);
        }

        let status = if partial {
            RunStatus::Partial
        } else {
            RunStatus::Completed
        };
        self.report.finish(status);

        tracing::info!(
            "Run {} with {} entries ({} seeds, {} items attempted)",
            status,
            snapshot.len(),
            self.report.seeds_visited,
            self.report.attempted()
        );

        Ok(RunOutcome {
            snapshot,
            report: self.report,
            diff,
        })
    }

    fn abort(&mut self, reason: AbortReason) -> RunAborted {
        self.sync_request_counters();
        self.report.abort_reason = Some(reason.to_string());
        self.report.finish(RunStatus::Aborted);
        tracing::error!("Aborting run: {}", reason);

        RunAborted {
            reason,
            report: self.report.clone(),
        }
    }

    fn sync_request_counters(&mut self) {
        self.report.retried = self.source.retries();
        self.report.requests = self.source.requests();
        self.report.discovered = self.frontier.discovered() as u64;
    }

    fn log_progress(&self) {
        let elapsed = (chrono::Utc::now() - self.report.started_at)
            .num_milliseconds()
            .max(1) as f64
            / 1000.0;
        tracing::info!(
            "Progress: {} completed, {} resolved, {} pending items, {} pending seeds, {} claimed, {:.2} tasks/sec",
            self.completions,
            self.report.resolved,
            self.frontier.pending_items(),
            self.frontier.pending_seeds(),
            self.frontier.claimed_items(),
            self.completions as f64 / elapsed
        );
    }
}
