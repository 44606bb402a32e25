//! Run statistics
//!
//! The report is owned by the run coordinator while the run is in flight
//! and is the input to every failure-threshold decision.

use crate::catalog::SnapshotDiff;
use crate::state::ItemState;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Completed,
    /// Deadline expired before the frontier drained
    Partial,
    Aborted,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Partial => "partial",
            Self::Aborted => "aborted",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Counters for one run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub elapsed_ms: u64,
    pub status: RunStatus,

    /// Why the run was aborted, if it was
    pub abort_reason: Option<String>,

    /// SHA-256 of the configuration file the run used
    pub config_hash: Option<String>,

    // ===== Seeds =====
    /// Seed tasks that completed, successfully or not
    pub seeds_visited: u64,
    pub seeds_failed: u64,

    // ===== Items =====
    /// Distinct identifiers found in listings
    pub discovered: u64,
    pub duplicates_ignored: u64,
    pub resolved: u64,
    pub not_found: u64,
    pub malformed: u64,
    pub failed_permanent: u64,
    pub failed_transient: u64,

    // ===== Requests =====
    pub retried: u64,
    pub requests: u64,

    // ===== Snapshot =====
    pub partial: bool,
    pub snapshot_hash: Option<String>,
    pub added: Option<usize>,
    pub removed: Option<usize>,
    pub unchanged: Option<usize>,
    pub updated: Option<usize>,
}

impl Default for RunReport {
    fn default() -> Self {
        Self::new()
    }
}

impl RunReport {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            elapsed_ms: 0,
            status: RunStatus::Completed,
            abort_reason: None,
            config_hash: None,
            seeds_visited: 0,
            seeds_failed: 0,
            discovered: 0,
            duplicates_ignored: 0,
            resolved: 0,
            not_found: 0,
            malformed: 0,
            failed_permanent: 0,
            failed_transient: 0,
            retried: 0,
            requests: 0,
            partial: false,
            snapshot_hash: None,
            added: None,
            removed: None,
            unchanged: None,
            updated: None,
        }
    }

    /// Counts one item reaching a terminal state
    pub fn record_item(&mut self, state: ItemState) {
        match state {
            ItemState::Resolved => self.resolved += 1,
            ItemState::NotFound => self.not_found += 1,
            ItemState::Malformed => self.malformed += 1,
            ItemState::FailedPermanent => self.failed_permanent += 1,
            ItemState::FailedTransient => self.failed_transient += 1,
            ItemState::Pending | ItemState::Claimed => {}
        }
    }

    /// Items that reached a terminal state
    pub fn attempted(&self) -> u64 {
        self.resolved + self.not_found + self.failures()
    }

    /// Items that count against the failure ratio; NotFound is attrition, not failure
    pub fn failures(&self) -> u64 {
        self.malformed + self.failed_permanent + self.failed_transient
    }

    pub fn failure_ratio(&self) -> f64 {
        ratio(self.failures(), self.attempted())
    }

    pub fn seed_failure_ratio(&self) -> f64 {
        ratio(self.seeds_failed, self.seeds_visited)
    }

    pub fn apply_diff(&mut self, diff: &SnapshotDiff) {
        self.added = Some(diff.added.len());
        self.removed = Some(diff.removed.len());
        self.unchanged = Some(diff.unchanged);
        self.updated = Some(diff.updated);
    }

    /// Stamps the finish time and elapsed duration
    pub fn finish(&mut self, status: RunStatus) {
        let now = Utc::now();
        self.status = status;
        self.finished_at = Some(now);
        self.elapsed_ms = (now - self.started_at).num_milliseconds().max(0) as u64;
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

fn ratio(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

/// Logs a report summary
pub fn log_report(report: &RunReport) {
    tracing::info!(
        "Run {} in {:.1}s: {} resolved, {} not found, {} malformed, {} failed ({} permanent, {} transient)",
        report.status,
        report.elapsed_ms as f64 / 1000.0,
        report.resolved,
        report.not_found,
        report.malformed,
        report.failed_permanent + report.failed_transient,
        report.failed_permanent,
        report.failed_transient
    );
    tracing::info!(
        "Seeds: {} visited, {} failed; items: {} discovered, {} duplicates ignored",
        report.seeds_visited,
        report.seeds_failed,
        report.discovered,
        report.duplicates_ignored
    );
    tracing::info!(
        "Requests: {} sent, {} retried; failure ratio {:.2}%",
        report.requests,
        report.retried,
        report.failure_ratio() * 100.0
    );

    if let (Some(added), Some(removed)) = (report.added, report.removed) {
        tracing::info!(
            "Diff against previous snapshot: +{} -{} ({} unchanged, {} updated)",
            added,
            removed,
            report.unchanged.unwrap_or(0),
            report.updated.unwrap_or(0)
        );
    }
    if let Some(reason) = &report.abort_reason {
        tracing::error!("Abort reason: {}", reason);
    }
}
