//! Central admission control for outgoing requests
//!
//! This module handles:
//! - Global concurrency limiting via a semaphore
//! - Per-host minimum spacing through reserved slots
//! - Pushing a host back after it answers 429

use crate::state::HostState;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;

/// Permission to send one request
///
/// Holds one concurrency permit; dropping it frees the permit.
#[derive(Debug)]
pub struct RequestSlot {
    pub host: String,

    /// Time spent waiting for the host's slot
    pub waited: Duration,

    _permit: OwnedSemaphorePermit,
}

/// Scheduler shared by every fetch in a run
///
/// The scheduler coordinates:
/// - Global concurrency limits (max requests in flight)
/// - Per-host rate limits (minimum time between request starts)
///
/// The host map lock is only held while reserving a slot, never while
/// sleeping for it.
#[derive(Debug)]
pub struct Scheduler {
    semaphore: Arc<Semaphore>,
    hosts: Mutex<HashMap<String, HostState>>,
    min_interval: Duration,
}

impl Scheduler {
    pub fn new(max_concurrency: u32, min_interval: Duration) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrency.max(1) as usize)),
            hosts: Mutex::new(HashMap::new()),
            min_interval,
        }
    }

    /// Waits for a concurrency permit and then for the host's next slot
    ///
    /// Returns `None` only if the semaphore has been closed.
    pub async fn acquire(&self, host: &str) -> Option<RequestSlot> {
        let permit = self.semaphore.clone().acquire_owned().await.ok()?;

        let now = Instant::now();
        let slot = {
            let mut hosts = self.hosts.lock().await;
            hosts
                .entry(host.to_string())
                .or_insert_with(HostState::new)
                .reserve(now, self.min_interval)
        };

        let waited = slot.saturating_duration_since(now);
        if !waited.is_zero() {
            tracing::trace!("Waiting {:?} for slot on {}", waited, host);
            tokio::time::sleep_until(slot).await;
        }

        Some(RequestSlot {
            host: host.to_string(),
            waited,
            _permit: permit,
        })
    }

    /// Keeps every request to `host` back for `retry_after`
    pub async fn mark_rate_limited(&self, host: &str, retry_after: Duration) {
        let now = Instant::now();
        let mut hosts = self.hosts.lock().await;
        let state = hosts.entry(host.to_string()).or_insert_with(HostState::new);
        state.penalize(now + retry_after);
        // An earlier, longer hold is kept, so report the effective one
        tracing::debug!(
            "Host {} rate limited ({} hits), holding for {:?}",
            host,
            state.rate_limit_hits,
            state.time_until_next_request(now).unwrap_or(retry_after)
        );
    }

    /// Snapshot of one host's state
    pub async fn host_state(&self, host: &str) -> Option<HostState> {
        self.hosts.lock().await.get(host).cloned()
    }

    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }
}
