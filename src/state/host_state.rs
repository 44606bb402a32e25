use std::time::Duration;
use tokio::time::Instant;

/// Tracks the state of one upstream host for the interval gate
///
/// Slots are handed out by reservation: each caller takes the next free slot
/// and pushes it forward by the interval before releasing the gate, so
/// waiters leave one interval apart instead of all at once.
#[derive(Debug, Clone, Default)]
pub struct HostState {
    /// Number of slots reserved on this host in the current run
    pub request_count: u64,

    /// Earliest instant the next request may start
    pub next_slot: Option<Instant>,

    /// Number of times the host answered 429
    pub rate_limit_hits: u32,
}

impl HostState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves the next request slot and returns when it starts
    ///
    /// The returned instant is never earlier than `now`; the following slot
    /// starts `interval` after it.
    pub fn reserve(&mut self, now: Instant, interval: Duration) -> Instant {
        let slot = match self.next_slot {
            Some(next) if next > now => next,
            _ => now,
        };
        self.next_slot = Some(slot + interval);
        self.request_count += 1;
        slot
    }

    /// Pushes the next free slot to at least `until` (HTTP 429)
    pub fn penalize(&mut self, until: Instant) {
        self.rate_limit_hits += 1;
        if self.next_slot.map_or(true, |next| next < until) {
            self.next_slot = Some(until);
        }
    }

    /// Whether this host has ever answered 429 in this run
    pub fn is_rate_limited(&self) -> bool {
        self.rate_limit_hits > 0
    }

    /// Time until the next free slot, or None if a request may start now
    pub fn time_until_next_request(&self, now: Instant) -> Option<Duration> {
        match self.next_slot {
            Some(next) if next > now => Some(next - now),
            _ => None,
        }
    }
}
