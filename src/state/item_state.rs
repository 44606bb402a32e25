/// Item state definitions for tracking resolution progress
use std::fmt;

/// Represents where an item identifier is in the resolution pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemState {
    // ===== Active States =====
    /// Discovered in a listing and waiting for a worker
    Pending,

    /// Handed to a worker; resolution in flight
    Claimed,

    // ===== Terminal Success State =====
    /// Resolved into a catalog entry
    Resolved,

    // ===== Terminal Attrition State =====
    /// Detail page is gone (404/410 or redirected away); not retried
    NotFound,

    // ===== Terminal Error States =====
    /// Detail page fetched but its shape was not recognized
    Malformed,

    /// Fetch failed in a way retrying would not fix
    FailedPermanent,

    /// Fetch still failing after every retry
    FailedTransient,
}

impl ItemState {
    /// Returns true if no further processing will happen for this item
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending | Self::Claimed)
    }

    /// Returns true if this state counts against the failure ratio
    ///
    /// NotFound is ordinary attrition and does not.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Self::Malformed | Self::FailedPermanent | Self::FailedTransient
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Claimed => "claimed",
            Self::Resolved => "resolved",
            Self::NotFound => "not_found",
            Self::Malformed => "malformed",
            Self::FailedPermanent => "failed_permanent",
            Self::FailedTransient => "failed_transient",
        }
    }
}

impl fmt::Display for ItemState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
