//! Key-based accumulation of resolved entries and the frozen snapshot

use crate::catalog::diff::{diff_entries, SnapshotDiff};
use crate::catalog::entry::{CatalogEntry, ItemId};
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// Accumulates resolved entries keyed by identifier
///
/// Entries arrive in completion order; the output order is fixed only at
/// [`CatalogBuilder::finalize`].
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    entries: HashMap<ItemId, CatalogEntry>,
}

impl CatalogBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entry; returns false and keeps the existing record if the id is already present
    pub fn add(&mut self, entry: CatalogEntry) -> bool {
        if self.entries.contains_key(&entry.id) {
            tracing::warn!("Entry for {} resolved twice, keeping the first", entry.id);
            return false;
        }
        self.entries.insert(entry.id.clone(), entry);
        true
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Freezes the accumulated entries into a snapshot sorted by id
    ///
    /// Does not consume the builder: finalizing twice over the same entries
    /// yields identical artifact bytes.
    pub fn finalize(&self, partial: bool) -> Snapshot {
        let mut entries: Vec<CatalogEntry> = self.entries.values().cloned().collect();
        entries.sort_by(|a, b| a.id.cmp(&b.id));

        Snapshot {
            entries,
            generated_at: Utc::now(),
            partial,
        }
    }

    /// Diffs a snapshot against the previous catalog; with no previous
    /// catalog every entry counts as added
    pub fn diff(snapshot: &Snapshot, previous: Option<&[CatalogEntry]>) -> SnapshotDiff {
        diff_entries(&snapshot.entries, previous.unwrap_or_default())
    }
}

/// The catalog produced by one run
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Entries sorted by id, one per identifier
    pub entries: Vec<CatalogEntry>,

    pub generated_at: DateTime<Utc>,

    /// True when the run stopped at its deadline before the frontier drained
    pub partial: bool,
}

impl Snapshot {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &ItemId> {
        self.entries.iter().map(|e| &e.id)
    }

    pub fn contains(&self, id: &ItemId) -> bool {
        self.entries.binary_search_by(|e| e.id.cmp(id)).is_ok()
    }

    /// Serializes the artifact: a pretty-printed JSON array plus trailing newline
    ///
    /// Metadata is deliberately not part of the artifact, so unchanged
    /// catalogs produce identical bytes.
    pub fn to_json_bytes(&self) -> serde_json::Result<Vec<u8>> {
        let mut bytes = serde_json::to_vec_pretty(&self.entries)?;
        bytes.push(b'\n');
        Ok(bytes)
    }

    /// SHA-256 (hex) of [`Snapshot::to_json_bytes`]
    pub fn content_hash(&self) -> serde_json::Result<String> {
        let bytes = self.to_json_bytes()?;
        Ok(hex::encode(Sha256::digest(&bytes)))
    }
}
