//! Comparison of a snapshot against the previous run's artifact

use crate::catalog::entry::{CatalogEntry, ItemId};
use serde::Serialize;
use std::collections::HashMap;

/// Identifier-level difference between two catalogs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SnapshotDiff {
    /// Ids present now but not before, sorted
    pub added: Vec<ItemId>,

    /// Ids present before but not now, sorted
    pub removed: Vec<ItemId>,

    /// Ids present in both catalogs
    pub unchanged: usize,

    /// Subset of `unchanged` whose name or URLs differ
    pub updated: usize,
}

impl SnapshotDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.updated == 0
    }
}

/// Diffs the current entries against a previous catalog
///
/// Neither side needs to be sorted; duplicate ids in `previous` collapse to
/// their last occurrence.
pub fn diff_entries(current: &[CatalogEntry], previous: &[CatalogEntry]) -> SnapshotDiff {
    let before: HashMap<&ItemId, &CatalogEntry> = previous.iter().map(|e| (&e.id, e)).collect();
    let now: HashMap<&ItemId, &CatalogEntry> = current.iter().map(|e| (&e.id, e)).collect();

    let mut added: Vec<ItemId> = Vec::new();
    let mut unchanged = 0;
    let mut updated = 0;

    for (id, entry) in &now {
        match before.get(id) {
            Some(old) => {
                unchanged += 1;
                if old != entry {
                    updated += 1;
                }
            }
            None => added.push((*id).clone()),
        }
    }

    let mut removed: Vec<ItemId> = before
        .keys()
        .filter(|id| !now.contains_key(*id))
        .map(|id| (*id).clone())
        .collect();

    added.sort();
    removed.sort();

    SnapshotDiff {
        added,
        removed,
        unchanged,
        updated,
    }
}
