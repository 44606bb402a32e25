//! Catalog data model and snapshot construction
//!
//! - `ItemId` / `CatalogEntry`: the published record and its key
//! - `CatalogBuilder` / `Snapshot`: order-independent accumulation and the
//!   deterministic, sorted output of one run
//! - `SnapshotDiff`: comparison against the previous artifact

mod builder;
mod diff;
mod entry;

pub use builder::{CatalogBuilder, Snapshot};
pub use diff::{diff_entries, SnapshotDiff};
pub use entry::{sanitize_name, CatalogEntry, EntryError, ItemId, ITEM_ID_LEN, MAX_NAME_CHARS};
