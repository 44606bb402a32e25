//! The run's to-do state: seed tasks and item tasks
//!
//! Seeds (sitemap indexes, shards, listing pages and their cursors) and
//! item identifiers live in two FIFO queues behind one interface. Every seed
//! URL and every identifier is dequeued at most once per run; an identifier
//! that reached a terminal state is never enqueued again.

use crate::catalog::ItemId;
use crate::state::ItemState;
use crate::url::normalize_url;
use std::collections::{HashMap, HashSet, VecDeque};
use thiserror::Error;

/// Where a seed task came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SeedOrigin {
    /// Listed in the configuration
    Configured,
    /// Child of a sitemap index
    Index,
    /// Next page of a paginated listing
    Cursor,
}

/// A listing surface to fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedTask {
    pub url: String,
    pub origin: SeedOrigin,
}

/// An identifier awaiting detail resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemTask {
    pub id: ItemId,

    /// The detail URL the listing pointed at, if it had one
    pub page_hint: Option<String>,
}

impl ItemTask {
    pub fn new(id: ItemId) -> Self {
        Self { id, page_hint: None }
    }

    pub fn with_hint(id: ItemId, page_hint: impl Into<String>) -> Self {
        Self {
            id,
            page_hint: Some(page_hint.into()),
        }
    }
}

/// One fetched page of a browse surface
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingPage {
    pub source_url: String,

    /// Identifiers in page order
    pub items: Vec<ItemTask>,

    /// Child listings (sitemap index entries)
    pub children: Vec<String>,

    /// Absolute URL of the next page, if any
    pub next_cursor: Option<String>,
}

/// Work handed out by [`Frontier::next_task`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Task {
    Seed(SeedTask),
    Item(ItemTask),
}

/// Structural problems that make continuing the run pointless
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrontierError {
    #[error("cursor loop: {source_url} points back to already visited {cursor}")]
    CursorLoop { source_url: String, cursor: String },

    #[error("item {0} is not tracked by the frontier")]
    UnknownItem(ItemId),

    #[error("item {0} was already marked done")]
    AlreadyDone(ItemId),

    #[error("{state} is not a terminal state for item {id}")]
    NotTerminal { id: ItemId, state: ItemState },
}

/// What [`Frontier::submit_listing`] did with a page
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListingAbsorbed {
    pub new_items: usize,
    pub duplicate_items: usize,
    pub new_seeds: usize,
}

/// Pending seeds, pending items, claimed items and done items
///
/// Item membership is a single map from id to [`ItemState`], so the pending,
/// claimed and done sets are disjoint by construction.
#[derive(Debug, Default)]
pub struct Frontier {
    seeds_pending: VecDeque<SeedTask>,
    seeds_seen: HashSet<String>,
    items_pending: VecDeque<ItemTask>,
    items: HashMap<ItemId, ItemState>,
    claimed: usize,
    done: usize,
    seeds_dispatched: u64,
    seeds_failed: u64,
    duplicates: u64,
    prefer_seed: bool,
}

impl Frontier {
    pub fn new() -> Self {
        Self {
            prefer_seed: true,
            ..Self::default()
        }
    }

    /// Enqueues configured seed URLs; returns how many were new
    pub fn seed<I, S>(&mut self, urls: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        urls.into_iter()
            .filter(|url| self.push_seed(url.as_ref(), SeedOrigin::Configured))
            .count()
    }

    /// Dequeues the next seed task in FIFO order
    pub fn next_seed_task(&mut self) -> Option<SeedTask> {
        let task = self.seeds_pending.pop_front()?;
        self.seeds_dispatched += 1;
        Some(task)
    }

    /// Dequeues the next item task in FIFO order and marks it claimed
    pub fn next_item_task(&mut self) -> Option<ItemTask> {
        let task = self.items_pending.pop_front()?;
        self.items.insert(task.id.clone(), ItemState::Claimed);
        self.claimed += 1;
        Some(task)
    }

    /// Hands out seed and item tasks alternately while both are available
    pub fn next_task(&mut self) -> Option<Task> {
        let seed_first = self.prefer_seed || self.items_pending.is_empty();
        let task = if seed_first {
            self.next_seed_task()
                .map(Task::Seed)
                .or_else(|| self.next_item_task().map(Task::Item))
        } else {
            self.next_item_task()
                .map(Task::Item)
                .or_else(|| self.next_seed_task().map(Task::Seed))
        };

        if let Some(task) = &task {
            self.prefer_seed = matches!(task, Task::Item(_));
        }
        task
    }

    /// Absorbs a fetched listing page
    ///
    /// New identifiers become pending items; identifiers already pending,
    /// claimed or done are counted as duplicates. Unseen children become
    /// seeds and seen ones are ignored. A next cursor that points back at
    /// its own page, or at any seed already seen this run, is a cursor loop
    /// and leaves the frontier untouched.
    pub fn submit_listing(&mut self, page: ListingPage) -> Result<ListingAbsorbed, FrontierError> {
        let cursor_key = match &page.next_cursor {
            Some(cursor) => match normalize_url(cursor) {
                Ok(key) => {
                    let key = key.to_string();
                    let source_key = normalize_url(&page.source_url)
                        .map(|u| u.to_string())
                        .unwrap_or_else(|_| page.source_url.clone());
                    if key == source_key || self.seeds_seen.contains(&key) {
                        return Err(FrontierError::CursorLoop {
                            source_url: page.source_url,
                            cursor: cursor.clone(),
                        });
                    }
                    Some(key)
                }
                Err(e) => {
                    tracing::warn!("Ignoring invalid cursor {} on {}: {}", cursor, page.source_url, e);
                    None
                }
            },
            None => None,
        };

        let mut absorbed = ListingAbsorbed::default();

        for task in page.items {
            if self.items.contains_key(&task.id) {
                absorbed.duplicate_items += 1;
                continue;
            }
            self.items.insert(task.id.clone(), ItemState::Pending);
            self.items_pending.push_back(task);
            absorbed.new_items += 1;
        }
        self.duplicates += absorbed.duplicate_items as u64;

        for child in &page.children {
            if self.push_seed(child, SeedOrigin::Index) {
                absorbed.new_seeds += 1;
            }
        }

        if let Some(key) = cursor_key {
            self.seeds_seen.insert(key.clone());
            self.seeds_pending.push_back(SeedTask {
                url: key,
                origin: SeedOrigin::Cursor,
            });
            absorbed.new_seeds += 1;
        }

        tracing::trace!(
            "Absorbed {}: {} new items, {} duplicates, {} new seeds",
            page.source_url,
            absorbed.new_items,
            absorbed.duplicate_items,
            absorbed.new_seeds
        );
        Ok(absorbed)
    }

    /// Moves an item from pending or claimed to a terminal state
    pub fn mark_done(&mut self, id: &ItemId, state: ItemState) -> Result<(), FrontierError> {
        if !state.is_terminal() {
            return Err(FrontierError::NotTerminal {
                id: id.clone(),
                state,
            });
        }

        let current = self
            .items
            .get_mut(id)
            .ok_or_else(|| FrontierError::UnknownItem(id.clone()))?;

        match *current {
            ItemState::Claimed => self.claimed -= 1,
            ItemState::Pending => self.items_pending.retain(|task| &task.id != id),
            _ => return Err(FrontierError::AlreadyDone(id.clone())),
        }

        *current = state;
        self.done += 1;
        Ok(())
    }

    /// Records that a seed task could not be fetched or parsed
    pub fn mark_seed_failed(&mut self, task: &SeedTask) {
        self.seeds_failed += 1;
        tracing::debug!("Seed {} ({:?}) failed", task.url, task.origin);
    }

    /// True exactly when both pending queues are empty
    pub fn is_exhausted(&self) -> bool {
        self.seeds_pending.is_empty() && self.items_pending.is_empty()
    }

    pub fn state_of(&self, id: &ItemId) -> Option<ItemState> {
        self.items.get(id).copied()
    }

    pub fn pending_seeds(&self) -> usize {
        self.seeds_pending.len()
    }

    pub fn pending_items(&self) -> usize {
        self.items_pending.len()
    }

    pub fn claimed_items(&self) -> usize {
        self.claimed
    }

    pub fn done_items(&self) -> usize {
        self.done
    }

    /// Distinct identifiers seen this run
    pub fn discovered(&self) -> usize {
        self.items.len()
    }

    pub fn seeds_dispatched(&self) -> u64 {
        self.seeds_dispatched
    }

    pub fn seeds_failed(&self) -> u64 {
        self.seeds_failed
    }

    pub fn duplicates(&self) -> u64 {
        self.duplicates
    }

    fn push_seed(&mut self, url: &str, origin: SeedOrigin) -> bool {
        let key = match normalize_url(url) {
            Ok(key) => key.to_string(),
            Err(e) => {
                tracing::warn!("Skipping invalid seed URL {}: {}", url, e);
                return false;
            }
        };

        if !self.seeds_seen.insert(key.clone()) {
            return false;
        }
        self.seeds_pending.push_back(SeedTask { url: key, origin });
        true
    }
}
