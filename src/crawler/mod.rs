//! Crawler module for catalog enumeration
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with retry logic and a whole-call budget
//! - Listing and detail page parsing
//! - Per-host pacing and global concurrency limits
//! - The frontier of pending seeds and items
//! - Overall run coordination

mod coordinator;
mod fetcher;
mod frontier;
mod parser;
mod resolver;
mod scheduler;
mod source;

pub use coordinator::{
    AbortReason, Coordinator, RunAborted, RunOptions, RunOutcome, EARLY_ABORT_MIN_SAMPLE,
};
pub use fetcher::{
    backoff_delay, build_http_client, FetchError, FetchErrorKind, FetchFailure, Fetcher,
    RawResponse, RequestKind,
};
pub use frontier::{
    Frontier, FrontierError, ItemTask, ListingAbsorbed, ListingPage, SeedOrigin, SeedTask, Task,
};
pub use parser::{
    parse_detail_page, parse_listing, parse_sitemap, DetailPage, ListingKind, ParseError,
};
pub use resolver::{ItemResolver, ResolveError};
pub use scheduler::{RequestSlot, Scheduler};
pub use source::{CatalogSource, ListingError, StoreSource};

use crate::catalog::CatalogEntry;
use crate::config::Config;
use crate::output::RunReport;

/// Runs a complete catalog crawl against the live store
///
/// This is the main entry point for a run. It will:
/// 1. Build the HTTP client and fetcher
/// 2. Seed the frontier with the configured listing URLs
/// 3. Fetch listings and resolve items until the frontier drains
/// 4. Finalize and diff the snapshot
///
/// # Arguments
///
/// * `config` - The validated configuration
/// * `previous` - Entries of the last published snapshot, if any
///
/// # Returns
///
/// * `Ok(RunOutcome)` - A snapshot was produced (possibly partial)
/// * `Err(RunAborted)` - No snapshot; the previous artifact must stand
pub async fn run(
    config: &Config,
    previous: Option<Vec<CatalogEntry>>,
) -> Result<RunOutcome, RunAborted> {
    run_with_hash(config, previous, None).await
}

/// Like [`run`], recording the configuration hash in the report
pub async fn run_with_hash(
    config: &Config,
    previous: Option<Vec<CatalogEntry>>,
    config_hash: Option<String>,
) -> Result<RunOutcome, RunAborted> {
    let source = StoreSource::from_config(config).map_err(|e| {
        let mut report = RunReport::new();
        let reason = AbortReason::Setup(e.to_string());
        report.config_hash = config_hash.clone();
        report.abort_reason = Some(reason.to_string());
        report.finish(crate::output::RunStatus::Aborted);
        RunAborted { reason, report }
    })?;

    Coordinator::new(source, RunOptions::from_config(config), config.seed_urls())
        .with_previous(previous)
        .with_config_hash(config_hash)
        .run()
        .await
}
