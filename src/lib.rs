//! cws-lister: a catalog builder for the Chrome Web Store
//!
//! This crate enumerates every publicly listed store item through the store's
//! browse surfaces (sitemap index, sitemap shards, paginated listings),
//! resolves each item's detail page, and produces one sorted, de-duplicated
//! snapshot per run.

pub mod catalog;
pub mod config;
pub mod crawler;
pub mod output;
pub mod state;
pub mod url;

use thiserror::Error;

/// Main error type for cws-lister operations
#[derive(Debug, Error)]
pub enum ListerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL and identifier errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingDomain,

    #[error("Not a store detail URL: {0}")]
    NotADetailUrl(String),

    #[error("Invalid item id: {0:?}")]
    InvalidItemId(String),
}

/// Result type alias for cws-lister operations
pub type Result<T> = std::result::Result<T, ListerError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use catalog::{CatalogBuilder, CatalogEntry, ItemId, Snapshot, SnapshotDiff};
pub use config::Config;
pub use crawler::{run, AbortReason, RunAborted, RunOutcome};
pub use output::{RunReport, RunStatus};
pub use state::{HostState, ItemState};
