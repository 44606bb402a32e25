//! Configuration module for cws-lister
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use cws_lister::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("lister.toml")).unwrap();
//! println!("Worker pool size: {}", config.fetcher.max_concurrency);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, FetcherConfig, OutputConfig, RunConfig, SeedEntry, StoreConfig, UserAgentConfig,
    DEFAULT_DOWNLOAD_URL_TEMPLATE, DEFAULT_SEED_URL, DEFAULT_STORE_BASE_URL,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::validate;
