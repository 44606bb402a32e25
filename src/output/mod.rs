//! Output module for run artifacts and reports
//!
//! This module handles:
//! - Writing the `data.json` artifact atomically and loading the previous one
//! - The run report (JSON file and log summary)
//! - Markdown summaries for release notes
//! - GitHub Actions step outputs

mod github;
mod json;
mod markdown;
mod report;

pub use github::{append_github_outputs, format_github_outputs, github_output_path};
pub use json::{load_previous, write_report, write_snapshot};
pub use markdown::{format_markdown_summary, write_markdown_summary};
pub use report::{log_report, RunReport, RunStatus};

use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write {path}: {reason}")]
    Write { path: String, reason: String },

    #[error("Failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Previous snapshot {path} is not a valid catalog: {reason}")]
    InvalidSnapshot { path: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;
