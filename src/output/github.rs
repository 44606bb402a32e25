//! GitHub Actions step outputs

use crate::output::report::RunReport;
use crate::output::OutputResult;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Path of the step output file when running under GitHub Actions
pub fn github_output_path() -> Option<PathBuf> {
    if std::env::var("GITHUB_ACTIONS").ok().as_deref() != Some("true") {
        return None;
    }
    std::env::var_os("GITHUB_OUTPUT")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

/// Renders `key=value` lines for the step outputs
pub fn format_github_outputs(report: &RunReport, items_count: usize, output_file: &str) -> String {
    let fields: [(&str, String); 8] = [
        ("items_count", items_count.to_string()),
        ("output_file", output_file.to_string()),
        ("added", report.added.unwrap_or(0).to_string()),
        ("removed", report.removed.unwrap_or(0).to_string()),
        ("failed", report.failures().to_string()),
        ("not_found", report.not_found.to_string()),
        (
            "snapshot_hash",
            report.snapshot_hash.clone().unwrap_or_default(),
        ),
        ("status", report.status.to_string()),
    ];

    fields
        .iter()
        .map(|(key, value)| format!("{}={}\n", key, value))
        .collect()
}

/// Appends the step outputs to `path`
pub fn append_github_outputs(
    path: &Path,
    report: &RunReport,
    items_count: usize,
    output_file: &str,
) -> OutputResult<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(format_github_outputs(report, items_count, output_file).as_bytes())?;
    tracing::debug!("Appended step outputs to {}", path.display());
    Ok(())
}
