//! Markdown summary generation
//!
//! This module generates a human-readable summary of a run, suitable for
//! release notes next to the published artifact.

use crate::catalog::SnapshotDiff;
use crate::output::report::RunReport;
use crate::output::OutputResult;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Identifiers listed per diff section before the list is cut off
const MAX_LISTED_IDS: usize = 50;

/// Writes the markdown summary for a run
///
/// # Arguments
///
/// * `report` - The finished run report
/// * `diff` - Difference from the previous snapshot, if one was loaded
/// * `output_path` - Path where the markdown file should be written
pub fn write_markdown_summary(
    report: &RunReport,
    diff: Option<&SnapshotDiff>,
    output_path: &Path,
) -> OutputResult<()> {
    let markdown = format_markdown_summary(report, diff);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats a run report as markdown
pub fn format_markdown_summary(report: &RunReport, diff: Option<&SnapshotDiff>) -> String {
    let mut md = String::new();

    md.push_str("# Chrome Web Store Catalog Run\n\n");

    // Run metadata
    md.push_str("## Run Information\n\n");
    md.push_str(&format!("- **Started**: {}\n", report.started_at.to_rfc3339()));
    if let Some(finished) = &report.finished_at {
        md.push_str(&format!("- **Finished**: {}\n", finished.to_rfc3339()));
    }
    md.push_str(&format!(
        "- **Duration**: {:.1} seconds\n",
        report.elapsed_ms as f64 / 1000.0
    ));
    md.push_str(&format!("- **Status**: {}\n", report.status));
    if let Some(reason) = &report.abort_reason {
        md.push_str(&format!("- **Abort Reason**: {}\n", reason));
    }
    if let Some(hash) = &report.config_hash {
        md.push_str(&format!("- **Config Hash**: `{}`\n", hash));
    }
    if let Some(hash) = &report.snapshot_hash {
        md.push_str(&format!("- **Snapshot Hash**: `{}`\n", hash));
    }
    md.push('\n');

    // Item outcomes
    md.push_str("## Items\n\n");
    md.push_str("| Outcome | Count |\n");
    md.push_str("|---------|-------|\n");
    md.push_str(&format!("| Discovered | {} |\n", report.discovered));
    md.push_str(&format!("| Resolved | {} |\n", report.resolved));
    md.push_str(&format!("| Not Found | {} |\n", report.not_found));
    md.push_str(&format!("| Malformed | {} |\n", report.malformed));
    md.push_str(&format!(
        "| Failed (permanent) | {} |\n",
        report.failed_permanent
    ));
    md.push_str(&format!(
        "| Failed (transient) | {} |\n",
        report.failed_transient
    ));
    md.push_str(&format!(
        "| Duplicates Ignored | {} |\n\n",
        report.duplicates_ignored
    ));
    md.push_str(&format!(
        "- **Failure Ratio**: {:.2}%\n",
        report.failure_ratio() * 100.0
    ));
    md.push_str(&format!(
        "- **Seeds**: {} visited, {} failed\n",
        report.seeds_visited, report.seeds_failed
    ));
    md.push_str(&format!(
        "- **Requests**: {} sent, {} retried\n\n",
        report.requests, report.retried
    ));

    if report.partial {
        md.push_str("> The deadline expired before every listing was visited; this snapshot is partial.\n\n");
    }

    if let Some(diff) = diff {
        md.push_str("## Changes Since Previous Snapshot\n\n");
        md.push_str(&format!("- **Added**: {}\n", diff.added.len()));
        md.push_str(&format!("- **Removed**: {}\n", diff.removed.len()));
        md.push_str(&format!("- **Unchanged**: {}\n", diff.unchanged));
        md.push_str(&format!("- **Updated**: {}\n\n", diff.updated));

        for (title, ids) in [("Added", &diff.added), ("Removed", &diff.removed)] {
            if ids.is_empty() {
                continue;
            }
            md.push_str(&format!("### {}\n\n", title));
            for id in ids.iter().take(MAX_LISTED_IDS) {
                md.push_str(&format!("- `{}`\n", id));
            }
            if ids.len() > MAX_LISTED_IDS {
                md.push_str(&format!(
                    "\n... and {} more\n\n",
                    ids.len() - MAX_LISTED_IDS
                ));
            } else {
                md.push('\n');
            }
        }
    }

    md
}
