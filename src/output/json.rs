//! The `data.json` artifact and the run report file

use crate::catalog::{CatalogEntry, Snapshot};
use crate::output::report::RunReport;
use crate::output::{OutputError, OutputResult};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Writes the snapshot artifact atomically
///
/// The bytes go to a sibling temp file first and are renamed into place, so
/// readers see either the old artifact or the complete new one.
pub fn write_snapshot(snapshot: &Snapshot, path: &Path) -> OutputResult<()> {
    let bytes = snapshot.to_json_bytes()?;
    write_atomic(path, &bytes)?;
    tracing::info!("Wrote {} entries to {}", snapshot.len(), path.display());
    Ok(())
}

/// Loads the previous snapshot's entries
///
/// A missing file is a first run and yields `None`; a file that exists but
/// does not parse as a catalog is an error.
pub fn load_previous(path: &Path) -> OutputResult<Option<Vec<CatalogEntry>>> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::info!("No previous snapshot at {}", path.display());
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    };

    let entries: Vec<CatalogEntry> =
        serde_json::from_slice(&bytes).map_err(|e| OutputError::InvalidSnapshot {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

    tracing::debug!(
        "Loaded {} previous entries from {}",
        entries.len(),
        path.display()
    );
    Ok(Some(entries))
}

/// Writes the run report as pretty JSON
pub fn write_report(report: &RunReport, path: &Path) -> OutputResult<()> {
    let mut json = report.to_json_pretty()?;
    json.push('\n');
    write_atomic(path, json.as_bytes())
}

fn write_atomic(path: &Path, bytes: &[u8]) -> OutputResult<()> {
    let tmp_path = temp_path(path);

    fs::write(&tmp_path, bytes).map_err(|e| OutputError::Write {
        path: tmp_path.display().to_string(),
        reason: e.to_string(),
    })?;

    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        OutputError::Write {
            path: path.display().to_string(),
            reason: e.to_string(),
        }
    })
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "output".into());
    name.push(".tmp");
    path.with_file_name(name)
}
