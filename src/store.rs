//! Read and write the persisted master record.
//!
//! The file is pretty-printed JSON (two-space indent, trailing newline) so it
//! diffs cleanly. Writes go through a temp file in the same directory and are
//! persisted over the target in one rename.

use std::fs;
use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::info;

use crate::error::{Error, Result};
use crate::model::MasterData;
use crate::utils;

/// Read the record and re-derive everything computed from its groups, so a
/// hand-edited or foreign file cannot carry stale counts or timestamps.
pub fn load(path: &Path) -> Result<MasterData> {
    let content = fs::read_to_string(path).map_err(|e| {
        Error::resource(
            path,
            format!("Failed to read master record ({e})"),
            "Run `onetab-archive extract` or `onetab-archive ingest` first, or pass --master.",
        )
    })?;
    let mut master: MasterData = serde_json::from_str(&content)?;
    master.rederive();
    Ok(master)
}

/// Load the record if the file exists.
pub fn load_if_exists(path: &Path) -> Result<Option<MasterData>> {
    match path.try_exists() {
        Ok(true) => load(path).map(Some),
        Ok(false) => Ok(None),
        Err(e) => Err(Error::resource(
            path,
            format!("Cannot access master record ({e})"),
            "Check the file permissions of the master record and its directory.",
        )),
    }
}

const WRITE_HINT: &str =
    "Check that the directory is writable, or pass --master with another location.";

pub fn to_json(master: &MasterData) -> Result<String> {
    let mut json = serde_json::to_string_pretty(master)?;
    json.push('\n');
    Ok(json)
}

/// Persist `master`, re-deriving order, stats and `exported_at` first.
pub fn save(path: &Path, master: &mut MasterData) -> Result<()> {
    master.refresh(utils::now_iso());
    let json = to_json(master)?;

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let write_failed = |e: std::io::Error| {
        Error::resource(
            dir,
            format!("Failed to write master record ({e})"),
            WRITE_HINT,
        )
    };
    fs::create_dir_all(dir).map_err(write_failed)?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(write_failed)?;
    tmp.write_all(json.as_bytes()).map_err(write_failed)?;
    tmp.flush().map_err(write_failed)?;
    tmp.persist(path).map_err(|e| {
        Error::resource(
            path,
            format!("Failed to replace master record ({})", e.error),
            "Check that the file is not open read-only or locked by another program.",
        )
    })?;

    info!(
        path = %path.display(),
        groups = master.stats.total_groups,
        tabs = master.stats.total_tabs,
        "master record written"
    );
    Ok(())
}
