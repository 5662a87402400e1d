//! Read-only access to the browser's extension key-value store.
//!
//! The browser holds an exclusive lock on its LevelDB directory while it runs,
//! and opening the directory in place could write compaction output into it.
//! So the directory is copied into a temp dir, the copy is opened, and both
//! the handle and the copy are dropped when the scope ends, on every path.

use std::fs;
use std::path::Path;

use rusty_leveldb::{DB, LdbIterator, Options};
use serde_json::Value;
use tempfile::TempDir;
use tracing::debug;

use crate::config::ExtractConfig;
use crate::error::{Error, Result};
use crate::importer::looks_like_state;

/// Minimal view of a key-value store, so probing can run against anything.
pub trait KeyValueStore {
    fn get(&mut self, key: &[u8]) -> Option<Vec<u8>>;
    fn entries(&mut self) -> Result<Vec<(Vec<u8>, Vec<u8>)>>;
}

pub struct LevelDbStore {
    db: DB,
}

impl KeyValueStore for LevelDbStore {
    fn get(&mut self, key: &[u8]) -> Option<Vec<u8>> {
        self.db.get(key).map(|v| v.to_vec())
    }

    fn entries(&mut self) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let mut iter = self
            .db
            .new_iter()
            .map_err(|e| Error::Io(std::io::Error::other(e.to_string())))?;
        let mut out = Vec::new();
        while let Some((k, v)) = LdbIterator::next(&mut iter) {
            out.push((k.to_vec(), v.to_vec()));
        }
        Ok(out)
    }
}

const CLOSE_BROWSER_HINT: &str =
    "Close the browser so it releases its extension storage, then run the command again.";

/// Open a private snapshot of the LevelDB directory at `path` and run `f` on it.
pub fn with_snapshot<T>(
    path: &Path,
    f: impl FnOnce(&mut dyn KeyValueStore) -> Result<T>,
) -> Result<T> {
    if !path.is_dir() {
        return Err(Error::resource(
            path,
            "Extension storage directory not found",
            "Pass --leveldb with the `Local Extension Settings/<extension id>` directory, \
             or check --browser and --extension-id.",
        ));
    }

    let snapshot = TempDir::new()?;
    copy_store_files(path, snapshot.path())?;
    debug!(src = %path.display(), dst = %snapshot.path().display(), "store snapshot copied");

    let mut opts = Options::default();
    opts.create_if_missing = false;
    let db = DB::open(snapshot.path(), opts).map_err(|e| {
        Error::resource(
            path,
            format!("Failed to open extension storage ({e})"),
            CLOSE_BROWSER_HINT,
        )
    })?;

    let mut store = LevelDbStore { db };
    let result = f(&mut store);
    drop(store);
    drop(snapshot);
    result
}

/// Copy the flat LevelDB file set, leaving the browser's `LOCK` behind.
fn copy_store_files(src: &Path, dst: &Path) -> Result<()> {
    let entries = fs::read_dir(src).map_err(|e| {
        Error::resource(src, format!("Cannot read extension storage ({e})"), CLOSE_BROWSER_HINT)
    })?;
    for entry in entries {
        let entry = entry?;
        let name = entry.file_name();
        if name == "LOCK" || !entry.file_type()?.is_file() {
            continue;
        }
        fs::copy(entry.path(), dst.join(&name)).map_err(|e| {
            Error::resource(
                entry.path(),
                format!("Cannot copy extension storage file ({e})"),
                CLOSE_BROWSER_HINT,
            )
        })?;
    }
    Ok(())
}

/// A JSON payload found in the store, with the key it came from.
#[derive(Debug, Clone)]
pub struct Probe {
    pub key: String,
    pub payload: Value,
}

/// Probe the configured candidate keys, then fall back to scanning every key
/// whose name hints at OneTab state.
pub fn find_state_payload(
    store: &mut dyn KeyValueStore,
    config: &ExtractConfig,
) -> Result<Probe> {
    for key in &config.candidate_keys {
        let Some(raw) = store.get(key.as_bytes()) else {
            continue;
        };
        if let Some(payload) = parse_state_value(&raw) {
            debug!(key = %key, "OneTab state found at candidate key");
            return Ok(Probe {
                key: key.clone(),
                payload,
            });
        }
        debug!(key = %key, "candidate key holds no OneTab state");
    }

    let entries = store.entries()?;
    let scanned = entries.len();
    for (raw_key, raw_value) in entries {
        let key = String::from_utf8_lossy(&raw_key).into_owned();
        let lower = key.to_lowercase();
        if !config.key_hints.iter().any(|h| lower.contains(&h.to_lowercase())) {
            continue;
        }
        if lower.contains("chrome-extension://")
            && !lower.contains(&config.extension_id.to_lowercase())
        {
            debug!(key = %key.escape_debug(), "skipping key of another extension");
            continue;
        }
        if let Some(payload) = parse_state_value(&raw_value) {
            debug!(key = %key.escape_debug(), "OneTab state found by key scan");
            return Ok(Probe { key, payload });
        }
    }

    Err(Error::StateNotFound { scanned })
}

fn parse_state_value(raw: &[u8]) -> Option<Value> {
    let text = decode_value(raw);
    let value: Value = serde_json::from_str(text.trim_matches('\0')).ok()?;
    looks_like_state(&value).then_some(value)
}

/// Chromium Local Storage prefixes values with an encoding byte: `0x00` for
/// UTF-16LE, `0x01` for Latin-1. Extension storage values are plain UTF-8.
pub fn decode_value(raw: &[u8]) -> String {
    match raw.split_first() {
        Some((0x00, rest)) => {
            let units: Vec<u16> = rest
                .chunks_exact(2)
                .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
                .collect();
            String::from_utf16_lossy(&units)
        }
        Some((0x01, rest)) => rest.iter().map(|&b| b as char).collect(),
        _ => String::from_utf8_lossy(raw).into_owned(),
    }
}
