//! Orchestration from a raw payload to the persisted master record.
//!
//! Each entry point reads one source, normalizes it into a batch, merges the
//! batch over whatever is already on disk, and saves the result.

use std::fs;
use std::io::Read;
use std::path::Path;

use eyre::{Context, Result};
use serde_json::Value;
use tracing::{debug, info};

use crate::config::ExtractConfig;
use crate::importer;
use crate::leveldb;
use crate::merge::{MergeSummary, merge_with_summary};
use crate::model::{ExtractionMethod, MasterData, Source};
use crate::normalize;
use crate::store;
use crate::utils;

fn source_for(config: &ExtractConfig, method: ExtractionMethod) -> Source {
    Source {
        browser: config.browser,
        extension_id: config.extension_id.clone(),
        extraction_method: method,
    }
}

/// Merge `incoming` over the record at `master_path` (or an empty one) and save.
fn merge_into(master_path: &Path, incoming: &MasterData) -> Result<MergeSummary> {
    let existing = store::load_if_exists(master_path)?
        .unwrap_or_else(|| MasterData::empty(incoming.source.clone(), utils::now_iso()));

    let (mut merged, summary) = merge_with_summary(&existing, incoming);
    store::save(master_path, &mut merged)
        .wrap_err_with(|| format!("Failed to save master record: {}", master_path.display()))?;

    info!(
        added = summary.added,
        duplicates = summary.duplicates,
        total = summary.total,
        "merge complete"
    );
    Ok(summary)
}

/// Validate and normalize a raw OneTab payload, then merge it into the record.
pub fn ingest_payload(raw: &Value, source: Source, master_path: &Path) -> Result<MergeSummary> {
    let records = importer::validate(raw).wrap_err("OneTab payload rejected")?;
    debug!(groups = records.len(), "payload validated");
    let batch = normalize::normalize(&records, source);
    merge_into(master_path, &batch)
}

/// Read the extension store through a private snapshot and ingest its state.
pub fn run_extract(
    leveldb_path: &Path,
    config: &ExtractConfig,
    master_path: &Path,
) -> Result<MergeSummary> {
    let probe = leveldb::with_snapshot(leveldb_path, |store| {
        leveldb::find_state_payload(store, config)
    })
    .wrap_err("Extraction from the browser store failed")?;
    info!(key = %probe.key.escape_debug(), "OneTab state located");

    ingest_payload(
        &probe.payload,
        source_for(config, ExtractionMethod::Leveldb),
        master_path,
    )
}

/// Ingest a JSON payload from `input`, or from stdin when `input` is `-`.
pub fn run_ingest_file(
    input: &Path,
    config: &ExtractConfig,
    master_path: &Path,
) -> Result<MergeSummary> {
    let content = if input == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .wrap_err("Failed to read payload from stdin")?;
        buf
    } else {
        fs::read_to_string(input)
            .wrap_err_with(|| format!("Failed to read payload: {}", input.display()))?
    };

    let raw: Value = serde_json::from_str(&content).wrap_err("Payload is not valid JSON")?;
    ingest_payload(&raw, source_for(config, ExtractionMethod::Json), master_path)
}

/// Merge another persisted master record into ours.
pub fn run_import(other_path: &Path, master_path: &Path) -> Result<MergeSummary> {
    let mut incoming = store::load(other_path)
        .wrap_err_with(|| format!("Failed to load record to import: {}", other_path.display()))?;
    incoming.source.extraction_method = ExtractionMethod::Import;
    incoming.exported_at = utils::now_iso();
    merge_into(master_path, &incoming)
}
