use crate::model::{MasterData, TabGroup};
use crate::period::{self, GroupBy};
use crate::renderer::{self, Document};
use crate::search::{Bound, parse_flexible_date};
use crate::utils::{self, ProcessResult, parse_existing_header};
use eyre::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File name used by `--single-file`.
pub const CONSOLIDATED_FILE: &str = "onetab-all.md";

/// Everything the export needs, already resolved from CLI flags and config.
pub struct ExportConfig {
    pub target_dir: PathBuf,
    pub group_by: GroupBy,
    pub single_file: bool,
    pub from: Option<String>,
    pub to: Option<String>,
    pub force: bool,
    pub verbose: bool,
    pub quiet: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportSummary {
    pub groups: usize,
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
}

impl ExportSummary {
    fn record(&mut self, result: ProcessResult) {
        match result {
            ProcessResult::Created => self.created += 1,
            ProcessResult::Updated => self.updated += 1,
            ProcessResult::Skipped => self.skipped += 1,
        }
    }
}

pub fn execute(master: &MasterData, config: &ExportConfig) -> Result<ExportSummary> {
    let groups = select_groups(master, config.from.as_deref(), config.to.as_deref())?;
    let mut summary = ExportSummary {
        groups: groups.len(),
        ..Default::default()
    };

    if groups.is_empty() {
        if !config.quiet {
            eprintln!("No tab groups in the selected range. Nothing to export.");
        }
        return Ok(summary);
    }

    fs::create_dir_all(&config.target_dir).wrap_err_with(|| {
        format!(
            "Failed to create target directory: {}",
            config.target_dir.display()
        )
    })?;

    let generated = utils::now_iso();

    if config.single_file {
        let doc = renderer::render_consolidated(&groups, &generated)
            .wrap_err("Failed to render consolidated export")?;
        let path = config.target_dir.join(CONSOLIDATED_FILE);
        summary.record(write_document(&path, &doc, config)?);
    } else {
        for (key, members) in period::bucket(&groups, config.group_by) {
            let doc = renderer::render_period(&key, &members, config.group_by, &generated)
                .wrap_err_with(|| format!("Failed to render period {key}"))?;
            let path = config
                .target_dir
                .join(period::period_path(&key, config.group_by, "md"));
            summary.record(write_document(&path, &doc, config)?);
        }
    }

    if !config.quiet {
        eprintln!(
            "Done. {} created, {} updated, {} skipped.",
            summary.created, summary.updated, summary.skipped
        );
    }

    Ok(summary)
}

/// Groups whose creation time falls inside the flexible `from`/`to` bounds.
fn select_groups(master: &MasterData, from: Option<&str>, to: Option<&str>) -> Result<Vec<TabGroup>> {
    let from = from
        .map(|s| parse_flexible_date(s, Bound::Start))
        .transpose()
        .wrap_err("Invalid --from")?;
    let to = to
        .map(|s| parse_flexible_date(s, Bound::End))
        .transpose()
        .wrap_err("Invalid --to")?;

    let (from_ms, to_ms) = (from.map(|d| d.timestamp_millis()), to.map(|d| d.timestamp_millis()));
    Ok(master
        .groups
        .iter()
        .filter(|g| {
            from_ms.is_none_or(|f| g.created_at_epoch >= f)
                && to_ms.is_none_or(|t| g.created_at_epoch <= t)
        })
        .cloned()
        .collect())
}

/// Write `doc` unless the file on disk already carries the same content hash.
fn write_document(path: &Path, doc: &Document, config: &ExportConfig) -> Result<ProcessResult> {
    let exists = path.exists();

    if exists
        && !config.force
        && let Some(header) = parse_existing_header(path)
        && header.content_hash.as_deref() == Some(doc.content_hash.as_str())
    {
        debug!(path = %path.display(), "content unchanged");
        if config.verbose {
            eprintln!("Skipped:  {}", path.display());
        }
        return Ok(ProcessResult::Skipped);
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .wrap_err_with(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    fs::write(path, &doc.text).wrap_err_with(|| format!("Failed to write: {}", path.display()))?;

    let (result, label) = if exists {
        (ProcessResult::Updated, "Updated")
    } else {
        (ProcessResult::Created, "Created")
    };
    if config.verbose {
        eprintln!("{label}:  {}", path.display());
    }
    Ok(result)
}
