use clap::{Args, Parser, Subcommand, ValueEnum};
use eyre::{Context, Result, eyre};
use onetab_archive::config::ExtractConfig;
use onetab_archive::exporter::{self, ExportConfig};
use onetab_archive::merge::MergeSummary;
use onetab_archive::model::Browser;
use onetab_archive::period::GroupBy;
use onetab_archive::search::{self, SearchEnvelope, SearchQuery};
use onetab_archive::{Error, ingest, stats, store, utils};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

const DEFAULT_MASTER: &str = "onetab-master.json";
const DEFAULT_EXPORT_DIR: &str = "onetab-export";

/// Archive OneTab tab groups, then search and export them as Markdown.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the master record.
    /// Defaults to ./onetab-master.json if not set in config.
    #[arg(long, value_name = "PATH", global = true)]
    master: Option<PathBuf>,

    /// Path to a specific configuration file.
    /// Defaults to $XDG_CONFIG_HOME/onetab-archive/config.toml
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    /// Print each file written or skipped, and debug logs.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress summaries on stderr.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Read OneTab's state from the browser's extension storage and merge it.
    Extract {
        /// The `Local Extension Settings/<extension id>` directory.
        /// Auto-detected from --browser if omitted.
        #[arg(long, value_name = "PATH")]
        leveldb: Option<PathBuf>,

        #[command(flatten)]
        source: SourceArgs,
    },

    /// Merge a OneTab JSON export (`-` for stdin).
    Ingest {
        #[arg(value_name = "FILE")]
        input: PathBuf,

        #[command(flatten)]
        source: SourceArgs,
    },

    /// Merge another master record into this one.
    Import {
        #[arg(value_name = "MASTER_FILE")]
        file: PathBuf,
    },

    /// Find tabs by text, pattern, domain and date.
    Search(SearchArgs),

    /// Write the archive as Markdown, one file per period.
    Export(ExportArgs),

    /// Summarize the archive.
    Stats {
        /// How many domains and months to list.
        #[arg(long, default_value_t = 10)]
        top: usize,
    },
}

#[derive(Args)]
struct SourceArgs {
    /// chrome, edge, brave or chromium.
    #[arg(long)]
    browser: Option<Browser>,

    /// OneTab's extension id. Defaults to the store id for --browser.
    #[arg(long, value_name = "ID")]
    extension_id: Option<String>,
}

#[derive(Args)]
struct SearchArgs {
    /// Case-insensitive substring over title, url and domain.
    #[arg(long)]
    query: Option<String>,

    /// Regular expression over titles (case-insensitive).
    #[arg(long, value_name = "REGEX")]
    title: Option<String>,

    /// Regular expression over URLs (case-insensitive).
    #[arg(long, value_name = "REGEX")]
    url: Option<String>,

    /// Domain substring, e.g. github.com.
    #[arg(long)]
    domain: Option<String>,

    /// YYYY, YYYY-MM, YYYY-MM-DD or a full timestamp.
    #[arg(long, value_name = "DATE")]
    from: Option<String>,

    #[arg(long, value_name = "DATE")]
    to: Option<String>,

    /// Maximum results printed to the console.
    #[arg(long, default_value_t = 50)]
    limit: usize,

    /// Write all results to a file instead of the console.
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Output file format. Inferred from the --output extension if omitted.
    #[arg(long, value_enum)]
    format: Option<OutputFormat>,
}

#[derive(Args)]
struct ExportArgs {
    /// Directory to export markdown files.
    /// Defaults to ./onetab-export if not set in config.
    #[arg(value_name = "TARGET_DIR")]
    target_dir: Option<PathBuf>,

    #[arg(long, value_name = "PERIOD")]
    group_by: Option<GroupBy>,

    /// Write everything to a single onetab-all.md.
    #[arg(long)]
    single_file: bool,

    #[arg(long, value_name = "DATE")]
    from: Option<String>,

    #[arg(long, value_name = "DATE")]
    to: Option<String>,

    /// Rewrite files even if their content is unchanged.
    #[arg(short, long)]
    force: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Json,
    Markdown,
}

#[derive(Deserialize, Default)]
struct FileConfig {
    master_path: Option<PathBuf>,
    export_dir: Option<PathBuf>,
    leveldb_path: Option<PathBuf>,
    browser: Option<Browser>,
    extension_id: Option<String>,
    group_by: Option<GroupBy>,
}

fn load_file_config(explicit_path: Option<&Path>) -> Result<FileConfig> {
    let path = if let Some(p) = explicit_path {
        if !p.exists() {
            return Err(eyre!("Config file not found: {}", p.display()));
        }
        Some(p.to_path_buf())
    } else {
        dirs::config_dir()
            .map(|d| d.join("onetab-archive/config.toml"))
            .filter(|p| p.exists())
    };

    match path {
        None => Ok(FileConfig::default()),
        Some(p) => {
            let content = fs::read_to_string(&p)
                .wrap_err_with(|| format!("Failed to read config: {}", p.display()))?;
            toml::from_str(&content)
                .wrap_err_with(|| format!("Failed to parse config: {}", p.display()))
        }
    }
}

fn init_tracing(verbose: bool, quiet: bool) {
    let default = match (verbose, quiet) {
        (true, _) => "onetab_archive=debug",
        (_, true) => "onetab_archive=error",
        _ => "onetab_archive=warn",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// CLI > config file > built-in default.
fn extract_config(args: SourceArgs, file_cfg: &FileConfig) -> ExtractConfig {
    let browser = args.browser.or(file_cfg.browser).unwrap_or_default();
    let config = ExtractConfig::for_browser(browser);
    match args.extension_id.or_else(|| file_cfg.extension_id.clone()) {
        Some(id) => config.with_extension_id(id),
        None => config,
    }
}

fn report_merge(summary: MergeSummary, master: &Path, quiet: bool) {
    if !quiet {
        eprintln!(
            "Merged into {}: {} added, {} already archived, {} total.",
            master.display(),
            summary.added,
            summary.duplicates,
            summary.total
        );
    }
}

fn run_search(args: SearchArgs, master_path: &Path, quiet: bool) -> Result<()> {
    let query = SearchQuery {
        query: args.query,
        title_pattern: args.title,
        url_pattern: args.url,
        domain: args.domain,
        from: args.from,
        to: args.to,
    };
    if !query.has_text_predicate() {
        return Err(Error::EmptyQuery.into());
    }

    let master = store::load(master_path)?;
    let outcome = search::search(&master, &query)?;
    for warning in &outcome.warnings {
        eprintln!("Warning: {warning}");
    }

    let Some(output) = args.output else {
        if outcome.results.is_empty() {
            println!("No tabs matched.");
        } else {
            print!("{}", search::render_console(&outcome.results, args.limit)?);
        }
        return Ok(());
    };

    let format = args.format.unwrap_or_else(|| {
        match output.extension().and_then(|e| e.to_str()) {
            Some("md" | "markdown") => OutputFormat::Markdown,
            _ => OutputFormat::Json,
        }
    });
    let body = match format {
        OutputFormat::Json => {
            let mut json =
                serde_json::to_string_pretty(&SearchEnvelope::new(&query, &outcome.results))?;
            json.push('\n');
            json
        }
        OutputFormat::Markdown => {
            search::render_markdown(&query, &outcome.results, &utils::now_iso())?
        }
    };
    fs::write(&output, body)
        .wrap_err_with(|| format!("Failed to write: {}", output.display()))?;

    if !quiet {
        eprintln!("Wrote {} results to {}", outcome.results.len(), output.display());
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    // 1. Load config file (CLI path > default path)
    let file_cfg = load_file_config(cli.config.as_deref())?;

    // 2. Resolve the master record path (CLI > Config > Default)
    let master_path = cli
        .master
        .or_else(|| file_cfg.master_path.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_MASTER));

    match cli.command {
        Command::Extract { leveldb, source } => {
            let config = extract_config(source, &file_cfg);
            let leveldb_path = leveldb
                .or_else(|| file_cfg.leveldb_path.clone())
                .or_else(|| config.default_leveldb_path())
                .ok_or_else(|| {
                    eyre!("Could not determine the extension storage path.\nUse --leveldb to specify it manually, or set leveldb_path in config.toml.")
                })?;
            let summary = ingest::run_extract(&leveldb_path, &config, &master_path)?;
            report_merge(summary, &master_path, cli.quiet);
        }
        Command::Ingest { input, source } => {
            let config = extract_config(source, &file_cfg);
            let summary = ingest::run_ingest_file(&input, &config, &master_path)?;
            report_merge(summary, &master_path, cli.quiet);
        }
        Command::Import { file } => {
            let summary = ingest::run_import(&file, &master_path)?;
            report_merge(summary, &master_path, cli.quiet);
        }
        Command::Search(args) => run_search(args, &master_path, cli.quiet)?,
        Command::Export(args) => {
            let master = store::load(&master_path)?;
            let config = ExportConfig {
                target_dir: args
                    .target_dir
                    .or(file_cfg.export_dir)
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_EXPORT_DIR)),
                group_by: args.group_by.or(file_cfg.group_by).unwrap_or_default(),
                single_file: args.single_file,
                from: args.from,
                to: args.to,
                force: args.force,
                verbose: cli.verbose,
                quiet: cli.quiet,
            };
            exporter::execute(&master, &config)?;
        }
        Command::Stats { top } => {
            let master = store::load(&master_path)?;
            print!("{}", stats::render(&stats::summarize(&master, top))?);
        }
    }

    Ok(())
}
