//! # onetab-archive
//!
//! A CLI tool that archives [OneTab](https://www.one-tab.com) tab groups into a
//! single JSON record, then searches and exports that record as Markdown.
//!
//! ## What it does
//!
//! OneTab keeps its saved groups inside the browser's extension storage, a
//! LevelDB directory the browser holds locked while it runs. This tool copies
//! that directory into a private temp dir, finds the OneTab state in the copy,
//! and normalizes it into a [`model::MasterData`] record: every group with its
//! creation time as an ISO string and as epoch milliseconds, and every tab with
//! a derived domain. The state can also be fed in as a JSON export.
//!
//! The browser's files are never opened for writing.
//!
//! ## Incremental archive
//!
//! Each run merges the new batch over the record on disk. Groups are keyed by
//! id and the copy already on disk always wins, so running the same extraction
//! twice changes nothing but `exportedAt`. Aggregate stats are recomputed from
//! the groups on every save.
//!
//! Markdown export works the same way: each period file carries a hash of its
//! body in the header block, and files whose content has not changed are
//! skipped.
//!
//! ## Usage
//!
//! ```sh
//! # Pull the current state out of Chrome (close the browser first)
//! onetab-archive extract
//!
//! # Or ingest a JSON export
//! onetab-archive ingest onetab-export.json
//!
//! # Find tabs
//! onetab-archive search --domain github.com --from 2025-06
//!
//! # Write one Markdown file per week
//! onetab-archive export ~/notes/onetab --group-by week
//! ```
//!
//! Preferences can be persisted in `~/.config/onetab-archive/config.toml`.

pub mod config;
pub mod error;
pub mod exporter;
pub mod importer;
pub mod ingest;
pub mod leveldb;
pub mod merge;
pub mod model;
pub mod normalize;
pub mod period;
pub mod renderer;
pub mod search;
pub mod stats;
pub mod store;
pub mod utils;

pub use error::{Error, Result};
