//! Error types for the archive core.
//!
//! Ingestion failures are fatal to the whole batch, resource failures carry a
//! remediation hint, and query pattern failures never reach this type (they are
//! downgraded to warnings inside the search engine).

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// No accepted top-level shape was found in the payload.
    #[error(
        "Unrecognized OneTab export shape. Expected either {{ \"state\": {{ \"tabGroups\": [...] }} }} \
         or {{ \"tabGroups\": [...] }}"
    )]
    UnrecognizedShape,

    /// A field supplied as a JSON-encoded string did not parse.
    #[error("Field `{field}` is a string but does not contain valid JSON: {source}")]
    UnparsableField {
        field: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid tab group at index {index}: {reason}")]
    InvalidGroup { index: usize, reason: String },

    #[error("Invalid tab {tab_index} in tab group at index {group_index}: {reason}")]
    InvalidTab {
        group_index: usize,
        tab_index: usize,
        reason: String,
    },

    /// Missing path, locked store, permission denied.
    #[error("{message}: {}\n{hint}", path.display())]
    Resource {
        path: PathBuf,
        message: String,
        hint: String,
    },

    /// The key-value store was readable but held no OneTab state.
    #[error(
        "No OneTab state found among {scanned} keys in the extension store.\n\
         Check --browser/--extension-id, and that OneTab has saved at least one group."
    )]
    StateNotFound { scanned: usize },

    #[error(
        "Invalid date {0:?}: expected YYYY, YYYY-MM, YYYY-MM-DD or an ISO-8601 timestamp"
    )]
    InvalidDate(String),

    #[error("Search needs at least one of: query, title pattern, url pattern, domain")]
    EmptyQuery,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Formatting error: {0}")]
    Format(#[from] std::fmt::Error),

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn resource(
        path: impl Into<PathBuf>,
        message: impl Into<String>,
        hint: impl Into<String>,
    ) -> Self {
        Self::Resource {
            path: path.into(),
            message: message.into(),
            hint: hint.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
