//! Normalized record shapes persisted in the master record.
//!
//! Field names serialize in camelCase so the persisted JSON stays stable for
//! anything that reads it outside this crate.

use serde::{Deserialize, Serialize};

pub const SCHEMA_VERSION: &str = "1.0.0";

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// A single saved page reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tab {
    pub id: String,
    pub url: String,
    /// Falls back to `domain` when the source title is empty.
    pub title: String,
    /// Lower-cased host of `url`; empty when no host could be recovered.
    pub domain: String,
}

/// Tabs saved together in one user action.
///
/// `created_at` and `tab_count` are derived at construction and never
/// recomputed lazily; build through [`TabGroup::new`] to keep them in sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabGroup {
    pub id: String,
    pub tabs: Vec<Tab>,
    pub created_at: String,
    pub created_at_epoch: i64,
    pub tab_count: usize,
    #[serde(default)]
    pub starred: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl TabGroup {
    pub fn new(
        id: String,
        created_at_epoch: i64,
        tabs: Vec<Tab>,
        starred: bool,
        title: Option<String>,
    ) -> Self {
        Self {
            id,
            created_at: crate::utils::iso_from_epoch_ms(created_at_epoch),
            created_at_epoch,
            tab_count: tabs.len(),
            tabs,
            starred,
            title,
        }
    }

    /// Recompute `created_at` and `tab_count` from the fields they derive from.
    /// Records read from disk go through this, since their copies may be stale.
    pub fn rederive(&mut self) {
        self.created_at = crate::utils::iso_from_epoch_ms(self.created_at_epoch);
        self.tab_count = self.tabs.len();
    }

    /// Calendar date (`YYYY-MM-DD`) of the group in UTC.
    pub fn date(&self) -> &str {
        self.created_at.get(..10).unwrap_or(&self.created_at)
    }
}

// ---------------------------------------------------------------------------
// Provenance
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Browser {
    #[default]
    Chrome,
    Edge,
    Brave,
    Chromium,
    Unknown,
}

impl Browser {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Chrome => "chrome",
            Self::Edge => "edge",
            Self::Brave => "brave",
            Self::Chromium => "chromium",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for Browser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Browser {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "chrome" => Ok(Self::Chrome),
            "edge" => Ok(Self::Edge),
            "brave" => Ok(Self::Brave),
            "chromium" => Ok(Self::Chromium),
            "unknown" => Ok(Self::Unknown),
            other => Err(format!(
                "unknown browser {other:?} (expected chrome, edge, brave, chromium or unknown)"
            )),
        }
    }
}

/// How a batch reached the archive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionMethod {
    /// Read from the browser's extension key-value store.
    Leveldb,
    /// Supplied as a raw JSON payload.
    Json,
    /// Merged from another persisted master record.
    Import,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    pub browser: Browser,
    pub extension_id: String,
    pub extraction_method: ExtractionMethod,
}

// ---------------------------------------------------------------------------
// Aggregate root
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub earliest: String,
    pub latest: String,
}

/// Always derived from `MasterData::groups`; never trusted on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total_groups: usize,
    pub total_tabs: usize,
    pub date_range: DateRange,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MasterData {
    pub schema_version: String,
    pub exported_at: String,
    pub source: Source,
    pub stats: Stats,
    /// Keyed by `id`, ordered newest-first by `created_at_epoch`.
    pub groups: Vec<TabGroup>,
}

impl MasterData {
    /// Assemble a record from groups, sorting them and deriving `stats`.
    /// `exported_at` doubles as the fallback date range for an empty set.
    pub fn from_groups(source: Source, groups: Vec<TabGroup>, exported_at: String) -> Self {
        let mut master = Self {
            schema_version: SCHEMA_VERSION.to_string(),
            stats: compute_stats(&[], &exported_at),
            exported_at,
            source,
            groups,
        };
        master.rederive();
        master
    }

    pub fn empty(source: Source, exported_at: String) -> Self {
        Self::from_groups(source, Vec::new(), exported_at)
    }

    /// Re-sort and recompute `stats` from scratch, stamping a new `exported_at`.
    pub fn refresh(&mut self, exported_at: String) {
        self.exported_at = exported_at;
        self.rederive();
    }

    /// Re-derive every group's `created_at` and `tab_count`, re-sort, and
    /// recompute `stats`. `exported_at` is left alone.
    pub fn rederive(&mut self) {
        for group in &mut self.groups {
            group.rederive();
        }
        sort_newest_first(&mut self.groups);
        self.stats = compute_stats(&self.groups, &self.exported_at);
    }
}

/// Newest first; ties fall back to id so the order never depends on input order.
pub fn sort_newest_first(groups: &mut [TabGroup]) {
    groups.sort_by(|a, b| {
        b.created_at_epoch
            .cmp(&a.created_at_epoch)
            .then_with(|| a.id.cmp(&b.id))
    });
}

/// Single pass over `groups`. ISO strings in one fixed format compare
/// lexicographically in chronological order.
pub fn compute_stats(groups: &[TabGroup], now: &str) -> Stats {
    let mut earliest: Option<&str> = None;
    let mut latest: Option<&str> = None;
    let mut total_tabs = 0usize;

    for group in groups {
        total_tabs += group.tab_count;
        let ts = group.created_at.as_str();
        if earliest.is_none_or(|e| ts < e) {
            earliest = Some(ts);
        }
        if latest.is_none_or(|l| ts > l) {
            latest = Some(ts);
        }
    }

    Stats {
        total_groups: groups.len(),
        total_tabs,
        date_range: DateRange {
            earliest: earliest.unwrap_or(now).to_string(),
            latest: latest.unwrap_or(now).to_string(),
        },
    }
}

// ---------------------------------------------------------------------------
// Search results (ephemeral)
// ---------------------------------------------------------------------------

/// Back-reference from a result to the group that owns the tab.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupRef {
    pub id: String,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl From<&TabGroup> for GroupRef {
    fn from(group: &TabGroup) -> Self {
        Self {
            id: group.id.clone(),
            created_at: group.created_at.clone(),
            title: group.title.clone(),
        }
    }
}

/// Which fields produced a hit. Substring and pattern predicates feed the same flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchFields {
    pub in_title: bool,
    pub in_url: bool,
    pub in_domain: bool,
}

impl MatchFields {
    pub fn any(&self) -> bool {
        self.in_title || self.in_url || self.in_domain
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub tab: Tab,
    pub group: GroupRef,
    pub matches: MatchFields,
}
