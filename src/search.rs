//! Query engine over every tab in the master record.
//!
//! Date bounds filter whole groups first. A tab in a surviving group is a hit
//! when any text, pattern or domain predicate matches it; the per-field flags
//! record which fields matched, whichever predicate produced the hit.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta, Utc};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use tracing::warn;

use crate::error::{Error, Result};
use crate::model::{GroupRef, MasterData, MatchFields, SearchResult, Tab, TabGroup};
use crate::renderer;

/// Predicate bundle. Every field is optional and they combine freely.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    /// Case-insensitive substring over title, url and domain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title_pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    /// Flexible date, expanded to the start of its period.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    /// Flexible date, expanded to the end of its period.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
}

impl SearchQuery {
    /// True when at least one predicate can select a tab on its own.
    pub fn has_text_predicate(&self) -> bool {
        [&self.query, &self.title_pattern, &self.url_pattern, &self.domain]
            .iter()
            .any(|p| non_empty(p).is_some())
    }

    /// One-line summary, e.g. `query="rust" domain="github.com" from=2025-06`.
    pub fn describe(&self) -> String {
        let mut parts = Vec::new();
        for (name, value) in [
            ("query", &self.query),
            ("title", &self.title_pattern),
            ("url", &self.url_pattern),
            ("domain", &self.domain),
        ] {
            if let Some(v) = non_empty(value) {
                parts.push(format!("{name}={v:?}"));
            }
        }
        for (name, value) in [("from", &self.from), ("to", &self.to)] {
            if let Some(v) = non_empty(value) {
                parts.push(format!("{name}={v}"));
            }
        }
        parts.join(" ")
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

// ---------------------------------------------------------------------------
// Flexible dates
// ---------------------------------------------------------------------------

/// Which end of a period a flexible date stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    Start,
    End,
}

/// Expand `YYYY`, `YYYY-MM`, `YYYY-MM-DD` to the first or last millisecond
/// of that period. Full timestamps are taken as-is (UTC when no offset).
pub fn parse_flexible_date(input: &str, bound: Bound) -> Result<DateTime<Utc>> {
    let s = input.trim();
    let invalid = || Error::InvalidDate(input.to_string());

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(naive.and_utc());
        }
    }

    let parts: Vec<&str> = s.split('-').collect();
    let well_formed = parts.len() <= 3
        && parts[0].len() == 4
        && parts
            .iter()
            .all(|p| (1..=4).contains(&p.len()) && p.bytes().all(|b| b.is_ascii_digit()));
    if !well_formed {
        return Err(invalid());
    }

    let year: i32 = parts[0].parse().map_err(|_| invalid())?;
    let month: Option<u32> = parts.get(1).map(|m| m.parse()).transpose().map_err(|_| invalid())?;
    let day: Option<u32> = parts.get(2).map(|d| d.parse()).transpose().map_err(|_| invalid())?;

    let (start, next) = match (month, day) {
        (None, _) => (
            NaiveDate::from_ymd_opt(year, 1, 1),
            NaiveDate::from_ymd_opt(year + 1, 1, 1),
        ),
        (Some(m), None) => {
            let next = if m == 12 {
                NaiveDate::from_ymd_opt(year + 1, 1, 1)
            } else {
                NaiveDate::from_ymd_opt(year, m + 1, 1)
            };
            (NaiveDate::from_ymd_opt(year, m, 1), next)
        }
        (Some(m), Some(d)) => {
            let start = NaiveDate::from_ymd_opt(year, m, d);
            (start, start.and_then(|s| s.succ_opt()))
        }
    };
    let (start, next) = start.zip(next).ok_or_else(invalid)?;

    let instant = match bound {
        Bound::Start => start.and_time(chrono::NaiveTime::MIN).and_utc(),
        Bound::End => next.and_time(chrono::NaiveTime::MIN).and_utc() - TimeDelta::milliseconds(1),
    };
    Ok(instant)
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

/// A query with dates resolved and patterns compiled.
///
/// An invalid pattern becomes a warning and never matches; the remaining
/// predicates still apply.
#[derive(Debug)]
pub struct CompiledQuery {
    needle: Option<String>,
    title_re: Option<Regex>,
    url_re: Option<Regex>,
    domain: Option<String>,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
    pub warnings: Vec<String>,
}

impl CompiledQuery {
    pub fn compile(query: &SearchQuery) -> Result<Self> {
        let mut warnings = Vec::new();
        let title_re = compile_pattern("title", non_empty(&query.title_pattern), &mut warnings);
        let url_re = compile_pattern("url", non_empty(&query.url_pattern), &mut warnings);

        Ok(Self {
            needle: non_empty(&query.query).map(str::to_lowercase),
            title_re,
            url_re,
            domain: non_empty(&query.domain).map(str::to_lowercase),
            from: non_empty(&query.from)
                .map(|s| parse_flexible_date(s, Bound::Start))
                .transpose()?,
            to: non_empty(&query.to)
                .map(|s| parse_flexible_date(s, Bound::End))
                .transpose()?,
            warnings,
        })
    }

    pub fn group_in_range(&self, group: &TabGroup) -> bool {
        let Some(created) = DateTime::from_timestamp_millis(group.created_at_epoch) else {
            return false;
        };
        self.from.is_none_or(|from| created >= from) && self.to.is_none_or(|to| created <= to)
    }

    pub fn match_tab(&self, tab: &Tab) -> MatchFields {
        let mut m = MatchFields::default();
        if let Some(needle) = &self.needle {
            m.in_title |= tab.title.to_lowercase().contains(needle);
            m.in_url |= tab.url.to_lowercase().contains(needle);
            m.in_domain |= tab.domain.to_lowercase().contains(needle);
        }
        if let Some(re) = &self.title_re {
            m.in_title |= re.is_match(&tab.title);
        }
        if let Some(re) = &self.url_re {
            m.in_url |= re.is_match(&tab.url);
        }
        if let Some(domain) = &self.domain {
            m.in_domain |= tab.domain.to_lowercase().contains(domain);
        }
        m
    }
}

fn compile_pattern(name: &str, pattern: Option<&str>, warnings: &mut Vec<String>) -> Option<Regex> {
    let pattern = pattern?;
    match RegexBuilder::new(pattern).case_insensitive(true).build() {
        Ok(re) => Some(re),
        Err(e) => {
            warn!(predicate = name, pattern, error = %e, "invalid pattern ignored");
            warnings.push(format!("Invalid {name} pattern {pattern:?} ignored: {e}"));
            None
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SearchOutcome {
    pub results: Vec<SearchResult>,
    pub warnings: Vec<String>,
}

/// Evaluate `query` against every tab. Does not treat an empty query as
/// "match everything"; with no text predicate nothing matches.
pub fn search(master: &MasterData, query: &SearchQuery) -> Result<SearchOutcome> {
    let compiled = CompiledQuery::compile(query)?;
    let mut results = Vec::new();

    for group in master.groups.iter().filter(|g| compiled.group_in_range(g)) {
        for tab in &group.tabs {
            let matches = compiled.match_tab(tab);
            if matches.any() {
                results.push(SearchResult {
                    tab: tab.clone(),
                    group: GroupRef::from(group),
                    matches,
                });
            }
        }
    }

    Ok(SearchOutcome {
        results,
        warnings: compiled.warnings,
    })
}

// ---------------------------------------------------------------------------
// Presentation
// ---------------------------------------------------------------------------

/// Results bucketed by the owning group's calendar date, newest date first.
/// Order inside a date follows the input.
pub fn group_by_date(results: &[SearchResult]) -> Vec<(String, Vec<&SearchResult>)> {
    let mut days: std::collections::BTreeMap<String, Vec<&SearchResult>> = Default::default();
    for r in results {
        let day = r.group.created_at.get(..10).unwrap_or(&r.group.created_at);
        days.entry(day.to_string()).or_default().push(r);
    }
    days.into_iter().rev().collect()
}

/// JSON envelope written by `search --output file.json`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchEnvelope {
    pub query: SearchQuery,
    pub total_results: usize,
    pub results: Vec<SearchResult>,
}

impl SearchEnvelope {
    pub fn new(query: &SearchQuery, results: &[SearchResult]) -> Self {
        Self {
            query: query.clone(),
            total_results: results.len(),
            results: results.to_vec(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchHeader<'a> {
    query: String,
    total_results: usize,
    generated: &'a str,
}

/// Markdown document of results grouped by date, with a header block.
pub fn render_markdown(
    query: &SearchQuery,
    results: &[SearchResult],
    generated: &str,
) -> Result<String> {
    let header = SearchHeader {
        query: query.describe(),
        total_results: results.len(),
        generated,
    };
    let mut out = renderer::header_block(&header)?;

    writeln!(out, "# Search results")?;
    writeln!(out)?;
    writeln!(
        out,
        "{} matching {} for `{}`",
        results.len(),
        if results.len() == 1 { "tab" } else { "tabs" },
        query.describe()
    )?;

    for (day, hits) in group_by_date(results) {
        writeln!(out)?;
        writeln!(out, "## {day}")?;
        writeln!(out)?;
        for hit in hits {
            writeln!(out, "{}", result_line(hit))?;
        }
    }
    Ok(out)
}

/// Plain listing for the terminal, capped at `limit` results.
pub fn render_console(results: &[SearchResult], limit: usize) -> Result<String> {
    let mut out = String::new();
    let mut shown = 0usize;
    'days: for (day, hits) in group_by_date(results) {
        if shown == limit {
            break;
        }
        writeln!(out, "{day}")?;
        for hit in hits {
            if shown == limit {
                break 'days;
            }
            let fields = matched_fields(&hit.matches);
            writeln!(out, "  {}  [{}]", hit.tab.title, fields)?;
            writeln!(out, "    {}", hit.tab.url)?;
            shown += 1;
        }
    }
    if results.len() > shown {
        writeln!(out, "... {} more (use --limit or --output)", results.len() - shown)?;
    }
    Ok(out)
}

fn result_line(hit: &SearchResult) -> String {
    let mut line = renderer::tab_link(&hit.tab);
    if let Some(title) = &hit.group.title {
        line.push_str(&format!(" ({title})"));
    }
    line
}

fn matched_fields(m: &MatchFields) -> String {
    let mut fields = Vec::new();
    if m.in_title {
        fields.push("title");
    }
    if m.in_url {
        fields.push("url");
    }
    if m.in_domain {
        fields.push("domain");
    }
    fields.join(",")
}
