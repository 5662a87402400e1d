//! Deterministic day/week/month buckets and the export paths derived from them.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::model::TabGroup;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupBy {
    Day,
    Week,
    #[default]
    Month,
}

impl GroupBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
        }
    }
}

impl std::fmt::Display for GroupBy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for GroupBy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "day" => Ok(Self::Day),
            "week" => Ok(Self::Week),
            "month" => Ok(Self::Month),
            other => Err(format!("unknown grouping {other:?} (expected day, week or month)")),
        }
    }
}

/// `YYYY-Www` where `ww = ceil((day_of_year0 + jan1_weekday + 1) / 7)` and
/// weekdays count from Sunday = 0.
///
/// Not ISO-8601 week numbering: Jan 1 is always in week 01 of its own year,
/// and the last days of December can land in week 53. Kept this way so
/// bucket boundaries match archives that were already exported.
pub fn week_key(ts: DateTime<Utc>) -> String {
    let year = ts.year();
    let jan1_weekday = NaiveDate::from_ymd_opt(year, 1, 1)
        .map(|d| d.weekday().num_days_from_sunday())
        .unwrap_or(0);
    let week = (ts.ordinal0() + jan1_weekday + 1).div_ceil(7);
    format!("{year}-W{week:02}")
}

pub fn period_key(group: &TabGroup, by: GroupBy) -> String {
    match by {
        GroupBy::Month => prefix(&group.created_at, 7),
        GroupBy::Day => prefix(&group.created_at, 10),
        GroupBy::Week => week_key(
            DateTime::from_timestamp_millis(group.created_at_epoch).unwrap_or_default(),
        ),
    }
}

fn prefix(s: &str, n: usize) -> String {
    s.get(..n).unwrap_or(s).to_string()
}

/// Partition groups by period. Only non-empty buckets exist; keys iterate in
/// ascending order and members keep their input order.
pub fn bucket(groups: &[TabGroup], by: GroupBy) -> BTreeMap<String, Vec<&TabGroup>> {
    let mut buckets: BTreeMap<String, Vec<&TabGroup>> = BTreeMap::new();
    for group in groups {
        buckets.entry(period_key(group, by)).or_default().push(group);
    }
    buckets
}

/// Relative output path: `<year>/<key>.<ext>` for months and weeks,
/// `<year>/<year-month>/<key>.<ext>` for days.
pub fn period_path(key: &str, by: GroupBy, ext: &str) -> PathBuf {
    let year = key.get(..4).unwrap_or(key);
    let file = format!("{key}.{ext}");
    match by {
        GroupBy::Month | GroupBy::Week => PathBuf::from(year).join(file),
        GroupBy::Day => PathBuf::from(year)
            .join(key.get(..7).unwrap_or(key))
            .join(file),
    }
}

/// Human label for a key, used in document titles.
pub fn period_label(key: &str, by: GroupBy) -> String {
    match by {
        GroupBy::Month => NaiveDate::parse_from_str(&format!("{key}-01"), "%Y-%m-%d")
            .map(|d| d.format("%B %Y").to_string())
            .unwrap_or_else(|_| key.to_string()),
        GroupBy::Week => match key.split_once("-W") {
            Some((year, week)) => format!("Week {week}, {year}"),
            None => key.to_string(),
        },
        GroupBy::Day => NaiveDate::parse_from_str(key, "%Y-%m-%d")
            .map(|d| d.format("%A, %B %-d, %Y").to_string())
            .unwrap_or_else(|_| key.to_string()),
    }
}
