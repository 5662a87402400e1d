//! Archive overview for the `stats` command.

use std::collections::HashMap;
use std::fmt::Write as _;

use crate::error::Result;
use crate::model::{MasterData, Stats, compute_stats};
use crate::period::{self, GroupBy};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveSummary {
    pub stats: Stats,
    pub starred_groups: usize,
    /// `(domain, tab count)`, most tabs first.
    pub top_domains: Vec<(String, usize)>,
    /// `(YYYY-MM, group count)`, most groups first.
    pub busiest_months: Vec<(String, usize)>,
}

/// Stats are recomputed from the groups rather than trusted from the file.
pub fn summarize(master: &MasterData, top: usize) -> ArchiveSummary {
    let mut domains: HashMap<&str, usize> = HashMap::new();
    for tab in master.groups.iter().flat_map(|g| &g.tabs) {
        if !tab.domain.is_empty() {
            *domains.entry(tab.domain.as_str()).or_default() += 1;
        }
    }

    let months = period::bucket(&master.groups, GroupBy::Month)
        .into_iter()
        .map(|(key, members)| (key, members.len()))
        .collect();

    ArchiveSummary {
        stats: compute_stats(&master.groups, &master.exported_at),
        starred_groups: master.groups.iter().filter(|g| g.starred).count(),
        top_domains: ranked(domains.into_iter().map(|(d, n)| (d.to_string(), n)).collect(), top),
        busiest_months: ranked(months, top),
    }
}

/// Highest count first, ties by name, truncated to `top`.
fn ranked(mut counts: Vec<(String, usize)>, top: usize) -> Vec<(String, usize)> {
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    counts.truncate(top);
    counts
}

pub fn render(summary: &ArchiveSummary) -> Result<String> {
    let s = &summary.stats;
    let mut out = String::new();
    writeln!(out, "Groups:   {} ({} starred)", s.total_groups, summary.starred_groups)?;
    writeln!(out, "Tabs:     {}", s.total_tabs)?;
    if s.total_groups > 0 {
        writeln!(
            out,
            "Range:    {} .. {}",
            s.date_range.earliest.get(..10).unwrap_or(&s.date_range.earliest),
            s.date_range.latest.get(..10).unwrap_or(&s.date_range.latest)
        )?;
    }

    if !summary.top_domains.is_empty() {
        writeln!(out)?;
        writeln!(out, "Top domains:")?;
        for (domain, count) in &summary.top_domains {
            writeln!(out, "  {count:>6}  {domain}")?;
        }
    }
    if !summary.busiest_months.is_empty() {
        writeln!(out)?;
        writeln!(out, "Busiest months:")?;
        for (month, count) in &summary.busiest_months {
            writeln!(out, "  {count:>6}  {month}")?;
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Browser, ExtractionMethod, Source, Tab, TabGroup};

    fn tab(url: &str) -> Tab {
        Tab {
            id: url.into(),
            url: url.into(),
            title: url.into(),
            domain: crate::normalize::derive_domain(url),
        }
    }

    fn master() -> MasterData {
        let groups = vec![
            TabGroup::new(
                "a".into(),
                1_749_988_800_000,
                vec![tab("https://a.com/1"), tab("https://a.com/2"), tab("about:blank")],
                true,
                None,
            ),
            TabGroup::new("b".into(), 1_748_764_800_000, vec![tab("https://b.com")], false, None),
            TabGroup::new("c".into(), 1_747_699_200_000, vec![tab("https://b.com/x")], false, None),
        ];
        let mut m = MasterData::from_groups(
            Source {
                browser: Browser::Chrome,
                extension_id: "ext".into(),
                extraction_method: ExtractionMethod::Json,
            },
            groups,
            "2025-07-01T00:00:00.000Z".into(),
        );
        // A hand-edited file with stale stats must not leak into the summary.
        m.stats.total_tabs = 999;
        m
    }

    #[test]
    fn test_summary_counts() {
        let summary = summarize(&master(), 10);
        assert_eq!(summary.stats.total_tabs, 5);
        assert_eq!(summary.starred_groups, 1);
        assert_eq!(
            summary.top_domains,
            vec![("a.com".to_string(), 2), ("b.com".to_string(), 2)]
        );
        assert_eq!(
            summary.busiest_months,
            vec![("2025-06".to_string(), 2), ("2025-05".to_string(), 1)]
        );
    }

    #[test]
    fn test_top_truncates() {
        let summary = summarize(&master(), 1);
        assert_eq!(summary.top_domains.len(), 1);
        assert_eq!(summary.busiest_months.len(), 1);
    }

    #[test]
    fn test_render_lists_sections() {
        let text = render(&summarize(&master(), 3)).unwrap();
        assert!(text.contains("Groups:   3 (1 starred)"));
        assert!(text.contains("Range:    2025-05-20 .. 2025-06-15"));
        assert!(text.contains("Top domains:"));
        assert!(text.contains("Busiest months:"));
    }
}
