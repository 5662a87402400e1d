//! Convert validated OneTab records into the normalized master record.

use regex::Regex;
use std::sync::LazyLock;
use url::Url;

use crate::importer::{OneTabGroupRecord, OneTabTabRecord};
use crate::model::{MasterData, Source, Tab, TabGroup};
use crate::utils;

/// Host part of anything that looks like `scheme://host...` or a bare `host/...`.
static HOST_FALLBACK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[A-Za-z][A-Za-z0-9+.\-]*://)?(?:[^@/?#\s]*@)?([^/:?#\s]+)")
        .expect("host fallback pattern is valid")
});

/// Lower-cased hostname of `url`.
///
/// Strict parsing first; a URL that fails it goes through a lenient regex so
/// saved pages with malformed URLs still get a usable domain. URLs that parse
/// but carry no host (`about:blank`, `mailto:...`) yield an empty string.
pub fn derive_domain(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) => parsed
            .host_str()
            .map(|h| h.trim_matches(['[', ']']).to_lowercase())
            .unwrap_or_default(),
        Err(_) => HOST_FALLBACK
            .captures(url.trim())
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_lowercase())
            .unwrap_or_default(),
    }
}

pub fn normalize_tab(raw: &OneTabTabRecord) -> Tab {
    let domain = derive_domain(&raw.url);
    let title = if !raw.title.trim().is_empty() {
        raw.title.clone()
    } else if !domain.is_empty() {
        domain.clone()
    } else {
        raw.url.clone()
    };
    Tab {
        id: raw.id.clone(),
        url: raw.url.clone(),
        title,
        domain,
    }
}

pub fn normalize_group(raw: &OneTabGroupRecord) -> TabGroup {
    let tabs = raw.tabs_meta.iter().map(normalize_tab).collect();
    let title = raw
        .title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_owned);
    TabGroup::new(
        raw.id.clone(),
        raw.create_date,
        tabs,
        raw.starred.unwrap_or(false),
        title,
    )
}

/// Build a fresh master record stamped with the current time.
pub fn normalize(raw_groups: &[OneTabGroupRecord], source: Source) -> MasterData {
    normalize_at(raw_groups, source, utils::now_iso())
}

/// Same as [`normalize`] with an explicit `exported_at`, which is also the
/// date range of an empty batch.
pub fn normalize_at(
    raw_groups: &[OneTabGroupRecord],
    source: Source,
    exported_at: String,
) -> MasterData {
    let groups = raw_groups.iter().map(normalize_group).collect();
    MasterData::from_groups(source, groups, exported_at)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Browser, ExtractionMethod};

    fn source() -> Source {
        Source {
            browser: Browser::Chrome,
            extension_id: "chphlpgkkbolifaimnlloiipkdnihall".into(),
            extraction_method: ExtractionMethod::Json,
        }
    }

    fn raw_tab(id: &str, url: &str, title: &str) -> OneTabTabRecord {
        OneTabTabRecord {
            id: id.into(),
            url: url.into(),
            title: title.into(),
        }
    }

    fn raw_group(id: &str, create_date: i64, tabs: Vec<OneTabTabRecord>) -> OneTabGroupRecord {
        OneTabGroupRecord {
            id: id.into(),
            create_date,
            tabs_meta: tabs,
            starred: None,
            title: None,
        }
    }

    #[test]
    fn test_derive_domain_strict() {
        assert_eq!(derive_domain("https://GitHub.com/rust-lang"), "github.com");
        assert_eq!(derive_domain("http://user:pw@Example.org:8080/x?q=1"), "example.org");
        assert_eq!(derive_domain("http://[::1]:3000/"), "::1");
    }

    #[test]
    fn test_derive_domain_fallback() {
        // Not absolute, so strict parsing fails.
        assert_eq!(derive_domain("www.Example.com/path"), "www.example.com");
        assert_eq!(derive_domain("https://exa mple.com/"), "exa");
        assert_eq!(derive_domain(""), "");
    }

    #[test]
    fn test_derive_domain_hostless() {
        assert_eq!(derive_domain("about:blank"), "");
        assert_eq!(derive_domain("mailto:me@example.com"), "");
    }

    #[test]
    fn test_empty_title_falls_back_to_domain() {
        let tab = normalize_tab(&raw_tab("t", "https://docs.rs/regex", "  "));
        assert_eq!(tab.title, "docs.rs");
        let tab = normalize_tab(&raw_tab("t", "about:blank", ""));
        assert_eq!(tab.title, "about:blank");
    }

    #[test]
    fn test_normalize_derives_fields_and_sorts() {
        let raw = vec![
            raw_group("old", 1_600_000_000_000, vec![raw_tab("a", "https://a.com", "A")]),
            raw_group(
                "new",
                1_700_000_000_000,
                vec![
                    raw_tab("b", "https://b.com", "B"),
                    raw_tab("c", "https://c.com", "C"),
                ],
            ),
        ];
        let md = normalize_at(&raw, source(), "2030-01-01T00:00:00.000Z".into());

        assert_eq!(md.schema_version, "1.0.0");
        assert_eq!(md.groups[0].id, "new");
        assert_eq!(md.groups[1].id, "old");
        for g in &md.groups {
            assert_eq!(g.tab_count, g.tabs.len());
            assert_eq!(g.created_at, utils::iso_from_epoch_ms(g.created_at_epoch));
            assert!(!g.starred);
        }
        assert_eq!(md.stats.total_groups, 2);
        assert_eq!(md.stats.total_tabs, 3);
        assert_eq!(md.stats.date_range.earliest, "2020-09-13T12:26:40.000Z");
        assert_eq!(md.stats.date_range.latest, "2023-11-14T22:13:20.000Z");
    }

    #[test]
    fn test_tab_order_is_preserved() {
        let raw = vec![raw_group(
            "g",
            1,
            vec![
                raw_tab("z", "https://z.com", "Z"),
                raw_tab("a", "https://a.com", "A"),
            ],
        )];
        let md = normalize_at(&raw, source(), "2030-01-01T00:00:00.000Z".into());
        let ids: Vec<_> = md.groups[0].tabs.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, ["z", "a"]);
    }

    #[test]
    fn test_empty_batch_uses_now_for_range() {
        let md = normalize_at(&[], source(), "2030-01-01T00:00:00.000Z".into());
        assert_eq!(md.stats.total_groups, 0);
        assert_eq!(md.stats.date_range.earliest, "2030-01-01T00:00:00.000Z");
        assert_eq!(md.stats.date_range.latest, "2030-01-01T00:00:00.000Z");
    }

    #[test]
    fn test_blank_group_title_dropped() {
        let mut g = raw_group("g", 1, vec![]);
        g.title = Some("   ".into());
        assert_eq!(normalize_group(&g).title, None);
        g.starred = Some(true);
        assert!(normalize_group(&g).starred);
    }
}
