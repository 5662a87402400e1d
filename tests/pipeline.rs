use onetab_archive::exporter::{self, ExportConfig};
use onetab_archive::importer;
use onetab_archive::merge::merge;
use onetab_archive::model::{Browser, ExtractionMethod, MasterData, Source};
use onetab_archive::normalize::normalize_at;
use onetab_archive::period::{GroupBy, period_key};
use onetab_archive::search::{SearchQuery, search};
use onetab_archive::{store, utils};
use serde_json::{Value, json};
use std::collections::BTreeSet;

const STAMP: &str = "2025-07-01T00:00:00.000Z";

fn source() -> Source {
    Source {
        browser: Browser::Chrome,
        extension_id: "chphlpgkkbolifaimnlloiipkdnihall".into(),
        extraction_method: ExtractionMethod::Json,
    }
}

fn ingest(raw: &Value) -> MasterData {
    let records = importer::validate(raw).unwrap();
    normalize_at(&records, source(), STAMP.into())
}

fn group(id: &str, create_date: i64, tabs: Value) -> Value {
    json!({ "id": id, "createDate": create_date, "tabsMeta": tabs })
}

fn ids(master: &MasterData) -> BTreeSet<String> {
    master.groups.iter().map(|g| g.id.clone()).collect()
}

#[test]
fn test_single_group_ingest() {
    let master = ingest(&json!({
        "tabGroups": [group("a", 1_700_000_000_000, json!([
            { "id": "t1", "url": "https://github.com/x", "title": "X" }
        ]))]
    }));

    assert_eq!(master.stats.total_groups, 1);
    assert_eq!(master.stats.total_tabs, 1);
    assert_eq!(master.groups[0].tabs[0].domain, "github.com");
    assert_eq!(master.groups[0].created_at, utils::iso_from_epoch_ms(1_700_000_000_000));
    assert_eq!(master.groups[0].tab_count, master.groups[0].tabs.len());
}

#[test]
fn test_existing_group_wins_across_batches() {
    let first = ingest(&json!({
        "tabGroups": [group("a", 1_700_000_000_000, json!([
            { "id": "t1", "url": "https://one.example", "title": "first" }
        ]))]
    }));
    let second = ingest(&json!({
        "tabGroups": [
            group("a", 1_700_000_500_000, json!([
                { "id": "t9", "url": "https://other.example", "title": "changed" }
            ])),
            group("b", 1_700_100_000_000, json!([]))
        ]
    }));

    let merged = merge(&first, &second);
    assert_eq!(merged.stats.total_groups, 2);
    assert_eq!(ids(&merged), BTreeSet::from(["a".to_string(), "b".to_string()]));
    let a = merged.groups.iter().find(|g| g.id == "a").unwrap();
    assert_eq!(a.tabs[0].title, "first");

    let again = merge(&merged, &second);
    assert_eq!(again.groups, merged.groups);
}

#[test]
fn test_merge_membership_is_order_independent() {
    let m = ingest(&json!({ "tabGroups": [
        group("a", 1_700_000_000_000, json!([])),
        group("b", 1_700_000_100_000, json!([]))
    ]}));
    let n = ingest(&json!({ "tabGroups": [
        group("b", 1_700_000_100_000, json!([])),
        group("c", 1_700_000_200_000, json!([]))
    ]}));
    let empty = MasterData::empty(source(), STAMP.into());

    let mn = merge(&merge(&empty, &m), &n);
    let nm = merge(&merge(&empty, &n), &m);
    assert_eq!(ids(&mn), ids(&nm));
    let order: Vec<&str> = mn.groups.iter().map(|g| g.id.as_str()).collect();
    assert_eq!(order, ["c", "b", "a"]);
}

#[test]
fn test_double_encoded_state_matches_plain() {
    let groups = json!([group("a", 1_700_000_000_000, json!([
        { "id": "t1", "url": "https://docs.rs/serde", "title": "serde" }
    ]))]);
    let plain = ingest(&json!({ "state": { "tabGroups": groups } }));

    let inner = json!({ "tabGroups": groups.to_string() }).to_string();
    let encoded = ingest(&json!({ "state": inner }));

    assert_eq!(encoded, plain);
}

#[test]
fn test_domain_query_over_three_groups() {
    let master = ingest(&json!({ "tabGroups": [
        group("a", 1_749_988_800_000, json!([
            { "id": "1", "url": "https://github.com/rust-lang", "title": "Rust on the web" }
        ])),
        group("b", 1_748_764_800_000, json!([
            { "id": "2", "url": "https://example.org", "title": "Example" }
        ])),
        group("c", 1_747_699_200_000, json!([
            { "id": "3", "url": "https://docs.rs", "title": "Docs" }
        ]))
    ]}));

    let query = SearchQuery {
        domain: Some("github.com".into()),
        ..Default::default()
    };
    let results = search(&master, &query).unwrap().results;
    assert_eq!(results.len(), 1);
    assert!(results[0].matches.in_domain);
    assert!(!results[0].matches.in_title);
}

#[test]
fn test_query_month_boundaries() {
    // 2025-06-15T12:00:00.000Z
    let master = ingest(&json!({ "tabGroups": [group("a", 1_749_988_800_000, json!([
        { "id": "1", "url": "https://github.com/x", "title": "X" }
    ]))]}));
    assert_eq!(master.groups[0].created_at, "2025-06-15T12:00:00.000Z");

    let count = |from: Option<&str>, to: Option<&str>| {
        let query = SearchQuery {
            query: Some("github".into()),
            from: from.map(Into::into),
            to: to.map(Into::into),
            ..Default::default()
        };
        search(&master, &query).unwrap().results.len()
    };
    assert_eq!(count(Some("2025-06"), None), 1);
    assert_eq!(count(Some("2025-07"), None), 0);
    assert_eq!(count(None, Some("2025-06")), 1);
    assert_eq!(count(None, Some("2025-05")), 0);
}

#[test]
fn test_week_one_export_path() {
    // 2025-01-02T00:00:00.000Z
    let master = ingest(&json!({ "tabGroups": [group("a", 1_735_776_000_000, json!([
        { "id": "1", "url": "https://example.com", "title": "E" }
    ]))]}));
    assert_eq!(period_key(&master.groups[0], GroupBy::Week), "2025-W01");

    let dir = tempfile::tempdir().unwrap();
    let config = ExportConfig {
        target_dir: dir.path().to_path_buf(),
        group_by: GroupBy::Week,
        single_file: false,
        from: None,
        to: None,
        force: false,
        verbose: false,
        quiet: true,
    };
    let summary = exporter::execute(&master, &config).unwrap();
    assert_eq!(summary.created, 1);
    assert!(dir.path().join("2025/2025-W01.md").exists());
}

#[test]
fn test_persisted_round_trip() {
    let mut master = ingest(&json!({ "tabGroups": [
        group("a", 1_700_000_000_000, json!([
            { "id": "1", "url": "https://github.com/x", "title": "X" }
        ])),
        { "id": "b", "createDate": 1_700_000_100_000i64, "tabsMeta": [], "starred": true, "label": "Later" }
    ]}));
    let before = master.clone();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("master.json");
    store::save(&path, &mut master).unwrap();
    let loaded = store::load(&path).unwrap();

    assert_eq!(loaded, master);
    assert_eq!(
        MasterData {
            exported_at: before.exported_at.clone(),
            ..loaded
        },
        before
    );
}
