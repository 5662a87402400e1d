/// Type definitions and validation for the OneTab extension's persisted state.
///
/// OneTab keeps its whole state as one JSON document:
///
/// ```json
/// { "state": { "tabGroups": [ { "id": "...", "createDate": 1700000000000,
///                               "tabsMeta": [ { "id": "...", "url": "...", "title": "..." } ] } ] } }
/// ```
///
/// Depending on how it was read, `state` and `tabGroups` may each arrive as a
/// JSON-encoded string instead of a structure, and some dumps drop the `state`
/// wrapper altogether. Unknown fields are ignored at every level.
///
/// Validation is all-or-nothing: one bad group or tab rejects the batch.
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Source records
// ---------------------------------------------------------------------------

/// One saved tab inside a group, as stored by the extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OneTabTabRecord {
    pub id: String,
    pub url: String,
    pub title: String,
}

/// One saved group, as stored by the extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OneTabGroupRecord {
    pub id: String,
    /// Epoch milliseconds.
    pub create_date: i64,
    pub tabs_meta: Vec<OneTabTabRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starred: Option<bool>,
    /// User-assigned group name. Older versions call it `label`.
    #[serde(default, alias = "label", skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

// ---------------------------------------------------------------------------
// Shape detection
// ---------------------------------------------------------------------------

/// Validate a raw export and return every group in source order.
pub fn validate(raw: &Value) -> Result<Vec<OneTabGroupRecord>> {
    let groups = locate_tab_groups(raw)?;
    groups
        .iter()
        .enumerate()
        .map(|(index, value)| parse_group(index, value))
        .collect()
}

/// Walk the accepted shapes in order and return the `tabGroups` array.
fn locate_tab_groups(raw: &Value) -> Result<Vec<Value>> {
    let root = decode_if_string(raw, "payload")?;
    let Some(obj) = root.as_object() else {
        return Err(Error::UnrecognizedShape);
    };

    // { state: { tabGroups: [...] } }
    if let Some(state) = obj.get("state") {
        let state = decode_if_string(state, "state")?;
        if let Some(groups) = tab_groups_of(state.as_object())? {
            return Ok(groups);
        }
    }

    // { tabGroups: [...] }
    if let Some(groups) = tab_groups_of(Some(obj))? {
        return Ok(groups);
    }

    Err(Error::UnrecognizedShape)
}

fn tab_groups_of(obj: Option<&Map<String, Value>>) -> Result<Option<Vec<Value>>> {
    let Some(value) = obj.and_then(|o| o.get("tabGroups")) else {
        return Ok(None);
    };
    match decode_if_string(value, "tabGroups")? {
        Value::Array(groups) => Ok(Some(groups)),
        _ => Ok(None),
    }
}

/// Re-parse a value that was stored as a JSON string; pass anything else through.
fn decode_if_string(value: &Value, field: &'static str) -> Result<Value> {
    match value {
        Value::String(s) => {
            serde_json::from_str(s).map_err(|source| Error::UnparsableField { field, source })
        }
        other => Ok(other.clone()),
    }
}

/// Cheap check used by the key-value probe: does this value carry a state shape?
pub fn looks_like_state(value: &Value) -> bool {
    locate_tab_groups(value).is_ok()
}

// ---------------------------------------------------------------------------
// Record checks
// ---------------------------------------------------------------------------

fn parse_group(index: usize, value: &Value) -> Result<OneTabGroupRecord> {
    let invalid = |reason: &str| Error::InvalidGroup {
        index,
        reason: reason.to_string(),
    };

    let obj = value.as_object().ok_or_else(|| invalid("not an object"))?;
    let id = obj
        .get("id")
        .and_then(Value::as_str)
        .ok_or_else(|| invalid("missing string `id`"))?;
    let create_date = obj
        .get("createDate")
        .and_then(epoch_millis)
        .ok_or_else(|| invalid("missing numeric `createDate`"))?;
    if chrono::DateTime::from_timestamp_millis(create_date).is_none() {
        return Err(invalid("`createDate` is outside the representable time range"));
    }
    let tabs = obj
        .get("tabsMeta")
        .and_then(Value::as_array)
        .ok_or_else(|| invalid("missing array `tabsMeta`"))?;

    let tabs_meta = tabs
        .iter()
        .enumerate()
        .map(|(tab_index, tab)| parse_tab(index, tab_index, tab))
        .collect::<Result<Vec<_>>>()?;

    let title = obj
        .get("title")
        .or_else(|| obj.get("label"))
        .and_then(Value::as_str)
        .map(str::to_owned);

    Ok(OneTabGroupRecord {
        id: id.to_owned(),
        create_date,
        tabs_meta,
        starred: obj.get("starred").and_then(Value::as_bool),
        title,
    })
}

fn parse_tab(group_index: usize, tab_index: usize, value: &Value) -> Result<OneTabTabRecord> {
    let obj = value.as_object().ok_or_else(|| Error::InvalidTab {
        group_index,
        tab_index,
        reason: "not an object".into(),
    })?;

    let field = |name: &str| {
        obj.get(name)
            .and_then(Value::as_str)
            .map(str::to_owned)
            .ok_or_else(|| Error::InvalidTab {
                group_index,
                tab_index,
                reason: format!("missing string `{name}`"),
            })
    };

    Ok(OneTabTabRecord {
        id: field("id")?,
        url: field("url")?,
        title: field("title")?,
    })
}

/// Integer milliseconds; fractional values are truncated.
fn epoch_millis(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.is_finite() && f.abs() < i64::MAX as f64)
            .map(|f| f.trunc() as i64)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn groups_json() -> Value {
        json!([{
            "id": "g1",
            "createDate": 1_700_000_000_000_i64,
            "starred": true,
            "label": "Reading",
            "locked": false,
            "tabsMeta": [
                { "id": "t1", "url": "https://github.com/x", "title": "X", "favIconUrl": "" }
            ]
        }])
    }

    #[test]
    fn test_accepts_state_wrapper() {
        let groups = validate(&json!({ "state": { "tabGroups": groups_json() } })).unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].id, "g1");
        assert_eq!(groups[0].create_date, 1_700_000_000_000);
        assert_eq!(groups[0].starred, Some(true));
        assert_eq!(groups[0].title.as_deref(), Some("Reading"));
        assert_eq!(groups[0].tabs_meta[0].url, "https://github.com/x");
    }

    #[test]
    fn test_accepts_bare_tab_groups() {
        let groups = validate(&json!({ "tabGroups": groups_json() })).unwrap();
        assert_eq!(groups.len(), 1);
    }

    #[test]
    fn test_double_encoded_state_and_tab_groups() {
        let inner = json!({ "tabGroups": groups_json().to_string() }).to_string();
        let encoded = validate(&json!({ "state": inner })).unwrap();
        let plain = validate(&json!({ "state": { "tabGroups": groups_json() } })).unwrap();
        assert_eq!(encoded, plain);
    }

    #[test]
    fn test_whole_payload_as_string() {
        let payload = Value::String(json!({ "tabGroups": groups_json() }).to_string());
        assert_eq!(validate(&payload).unwrap().len(), 1);
    }

    #[test]
    fn test_unparsable_state_names_field() {
        let err = validate(&json!({ "state": "{not json" })).unwrap_err();
        match err {
            Error::UnparsableField { field, .. } => assert_eq!(field, "state"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unparsable_tab_groups_names_field() {
        let err = validate(&json!({ "tabGroups": "[oops" })).unwrap_err();
        assert!(matches!(err, Error::UnparsableField { field: "tabGroups", .. }));
    }

    #[test]
    fn test_unknown_shape_lists_accepted_shapes() {
        let err = validate(&json!({ "groups": [] })).unwrap_err();
        assert!(matches!(err, Error::UnrecognizedShape));
        let msg = err.to_string();
        assert!(msg.contains("state"));
        assert!(msg.contains("tabGroups"));
    }

    #[test]
    fn test_one_bad_tab_rejects_batch() {
        let raw = json!({ "tabGroups": [
            { "id": "ok", "createDate": 1, "tabsMeta": [] },
            { "id": "bad", "createDate": 2, "tabsMeta": [ { "id": "t", "url": "https://a.b" } ] }
        ]});
        let err = validate(&raw).unwrap_err();
        match err {
            Error::InvalidTab { group_index, tab_index, reason } => {
                assert_eq!(group_index, 1);
                assert_eq!(tab_index, 0);
                assert!(reason.contains("title"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_group_requires_numeric_create_date() {
        let raw = json!({ "tabGroups": [ { "id": "g", "createDate": "yesterday", "tabsMeta": [] } ] });
        let err = validate(&raw).unwrap_err();
        assert!(matches!(err, Error::InvalidGroup { index: 0, .. }));
    }

    #[test]
    fn test_fractional_create_date_truncates() {
        let raw = json!({ "tabGroups": [ { "id": "g", "createDate": 1500.9, "tabsMeta": [] } ] });
        assert_eq!(validate(&raw).unwrap()[0].create_date, 1500);
    }

    #[test]
    fn test_empty_tab_groups_is_valid() {
        assert!(validate(&json!({ "tabGroups": [] })).unwrap().is_empty());
    }

    #[test]
    fn test_looks_like_state() {
        assert!(looks_like_state(&json!({ "tabGroups": [] })));
        assert!(!looks_like_state(&json!({ "settings": {} })));
        assert!(!looks_like_state(&json!(42)));
    }
}
