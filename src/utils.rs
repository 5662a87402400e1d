use chrono::{DateTime, SecondsFormat, Utc};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Outcome of writing one export file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProcessResult {
    Created,
    Updated,
    Skipped,
}

/// Fields read back from the header block of a previously exported file.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExportHeaderFields {
    pub period: Option<String>,
    pub group_by: Option<String>,
    pub total_groups: Option<usize>,
    pub total_tabs: Option<usize>,
    pub generated: Option<DateTime<Utc>>,
    pub content_hash: Option<String>,
}

/// `YYYY-MM-DDTHH:MM:SS.mmmZ`, the one timestamp format stored anywhere.
pub fn iso_string(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn iso_from_epoch_ms(epoch_ms: i64) -> String {
    iso_string(DateTime::from_timestamp_millis(epoch_ms).unwrap_or_default())
}

pub fn now_iso() -> String {
    iso_string(Utc::now())
}

/// Parse one of our own stored timestamps.
pub fn parse_iso(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Hex SHA-256 of a rendered body, embedded in the header for skip checks.
pub fn content_hash(body: &str) -> String {
    format!("{:x}", Sha256::digest(body.as_bytes()))
}

/// Read the `---` delimited header of an existing export file.
pub fn parse_existing_header(path: &Path) -> Option<ExportHeaderFields> {
    let file = File::open(path).ok()?;
    let reader = BufReader::new(file);
    let mut lines = reader.lines();
    let first = lines.next()?.ok()?;
    if first.trim() != "---" {
        return None;
    }

    let mut fields = ExportHeaderFields::default();
    let mut bytes_read = 0usize;

    for line in lines {
        let line = line.ok()?;
        bytes_read += line.len() + 1;
        if bytes_read > 2048 || line.trim() == "---" {
            break;
        }
        let Some((key, rest)) = line.split_once(':') else {
            continue;
        };
        let val = rest.trim().trim_matches('\'').trim_matches('"');
        match key.trim() {
            "period" => fields.period = Some(val.to_string()),
            "groupBy" => fields.group_by = Some(val.to_string()),
            "totalGroups" => fields.total_groups = val.parse().ok(),
            "totalTabs" => fields.total_tabs = val.parse().ok(),
            "generated" => fields.generated = parse_iso(val),
            "contentHash" => fields.content_hash = Some(val.to_string()),
            _ => {}
        }
    }
    Some(fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_iso_from_epoch_keeps_millis() {
        assert_eq!(iso_from_epoch_ms(1_700_000_000_123), "2023-11-14T22:13:20.123Z");
        assert_eq!(iso_from_epoch_ms(0), "1970-01-01T00:00:00.000Z");
    }

    #[test]
    fn test_parse_existing_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("2025-06.md");
        fs::write(
            &path,
            "---\nperiod: '2025-06'\ngroupBy: month\ntotalGroups: 2\ntotalTabs: 5\n\
             generated: 2025-07-01T00:00:00.000Z\ncontentHash: abc123\n---\n\n# body\n",
        )
        .unwrap();

        let header = parse_existing_header(&path).unwrap();
        assert_eq!(header.period.as_deref(), Some("2025-06"));
        assert_eq!(header.group_by.as_deref(), Some("month"));
        assert_eq!(header.total_groups, Some(2));
        assert_eq!(header.total_tabs, Some(5));
        assert!(header.generated.is_some());
        assert_eq!(header.content_hash.as_deref(), Some("abc123"));
    }

    #[test]
    fn test_header_requires_leading_delimiter() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.md");
        fs::write(&path, "# no header\n").unwrap();
        assert!(parse_existing_header(&path).is_none());
    }

    #[test]
    fn test_content_hash_is_stable() {
        assert_eq!(content_hash("abc"), content_hash("abc"));
        assert_ne!(content_hash("abc"), content_hash("abd"));
        assert_eq!(content_hash("").len(), 64);
    }
}
