//! HAR (HTTP Archive) capture loading.
//!
//! Turns the browser agent's `requests.har` into an ordered list of
//! [`TrafficRecord`]s. Parsing is the only fallible step of the traffic model:
//! a missing file or a document without `log.entries` is an input error, while
//! individual failed exchanges are kept and marked as having no response.

mod parse;
mod record;
mod summary;

pub use record::{Header, TrafficRecord, TrafficResponse};
pub use summary::{RecordSummary, RESPONSE_SAMPLE_CHARS};

use anyhow::{Context, Result};
use std::path::Path;

use parse::HarLog;

/// Reads and parses a HAR file into traffic records, in capture order.
pub fn load_capture(path: &Path) -> Result<Vec<TrafficRecord>> {
    let bytes = std::fs::read(path).with_context(|| format!("read HAR file: {}", path.display()))?;
    parse_capture(&bytes).with_context(|| format!("parse HAR JSON: {}", path.display()))
}

/// Parses HAR bytes already in memory.
pub fn parse_capture(bytes: &[u8]) -> Result<Vec<TrafficRecord>> {
    let har: HarLog = serde_json::from_slice(bytes).context("invalid HAR: expected log.entries")?;
    let records: Vec<TrafficRecord> = har
        .log
        .entries
        .iter()
        .enumerate()
        .map(|(i, e)| TrafficRecord::from_entry(i, e))
        .collect();
    let failed = records.iter().filter(|r| !r.has_response()).count();
    tracing::debug!(
        entries = records.len(),
        failed_captures = failed,
        "parsed HAR capture"
    );
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn load_capture_keeps_order_and_failed_entries() {
        let har = r#"{
            "log": {
                "version": "1.2",
                "entries": [
                    {
                        "request": { "method": "POST", "url": "https://ably.com/api/login", "headers": [] },
                        "response": { "status": 200, "headers": [], "content": { "mimeType": "application/json" } }
                    },
                    {
                        "request": { "method": "GET", "url": "https://ably.com/apps/1/stats", "headers": [] },
                        "response": { "status": -1, "headers": [] }
                    }
                ]
            }
        }"#;
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(har.as_bytes()).unwrap();
        f.flush().unwrap();
        let records = load_capture(f.path()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].method, "POST");
        assert_eq!(records[1].index, 1);
        assert!(records[0].has_response());
        assert!(!records[1].has_response());
    }

    #[test]
    fn empty_entries_is_not_an_error() {
        let records = parse_capture(br#"{"log":{"version":"1.2","entries":[]}}"#).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn missing_entries_is_an_error() {
        assert!(parse_capture(br#"{"log":{"version":"1.2"}}"#).is_err());
        assert!(parse_capture(b"not json").is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_capture(&dir.path().join("requests.har")).is_err());
    }
}
