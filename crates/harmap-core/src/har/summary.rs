//! Condensed view of a record: the fields worth spending prompt tokens on.

use serde::Serialize;
use std::collections::BTreeMap;

use super::record::TrafficRecord;
use crate::text::truncate_chars;

/// Response samples longer than this are cut before reaching the prompt.
pub const RESPONSE_SAMPLE_CHARS: usize = 1000;

const IMPORTANT_HEADER_HINTS: &[&str] = &[
    "authorization",
    "content-type",
    "accept",
    "x-",
    "csrf",
    "api-key",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordSummary {
    pub method: String,
    pub url: String,
    pub domain: String,
    pub path: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub query_params: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_body: Option<String>,
    pub status: Option<u16>,
    pub mime_type: String,
    pub response_size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_sample: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timing_ms: Option<f64>,
}

impl RecordSummary {
    pub fn from_record(record: &TrafficRecord) -> Self {
        let mut query_params = BTreeMap::new();
        for (k, v) in &record.query {
            query_params.entry(k.clone()).or_insert_with(|| v.clone());
        }

        let headers = record
            .request_headers
            .iter()
            .filter(|h| {
                let name = h.name.to_ascii_lowercase();
                IMPORTANT_HEADER_HINTS.iter().any(|hint| name.contains(hint))
            })
            .map(|h| (h.name.clone(), h.value.clone()))
            .collect();

        let response = record.response.as_ref();
        Self {
            method: record.method.clone(),
            url: record.url.clone(),
            domain: record.domain.clone(),
            path: if record.path.is_empty() {
                "/".to_string()
            } else {
                record.path.clone()
            },
            query_params,
            headers,
            request_body: record
                .request_body
                .as_deref()
                .map(|b| truncate_chars(b, RESPONSE_SAMPLE_CHARS, "...[truncated]")),
            status: response.map(|r| r.status),
            mime_type: record.content_type().to_string(),
            response_size: response.map(|r| r.body_size).unwrap_or(0),
            response_sample: response
                .and_then(|r| r.body.as_deref())
                .map(|b| truncate_chars(b, RESPONSE_SAMPLE_CHARS, "...[truncated]")),
            timing_ms: record.duration_ms.map(|t| (t * 100.0).round() / 100.0),
        }
    }

    /// Pretty JSON form; its length drives token estimation.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}
