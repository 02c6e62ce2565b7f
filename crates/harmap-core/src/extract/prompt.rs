//! Prompt rendering for one chunk.
//!
//! Records with the same method and normalized path are collapsed into one
//! summary entry (call count, average timing, a few example URLs) so the
//! model sees each logical endpoint once per chunk.

use serde::Serialize;

use crate::endpoint::path::normalize_display_path;
use crate::har::{RecordSummary, TrafficRecord};
use crate::session::SessionStore;

/// Example URLs listed per grouped entry.
const MAX_EXAMPLE_URLS: usize = 3;

/// Run-level context shared by every chunk prompt.
#[derive(Debug, Clone, Default)]
pub struct PromptContext {
    pub website_name: String,
    pub task: String,
    pub auth_cookie_names: Vec<String>,
    pub total_cookies: usize,
}

impl PromptContext {
    pub fn new(website_name: &str, task: &str, session: &SessionStore) -> Self {
        Self {
            website_name: website_name.to_string(),
            task: task.to_string(),
            auth_cookie_names: session.auth_cookie_names(),
            total_cookies: session.len(),
        }
    }
}

#[derive(Debug, Serialize)]
struct GroupedRequest {
    #[serde(flatten)]
    summary: RecordSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    call_frequency: Option<usize>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    examples: Vec<String>,
}

#[derive(Debug, Serialize)]
struct ChunkSummary {
    total_entries: usize,
    requests: Vec<GroupedRequest>,
}

#[derive(Serialize)]
struct CookiesSummary<'a> {
    auth_cookies: &'a [String],
    total_cookies: usize,
}

/// Groups records by (method, normalized path), keeping first-seen order.
fn group_records(records: &[&TrafficRecord]) -> Vec<GroupedRequest> {
    let mut groups: Vec<(String, String, Vec<&TrafficRecord>)> = Vec::new();
    for &record in records {
        let pattern = normalize_display_path(&record.path);
        match groups
            .iter_mut()
            .find(|(m, p, _)| *m == record.method && *p == pattern)
        {
            Some((_, _, members)) => members.push(record),
            None => groups.push((record.method.clone(), pattern, vec![record])),
        }
    }

    groups
        .into_iter()
        .map(|(_, pattern, members)| {
            let mut summary = RecordSummary::from_record(members[0]);
            if members.len() == 1 {
                return GroupedRequest {
                    summary,
                    call_frequency: None,
                    examples: Vec::new(),
                };
            }
            summary.path = pattern;
            let timings: Vec<f64> = members.iter().filter_map(|r| r.duration_ms).collect();
            if !timings.is_empty() {
                let avg = timings.iter().sum::<f64>() / timings.len() as f64;
                summary.timing_ms = Some((avg * 100.0).round() / 100.0);
            }
            let mut examples: Vec<String> = Vec::new();
            for r in &members {
                if examples.len() == MAX_EXAMPLE_URLS {
                    break;
                }
                if !examples.contains(&r.url) {
                    examples.push(r.url.clone());
                }
            }
            GroupedRequest {
                summary,
                call_frequency: Some(members.len()),
                examples,
            }
        })
        .collect()
}

/// JSON summary of a chunk's records as shown to the model.
pub fn render_chunk_summary(records: &[&TrafficRecord]) -> String {
    let summary = ChunkSummary {
        total_entries: records.len(),
        requests: group_records(records),
    };
    serde_json::to_string_pretty(&summary).unwrap_or_default()
}

/// Full extraction prompt for one chunk.
pub fn render_prompt(ctx: &PromptContext, records: &[&TrafficRecord]) -> String {
    let cookies = serde_json::to_string_pretty(&CookiesSummary {
        auth_cookies: &ctx.auth_cookie_names,
        total_cookies: ctx.total_cookies,
    })
    .unwrap_or_default();

    format!(
        r#"You are reverse engineering the HTTP API of a website from recorded browser traffic.

Website: {website}
Task the browser session performed: {task}
Requests in this batch: {count}

Static assets, analytics and tracking calls have already been removed.

Recorded requests:
{requests}

Session cookies:
{cookies}

For every distinct API endpoint (method plus path pattern) in the requests above:
- describe what it does and give it a short descriptive name
- pick a category such as data_fetch, user_action, authentication or search
- list its parameters (query, path, body, header) with example values taken from the traffic
- state the authentication it relies on (none, cookie, bearer, api_key, basic, oauth)
- note the response content type and include a short example response (under 500 characters)
- describe the response structure briefly and give the recorded status code
- copy call_frequency (1 when absent) and timing_ms from the recorded entry into call_frequency and timing_avg_ms

Replace identifiers in paths with placeholders, e.g. /api/users/123 and /api/users/456 become /api/users/{{id}}.
Only report real API endpoints, not HTML pages, static files or tracking.

Answer with a JSON array and nothing else. Each element must look like:
{{
  "method": "GET|POST|PUT|PATCH|DELETE|HEAD|OPTIONS",
  "path": "/api/path/{{param}}",
  "full_url": "https://example.com/api/path/123",
  "domain": "example.com",
  "endpoint_name": "Descriptive Name",
  "purpose": "What this endpoint does",
  "category": "data_fetch",
  "parameters": [
    {{"name": "param", "location": "query|path|body|header", "example_value": "value", "required": true, "param_type": "string"}}
  ],
  "required_headers": {{"Header-Name": "value"}},
  "auth_method": "cookie",
  "response_format": "application/json",
  "response_structure": "object with id and name",
  "example_response": "{{\"id\": 123}}",
  "status_code": 200,
  "call_frequency": 1,
  "timing_avg_ms": 123.45
}}
"#,
        website = ctx.website_name,
        task = ctx.task,
        count = records.len(),
        requests = render_chunk_summary(records),
        cookies = cookies,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::har::TrafficResponse;

    fn record(i: usize, method: &str, path: &str, ms: f64) -> TrafficRecord {
        TrafficRecord {
            index: i,
            method: method.into(),
            url: format!("https://ably.com{path}"),
            domain: "ably.com".into(),
            path: path.into(),
            query: vec![],
            request_headers: vec![],
            request_body: None,
            response: Some(TrafficResponse {
                status: 200,
                headers: vec![],
                content_type: "application/json".into(),
                body: Some("{\"ok\":true}".into()),
                body_size: 11,
            }),
            started_at: None,
            duration_ms: Some(ms),
        }
    }

    #[test]
    fn same_endpoint_calls_are_grouped() {
        let recs = vec![
            record(0, "GET", "/apps/1/stats", 10.0),
            record(1, "POST", "/apps/1/stats", 5.0),
            record(2, "GET", "/apps/2/stats", 20.0),
            record(3, "GET", "/apps/3/stats", 30.0),
            record(4, "GET", "/apps/4/stats", 40.0),
        ];
        let refs: Vec<&TrafficRecord> = recs.iter().collect();
        let groups = group_records(&refs);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].summary.path, "/apps/{id}/stats");
        assert_eq!(groups[0].call_frequency, Some(4));
        assert_eq!(groups[0].summary.timing_ms, Some(25.0));
        assert_eq!(groups[0].examples.len(), MAX_EXAMPLE_URLS);
        assert_eq!(groups[1].summary.method, "POST");
        assert_eq!(groups[1].call_frequency, None);
        assert_eq!(groups[1].summary.path, "/apps/1/stats");
    }

    #[test]
    fn prompt_carries_context_and_requests() {
        let recs = vec![record(0, "GET", "/api/me", 12.0)];
        let refs: Vec<&TrafficRecord> = recs.iter().collect();
        let ctx = PromptContext {
            website_name: "ably".into(),
            task: "Check app stats".into(),
            auth_cookie_names: vec!["session_id".into()],
            total_cookies: 5,
        };
        let prompt = render_prompt(&ctx, &refs);
        assert!(prompt.contains("Website: ably"));
        assert!(prompt.contains("Check app stats"));
        assert!(prompt.contains("Requests in this batch: 1"));
        assert!(prompt.contains("\"path\": \"/api/me\""));
        assert!(prompt.contains("\"session_id\""));
        assert!(prompt.contains("\"total_cookies\": 5"));
        assert!(prompt.contains("/api/users/{id}"));
        for field in ["status_code", "call_frequency", "timing_avg_ms", "response_structure"] {
            assert!(prompt.contains(&format!("\"{field}\"")), "template lacks {field}");
        }
    }

    #[test]
    fn chunk_summary_is_valid_json() {
        let recs = vec![
            record(0, "GET", "/a/1", 1.0),
            record(1, "GET", "/a/2", 3.0),
        ];
        let refs: Vec<&TrafficRecord> = recs.iter().collect();
        let v: serde_json::Value = serde_json::from_str(&render_chunk_summary(&refs)).unwrap();
        assert_eq!(v["total_entries"], 2);
        assert_eq!(v["requests"][0]["call_frequency"], 2);
        assert_eq!(v["requests"][0]["path"], "/a/{id}");
    }
}
