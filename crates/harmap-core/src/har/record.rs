//! Normalized request/response pair built once from a HAR entry.

use serde::Serialize;

use super::parse::{HarEntry, HarHeader};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Header {
    pub name: String,
    pub value: String,
}

impl From<&HarHeader> for Header {
    fn from(h: &HarHeader) -> Self {
        Self {
            name: h.name.clone(),
            value: h.value.clone(),
        }
    }
}

/// Response half of a captured exchange.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrafficResponse {
    pub status: u16,
    pub headers: Vec<Header>,
    /// Lowercased MIME type without parameters (e.g. `application/json`).
    pub content_type: String,
    /// Decoded text body; `None` when not captured or binary (base64).
    pub body: Option<String>,
    pub body_size: u64,
}

/// One captured HTTP exchange.
///
/// `response` is `None` for failed captures (status <= 0, `_failureText`, or no
/// response object). Such records stay in the capture for accounting but never
/// reach extraction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrafficRecord {
    /// Position in the original capture.
    pub index: usize,
    pub method: String,
    pub url: String,
    /// Lowercased host; empty when the URL has no host (e.g. `about:blank`).
    pub domain: String,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub request_headers: Vec<Header>,
    pub request_body: Option<String>,
    pub response: Option<TrafficResponse>,
    pub started_at: Option<String>,
    pub duration_ms: Option<f64>,
}

impl TrafficRecord {
    pub fn from_entry(index: usize, entry: &HarEntry) -> Self {
        let request = &entry.request;
        let method = if request.method.trim().is_empty() {
            "GET".to_string()
        } else {
            request.method.trim().to_ascii_uppercase()
        };

        let (domain, path, query) = match url::Url::parse(&request.url) {
            Ok(parsed) => {
                let domain = parsed
                    .host_str()
                    .map(|h| h.to_ascii_lowercase())
                    .unwrap_or_default();
                let path = if parsed.path().is_empty() {
                    "/".to_string()
                } else {
                    parsed.path().to_string()
                };
                let query = parsed
                    .query_pairs()
                    .map(|(k, v)| (k.into_owned(), v.into_owned()))
                    .collect();
                (domain, path, query)
            }
            Err(_) => (String::new(), String::new(), Vec::new()),
        };

        let request_body = request
            .post_data
            .as_ref()
            .and_then(|p| p.text.clone())
            .filter(|t| !t.is_empty());

        let response = entry.response.as_ref().and_then(|r| {
            let failed = r.status <= 0
                || r
                    .failure_text
                    .as_deref()
                    .map_or(false, |t| !t.trim().is_empty());
            if failed {
                return None;
            }
            let content = r.content.as_ref();
            let content_type = content
                .and_then(|c| c.mime_type.as_deref())
                .filter(|m| !m.is_empty())
                .or_else(|| find_header(&r.headers, "content-type"))
                .map(normalize_mime)
                .unwrap_or_default();
            let is_base64 = content
                .and_then(|c| c.encoding.as_deref())
                .map_or(false, |e| e.eq_ignore_ascii_case("base64"));
            let body = content
                .and_then(|c| c.text.clone())
                .filter(|t| !t.is_empty() && !is_base64);
            let body_size = content
                .map(|c| c.size)
                .filter(|s| *s > 0)
                .map(|s| s as u64)
                .or_else(|| body.as_ref().map(|b| b.len() as u64))
                .unwrap_or(0);
            Some(TrafficResponse {
                status: u16::try_from(r.status).unwrap_or(u16::MAX),
                headers: r.headers.iter().map(Header::from).collect(),
                content_type,
                body,
                body_size,
            })
        });

        Self {
            index,
            method,
            url: request.url.clone(),
            domain,
            path,
            query,
            request_headers: request.headers.iter().map(Header::from).collect(),
            request_body,
            response,
            started_at: entry.started_date_time.clone(),
            duration_ms: entry.time.filter(|t| *t >= 0.0),
        }
    }

    pub fn has_response(&self) -> bool {
        self.response.is_some()
    }

    pub fn status(&self) -> Option<u16> {
        self.response.as_ref().map(|r| r.status)
    }

    /// Lowercased response MIME type, or `""` when unknown or no response.
    pub fn content_type(&self) -> &str {
        self.response
            .as_ref()
            .map(|r| r.content_type.as_str())
            .unwrap_or("")
    }

    pub fn request_header(&self, name: &str) -> Option<&str> {
        self.request_headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    }
}

fn find_header<'a>(headers: &'a [HarHeader], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|h| h.name.eq_ignore_ascii_case(name))
        .map(|h| h.value.as_str())
}

/// `"Application/JSON; charset=utf-8"` → `"application/json"`.
fn normalize_mime(raw: &str) -> String {
    raw.split(';').next().unwrap_or("").trim().to_ascii_lowercase()
}
