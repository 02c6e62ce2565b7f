//! Single blocking HTTP exchange over libcurl.

use std::collections::BTreeMap;
use std::str;
use std::time::{Duration, Instant};

use super::request::PreparedRequest;
use crate::endpoint::HttpMethod;

/// Bytes of response body kept in memory; the rest is counted, not stored.
const MAX_BODY_BYTES: usize = 1024 * 1024;

#[derive(Debug, Clone)]
pub struct RawResponse {
    /// Final status after redirects.
    pub status: u32,
    pub content_type: Option<String>,
    /// Headers of the final hop; repeated names are joined with ", ".
    pub headers: BTreeMap<String, String>,
    pub body: Vec<u8>,
    pub body_size: u64,
    pub elapsed: Duration,
}

/// Sends `req`, following redirects, with `timeout` covering the whole exchange.
///
/// Runs in the current thread; call from `spawn_blocking` if used from async code.
pub fn perform(
    req: &PreparedRequest,
    cookie: Option<&str>,
    timeout: Duration,
) -> Result<RawResponse, (curl::Error, Duration)> {
    let started = Instant::now();
    send(req, cookie, timeout, started).map_err(|e| (e, started.elapsed()))
}

fn send(
    req: &PreparedRequest,
    cookie: Option<&str>,
    timeout: Duration,
    started: Instant,
) -> Result<RawResponse, curl::Error> {
    let mut easy = curl::easy::Easy::new();
    easy.url(&req.url)?;
    easy.follow_location(true)?;
    easy.max_redirections(10)?;
    easy.connect_timeout(timeout)?;
    easy.timeout(timeout)?;

    match req.method {
        HttpMethod::Get => {}
        HttpMethod::Head => easy.nobody(true)?,
        other => easy.custom_request(other.as_str())?,
    }
    if let Some(body) = &req.body {
        easy.post_fields_copy(body.as_bytes())?;
    } else if req.method.has_body() {
        easy.post_fields_copy(&[])?;
    }
    if let Some(cookie) = cookie {
        easy.cookie(cookie)?;
    }

    let mut list = curl::easy::List::new();
    for (k, v) in &req.headers {
        list.append(&format!("{}: {}", k, v))?;
    }
    easy.http_headers(list)?;

    let mut content_type: Option<String> = None;
    let mut headers: BTreeMap<String, String> = BTreeMap::new();
    let mut body: Vec<u8> = Vec::new();
    let mut body_size = 0u64;
    {
        let mut transfer = easy.transfer();
        transfer.header_function(|data| {
            if let Ok(line) = str::from_utf8(data) {
                let line = line.trim_end();
                // New status line: a redirect hop starts a fresh header block.
                if line.starts_with("HTTP/") {
                    content_type = None;
                    headers.clear();
                } else if let Some((name, value)) = line.split_once(':') {
                    let (name, value) = (name.trim(), value.trim());
                    if name.eq_ignore_ascii_case("content-type") {
                        content_type = Some(value.to_string());
                    }
                    headers
                        .entry(name.to_string())
                        .and_modify(|v| {
                            v.push_str(", ");
                            v.push_str(value);
                        })
                        .or_insert_with(|| value.to_string());
                }
            }
            true
        })?;
        transfer.write_function(|data| {
            body_size += data.len() as u64;
            let room = MAX_BODY_BYTES.saturating_sub(body.len());
            body.extend_from_slice(&data[..data.len().min(room)]);
            Ok(data.len())
        })?;
        transfer.perform()?;
    }

    Ok(RawResponse {
        status: easy.response_code()?,
        content_type,
        headers,
        body,
        body_size,
        elapsed: started.elapsed(),
    })
}
