//! Live replay of catalog entries.
//!
//! Strictly sequential: one request at a time, with a fixed pause between
//! consecutive requests. No retries; every failure becomes a result record.

mod classify;
mod perform;
mod request;

pub use classify::{classify_curl_error, classify_status, Outcome};
pub use perform::{perform, RawResponse};
pub use request::{build_request, PreparedRequest, RequestError, DEFAULT_ACCEPT};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::endpoint::{EndpointSpec, HttpMethod};
use crate::session::SessionStore;
use crate::text::truncate_chars;

/// Response bodies are cut to this many characters in results.
pub const RESPONSE_SAMPLE_CHARS: usize = 10_000;

#[derive(Debug, Clone)]
pub struct VerifyOptions {
    pub timeout: Duration,
    pub delay: Duration,
    pub user_agent: String,
}

impl Default for VerifyOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            delay: Duration::from_secs(1),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".to_string(),
        }
    }
}

impl VerifyOptions {
    pub fn from_config(cfg: &crate::config::HarmapConfig) -> Result<Self> {
        Ok(Self {
            timeout: cfg.verify_timeout(),
            delay: cfg.verify_delay().context("verify options")?,
            user_agent: cfg.user_agent.clone(),
        })
    }
}

/// Outcome of replaying one catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub endpoint_name: String,
    pub method: HttpMethod,
    pub domain: String,
    pub path: String,
    /// Concrete URL requested; empty when no URL could be built.
    pub url: String,
    pub outcome: Outcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    pub response_time_ms: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub response_headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_size_bytes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_text: Option<String>,
    /// Parsed body, when the server labelled it JSON and it parsed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_json: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub cookies_used: usize,
}

impl VerificationResult {
    fn for_spec(spec: &EndpointSpec, outcome: Outcome) -> Self {
        Self {
            endpoint_name: spec.display_name().to_string(),
            method: spec.method,
            domain: spec.domain.clone(),
            path: spec.path.clone(),
            url: String::new(),
            outcome,
            status_code: None,
            response_time_ms: 0.0,
            content_type: None,
            response_headers: BTreeMap::new(),
            response_size_bytes: None,
            response_text: None,
            response_json: None,
            error: None,
            cookies_used: 0,
        }
    }
}

fn parse_json_body(content_type: Option<&str>, body: &[u8]) -> Option<serde_json::Value> {
    let is_json = content_type.is_some_and(|ct| ct.to_ascii_lowercase().contains("json"));
    if !is_json || body.is_empty() {
        return None;
    }
    serde_json::from_slice(body).ok()
}

fn round_ms(d: Duration) -> f64 {
    (d.as_secs_f64() * 100_000.0).round() / 100.0
}

/// Replays catalog entries with captured session cookies.
#[derive(Debug, Clone)]
pub struct Verifier {
    options: VerifyOptions,
    session: SessionStore,
}

impl Verifier {
    pub fn new(options: VerifyOptions, session: SessionStore) -> Self {
        Self { options, session }
    }

    pub fn options(&self) -> &VerifyOptions {
        &self.options
    }

    /// Sends one request and records the result. Never fails.
    pub fn verify_one(&self, spec: &EndpointSpec) -> VerificationResult {
        let req = match build_request(spec, &self.options.user_agent) {
            Ok(req) => req,
            Err(e) => {
                tracing::warn!(endpoint = %spec.label(), "cannot build request: {e}");
                let mut result = VerificationResult::for_spec(spec, Outcome::TransportError);
                result.error = Some(e.to_string());
                return result;
            }
        };

        let cookies = self.session.cookies_for(&req.host, &req.path);
        let cookie_header = self.session.cookie_header(&req.host, &req.path);
        tracing::info!(method = %req.method, url = %req.url, cookies = cookies.len(), "verifying endpoint");

        let mut result = VerificationResult::for_spec(spec, Outcome::Success);
        result.url = req.url.clone();
        result.cookies_used = cookies.len();

        match perform(&req, cookie_header.as_deref(), self.options.timeout) {
            Ok(resp) => {
                result.outcome = classify_status(resp.status);
                result.status_code = u16::try_from(resp.status).ok();
                result.response_time_ms = round_ms(resp.elapsed);
                result.response_json = parse_json_body(resp.content_type.as_deref(), &resp.body);
                result.content_type = resp.content_type;
                result.response_headers = resp.headers;
                result.response_size_bytes = Some(resp.body_size);
                let text = String::from_utf8_lossy(&resp.body);
                let total_chars = text.chars().count();
                result.response_text = Some(truncate_chars(
                    &text,
                    RESPONSE_SAMPLE_CHARS,
                    &format!("\n... [truncated, total {total_chars} chars]"),
                ));
                tracing::info!(
                    status = resp.status,
                    outcome = %result.outcome,
                    ms = result.response_time_ms,
                    "endpoint responded"
                );
            }
            Err((e, elapsed)) => {
                result.outcome = classify_curl_error(&e);
                result.response_time_ms = round_ms(elapsed);
                result.error = Some(if result.outcome == Outcome::Timeout {
                    format!(
                        "request timed out after {}s",
                        self.options.timeout.as_secs_f64()
                    )
                } else {
                    e.to_string()
                });
                tracing::warn!(url = %req.url, outcome = %result.outcome, "endpoint request failed: {e}");
            }
        }
        result
    }

    /// Verifies every entry in order, sleeping `delay` between consecutive
    /// requests (not after the last). Blocks the current thread.
    pub fn verify_all(&self, specs: &[EndpointSpec]) -> Vec<VerificationResult> {
        let mut results = Vec::with_capacity(specs.len());
        for (i, spec) in specs.iter().enumerate() {
            if i > 0 && !self.options.delay.is_zero() {
                std::thread::sleep(self.options.delay);
            }
            tracing::debug!(n = i + 1, total = specs.len(), endpoint = %spec.label(), "verify");
            results.push(self.verify_one(spec));
        }
        results
    }
}
