//! Strict validation of model output into candidate endpoints.
//!
//! The top-level shape must be an endpoint array (bare or under a known
//! wrapper key); anything else fails the whole chunk. Inside the array, each
//! item is checked on its own and bad items are skipped.

use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

use super::ExtractError;
use crate::endpoint::{
    AuthMethod, CandidateEndpoint, HttpMethod, Parameter, EXAMPLE_RESPONSE_CHARS,
};
use crate::text::truncate_chars;

/// Object keys under which models commonly nest the endpoint array.
const WRAPPER_KEYS: &[&str] = &["endpoints", "data", "results", "items", "api_endpoints"];

/// Candidates accepted from one response, plus how many items were rejected.
#[derive(Debug, Clone, Default)]
pub struct ParsedChunk {
    pub candidates: Vec<CandidateEndpoint>,
    pub skipped: usize,
}

#[derive(Debug, Deserialize)]
struct RawEndpoint {
    method: String,
    path: String,
    #[serde(default)]
    domain: Option<String>,
    #[serde(default)]
    full_url: Option<String>,
    #[serde(default)]
    endpoint_name: Option<String>,
    #[serde(default)]
    purpose: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    auth_method: Option<String>,
    #[serde(default)]
    parameters: Option<Vec<Value>>,
    #[serde(default)]
    required_headers: Option<Value>,
    #[serde(default)]
    response_format: Option<String>,
    #[serde(default)]
    example_response: Option<Value>,
    #[serde(default)]
    response_structure: Option<Value>,
    #[serde(default)]
    status_code: Option<Value>,
    #[serde(default)]
    call_frequency: Option<Value>,
    #[serde(default)]
    timing_avg_ms: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct RawParameter {
    name: String,
    location: String,
    #[serde(default)]
    required: Option<bool>,
    #[serde(default)]
    example_value: Option<Value>,
    #[serde(default)]
    param_type: Option<String>,
}

/// Removes a surrounding Markdown code fence (```` ```json ... ``` ````), if any.
pub fn strip_code_fences(text: &str) -> &str {
    let text = text.trim();
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = match rest.find('\n') {
        Some(nl) => &rest[nl + 1..],
        None => rest.trim_start_matches(|c: char| c.is_ascii_alphabetic()),
    };
    let rest = rest.trim();
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Parses one model response.
pub fn parse_response(text: &str) -> Result<ParsedChunk, ExtractError> {
    let body = strip_code_fences(text);
    let value: Value = serde_json::from_str(body)
        .map_err(|e| ExtractError::Malformed(format!("not valid JSON: {e}")))?;
    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => WRAPPER_KEYS
            .iter()
            .find_map(|k| match map.remove(*k) {
                Some(Value::Array(items)) => Some(items),
                _ => None,
            })
            .ok_or_else(|| {
                let keys: Vec<&String> = map.keys().collect();
                ExtractError::Malformed(format!("object without endpoint array (keys: {keys:?})"))
            })?,
        other => {
            return Err(ExtractError::Malformed(format!(
                "expected an array, got {}",
                json_kind(&other)
            )))
        }
    };

    let mut parsed = ParsedChunk::default();
    for (i, item) in items.into_iter().enumerate() {
        match candidate_from_value(item) {
            Ok(c) => parsed.candidates.push(c),
            Err(reason) => {
                tracing::debug!(item = i, %reason, "skipping invalid endpoint item");
                parsed.skipped += 1;
            }
        }
    }
    Ok(parsed)
}

fn candidate_from_value(item: Value) -> Result<CandidateEndpoint, String> {
    let raw: RawEndpoint = serde_json::from_value(item).map_err(|e| e.to_string())?;
    let method: HttpMethod = raw.method.parse()?;
    let path = raw.path.trim().to_string();
    if path.is_empty() {
        return Err("empty path".to_string());
    }

    let full_url = non_empty(raw.full_url);
    let domain = non_empty(raw.domain)
        .or_else(|| {
            full_url
                .as_deref()
                .and_then(|u| url::Url::parse(u).ok())
                .and_then(|u| u.host_str().map(str::to_string))
        })
        .unwrap_or_default()
        .to_ascii_lowercase();

    let parameters = raw
        .parameters
        .unwrap_or_default()
        .into_iter()
        .filter_map(|p| match parameter_from_value(p) {
            Ok(p) => Some(p),
            Err(reason) => {
                tracing::debug!(%reason, "dropping invalid parameter");
                None
            }
        })
        .collect();

    Ok(CandidateEndpoint {
        method,
        path,
        domain,
        endpoint_name: raw.endpoint_name.unwrap_or_default().trim().to_string(),
        purpose: raw.purpose.unwrap_or_default().trim().to_string(),
        category: raw.category.unwrap_or_default().trim().to_string(),
        auth_method: raw
            .auth_method
            .as_deref()
            .map(AuthMethod::from_label)
            .unwrap_or_default(),
        parameters,
        response_format: raw.response_format.unwrap_or_default().trim().to_string(),
        example_response: raw
            .example_response
            .and_then(scalar_to_string)
            .filter(|s| !s.is_empty())
            .map(|s| truncate_chars(&s, EXAMPLE_RESPONSE_CHARS, "...")),
        full_url,
        required_headers: headers_from_value(raw.required_headers),
        response_structure: non_empty(raw.response_structure.and_then(scalar_to_string)),
        status_code: raw
            .status_code
            .as_ref()
            .and_then(number_from_value)
            .filter(|n| (100.0..600.0).contains(n))
            .map(|n| n as u16),
        call_frequency: raw
            .call_frequency
            .as_ref()
            .and_then(number_from_value)
            .filter(|n| *n >= 1.0)
            .map_or(1, |n| n as usize),
        timing_avg_ms: raw
            .timing_avg_ms
            .as_ref()
            .and_then(number_from_value)
            .filter(|n| *n >= 0.0),
    })
}

/// Finite number from a JSON number or numeric string; anything else is `None`.
fn number_from_value(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

fn parameter_from_value(value: Value) -> Result<Parameter, String> {
    let raw: RawParameter = serde_json::from_value(value).map_err(|e| e.to_string())?;
    let name = raw.name.trim().to_string();
    if name.is_empty() {
        return Err("empty parameter name".to_string());
    }
    Ok(Parameter {
        name,
        location: raw.location.parse()?,
        required: raw.required.unwrap_or(true),
        example_value: raw.example_value.and_then(scalar_to_string),
        param_type: non_empty(raw.param_type),
    })
}

/// Header map; non-object values are ignored and scalar values stringified.
fn headers_from_value(value: Option<Value>) -> BTreeMap<String, String> {
    match value {
        Some(Value::Object(map)) => map
            .into_iter()
            .filter(|(k, _)| !k.trim().is_empty())
            .map(|(k, v)| (k, scalar_to_string(v).unwrap_or_default()))
            .collect(),
        _ => BTreeMap::new(),
    }
}

/// Strings as-is, other JSON compacted; `null` is `None`.
fn scalar_to_string(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
