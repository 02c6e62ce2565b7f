//! Endpoint descriptions: per-chunk candidates and merged catalog entries.

pub mod path;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Example responses are cut to this many characters when stored.
pub const EXAMPLE_RESPONSE_CHARS: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
        }
    }

    /// Methods whose body parameters are sent as a JSON object on replay.
    pub fn has_body(&self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "PATCH" => Ok(HttpMethod::Patch),
            "DELETE" => Ok(HttpMethod::Delete),
            "HEAD" => Ok(HttpMethod::Head),
            "OPTIONS" => Ok(HttpMethod::Options),
            other => Err(format!("unsupported HTTP method: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    #[default]
    None,
    Cookie,
    Bearer,
    ApiKey,
    #[serde(alias = "basic", alias = "oauth")]
    Other,
}

impl AuthMethod {
    /// Lenient mapping from free-form model output. Unrecognized schemes
    /// (basic, oauth, ...) become `Other`.
    pub fn from_label(label: &str) -> Self {
        let l = label.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        match l.as_str() {
            "" | "none" | "null" | "no_auth" => AuthMethod::None,
            "cookie" | "cookies" | "session" | "session_cookie" => AuthMethod::Cookie,
            "bearer" | "bearer_token" | "jwt" => AuthMethod::Bearer,
            "api_key" | "apikey" | "x_api_key" => AuthMethod::ApiKey,
            _ => AuthMethod::Other,
        }
    }

    /// Specificity used when merging: none < other < cookie < api_key < bearer.
    pub fn rank(&self) -> u8 {
        match self {
            AuthMethod::None => 0,
            AuthMethod::Other => 1,
            AuthMethod::Cookie => 2,
            AuthMethod::ApiKey => 3,
            AuthMethod::Bearer => 4,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMethod::None => "none",
            AuthMethod::Cookie => "cookie",
            AuthMethod::Bearer => "bearer",
            AuthMethod::ApiKey => "api_key",
            AuthMethod::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamLocation {
    Query,
    Path,
    Header,
    Body,
}

impl FromStr for ParamLocation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "query" | "querystring" => Ok(ParamLocation::Query),
            "path" | "url" => Ok(ParamLocation::Path),
            "header" | "headers" => Ok(ParamLocation::Header),
            "body" | "json" | "form" => Ok(ParamLocation::Body),
            other => Err(format!("unknown parameter location: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub location: ParamLocation,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub param_type: Option<String>,
}

/// Endpoint as reported by one extraction call, after schema validation.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateEndpoint {
    pub method: HttpMethod,
    pub path: String,
    pub domain: String,
    pub endpoint_name: String,
    pub purpose: String,
    pub category: String,
    pub auth_method: AuthMethod,
    pub parameters: Vec<Parameter>,
    pub response_format: String,
    pub example_response: Option<String>,
    pub full_url: Option<String>,
    pub required_headers: BTreeMap<String, String>,
    pub response_structure: Option<String>,
    /// Status observed in the capture.
    pub status_code: Option<u16>,
    /// Captured calls behind this candidate; at least 1.
    pub call_frequency: usize,
    pub timing_avg_ms: Option<f64>,
}

/// Merged catalog entry.
///
/// Deserializes leniently so catalogs written by earlier runs (or edited by
/// hand) can be fed back to the verifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointSpec {
    pub method: HttpMethod,
    pub path: String,
    pub domain: String,
    #[serde(default)]
    pub endpoint_name: String,
    #[serde(default)]
    pub purpose: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub auth_method: AuthMethod,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    #[serde(default)]
    pub response_format: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example_response: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_url: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub required_headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_structure: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    /// Captured calls summed over merged candidates.
    #[serde(default = "one")]
    pub call_frequency: usize,
    /// Call-weighted average response time from the capture.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timing_avg_ms: Option<f64>,
    /// Number of candidates merged into this entry.
    #[serde(default = "one")]
    pub merge_count: usize,
}

fn one() -> usize {
    1
}

impl EndpointSpec {
    /// `GET api.example.com/users/{id}`, for logs.
    pub fn label(&self) -> String {
        format!("{} {}{}", self.method, self.domain, self.path)
    }

    pub fn display_name(&self) -> &str {
        if self.endpoint_name.is_empty() {
            &self.path
        } else {
            &self.endpoint_name
        }
    }

    pub fn params_in(&self, location: ParamLocation) -> impl Iterator<Item = &Parameter> {
        self.parameters.iter().filter(move |p| p.location == location)
    }
}
