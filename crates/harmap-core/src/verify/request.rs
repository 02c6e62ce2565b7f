//! Turns a catalog entry into a concrete HTTP request.

use std::collections::BTreeMap;

use crate::endpoint::path::{key_path, segments, Segment};
use crate::endpoint::{EndpointSpec, HttpMethod, ParamLocation};

pub const DEFAULT_ACCEPT: &str = "application/json, text/html, */*";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RequestError {
    #[error("endpoint has neither a domain nor a full URL")]
    NoHost,
    #[error("cannot build URL: {0}")]
    InvalidUrl(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedRequest {
    pub method: HttpMethod,
    pub url: String,
    /// Lowercased host, used for cookie matching.
    pub host: String,
    /// Percent-encoded request path, used for cookie matching.
    pub path: String,
    /// Header names are unique (case-insensitive); later sources override earlier ones.
    pub headers: Vec<(String, String)>,
    /// JSON body for POST/PUT/PATCH with body parameters.
    pub body: Option<String>,
}

impl PreparedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

fn set_header(headers: &mut Vec<(String, String)>, name: &str, value: &str) {
    let name = name.trim();
    if name.is_empty() {
        return;
    }
    match headers.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(name)) {
        Some(slot) => slot.1 = value.trim().to_string(),
        None => headers.push((name.to_string(), value.trim().to_string())),
    }
}

/// Builds the request for `spec`.
///
/// Origin comes from `full_url` when present, else `https://{domain}`. Path
/// placeholders take the example value of the same-named path parameter, then
/// (for `{id}`) the first path parameter with an example, then the segment at
/// the same position of `full_url`. Placeholders that stay unresolved are left
/// out of the URL.
pub fn build_request(spec: &EndpointSpec, user_agent: &str) -> Result<PreparedRequest, RequestError> {
    let example = spec
        .full_url
        .as_deref()
        .and_then(|u| url::Url::parse(u).ok())
        .filter(|u| u.host_str().is_some());

    let mut url = match &example {
        Some(ex) => {
            let mut origin = ex.clone();
            origin.set_path("/");
            origin.set_query(None);
            origin.set_fragment(None);
            origin
        }
        None => {
            let domain = spec.domain.trim();
            if domain.is_empty() {
                return Err(RequestError::NoHost);
            }
            url::Url::parse(&format!("https://{domain}/"))
                .map_err(|e| RequestError::InvalidUrl(format!("https://{domain}/: {e}")))?
        }
    };

    let example_segments: Vec<String> = example
        .as_ref()
        .and_then(|u| u.path_segments())
        .map(|segs| segs.filter(|s| !s.is_empty()).map(str::to_string).collect())
        .unwrap_or_default();
    let template: Vec<Segment<'_>> = segments(&spec.path).collect();
    let positional = example_segments.len() == template.len();

    let mut path_values: Vec<String> = Vec::with_capacity(template.len());
    for (i, seg) in template.iter().enumerate() {
        match seg {
            Segment::Literal(lit) => path_values.push((*lit).to_string()),
            Segment::Placeholder(name) => {
                let value = path_param(spec, name)
                    .or_else(|| positional.then(|| decode(&example_segments[i])));
                match value {
                    Some(v) => path_values.push(v),
                    None => tracing::debug!(
                        endpoint = %spec.label(),
                        placeholder = %name,
                        "unresolved path placeholder; segment omitted"
                    ),
                }
            }
        }
    }
    url.path_segments_mut()
        .map_err(|_| RequestError::InvalidUrl("URL cannot carry a path".to_string()))?
        .clear()
        .extend(path_values.iter());

    let mut query: Vec<(String, String)> = spec
        .params_in(ParamLocation::Query)
        .filter_map(|p| {
            p.example_value
                .as_ref()
                .filter(|v| !v.is_empty())
                .map(|v| (p.name.clone(), v.clone()))
        })
        .collect();
    if let Some(ex) = &example {
        if key_path(ex.path()) == key_path(&spec.path) {
            for (k, v) in ex.query_pairs() {
                if !query.iter().any(|(name, _)| *name == k) {
                    query.push((k.into_owned(), v.into_owned()));
                }
            }
        }
    }
    if !query.is_empty() {
        url.query_pairs_mut().extend_pairs(query.iter());
    }

    let mut headers: Vec<(String, String)> = Vec::new();
    set_header(&mut headers, "User-Agent", user_agent);
    set_header(&mut headers, "Accept", DEFAULT_ACCEPT);
    for (name, value) in &spec.required_headers {
        set_header(&mut headers, name, value);
    }
    for p in spec.params_in(ParamLocation::Header) {
        if let Some(v) = p.example_value.as_deref() {
            set_header(&mut headers, &p.name, v);
        }
    }

    let body = if spec.method.has_body() {
        let fields: BTreeMap<&str, &str> = spec
            .params_in(ParamLocation::Body)
            .map(|p| (p.name.as_str(), p.example_value.as_deref().unwrap_or("")))
            .collect();
        if fields.is_empty() {
            None
        } else {
            set_header(&mut headers, "Content-Type", "application/json");
            serde_json::to_string(&fields).ok()
        }
    } else {
        None
    };

    Ok(PreparedRequest {
        method: spec.method,
        host: url.host_str().unwrap_or_default().to_ascii_lowercase(),
        path: url.path().to_string(),
        url: url.to_string(),
        headers,
        body,
    })
}

fn path_param(spec: &EndpointSpec, name: &str) -> Option<String> {
    let with_example = |p: &&crate::endpoint::Parameter| {
        p.example_value.as_deref().map_or(false, |v| !v.is_empty())
    };
    spec.params_in(ParamLocation::Path)
        .filter(with_example)
        .find(|p| p.name == name)
        .or_else(|| {
            (name == "id")
                .then(|| spec.params_in(ParamLocation::Path).find(with_example))
                .flatten()
        })
        .and_then(|p| p.example_value.clone())
}

/// Path segments from a parsed URL are percent-encoded; store them decoded so
/// they are not encoded twice when pushed back.
fn decode(segment: &str) -> String {
    url::form_urlencoded::parse(format!("x={}", segment.replace('+', "%2B").replace('&', "%26")).as_bytes())
        .next()
        .map(|(_, v)| v.into_owned())
        .unwrap_or_else(|| segment.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::{AuthMethod, Parameter};

    fn spec(method: HttpMethod, domain: &str, path: &str) -> EndpointSpec {
        EndpointSpec {
            method,
            path: path.to_string(),
            domain: domain.to_string(),
            endpoint_name: String::new(),
            purpose: String::new(),
            category: String::new(),
            auth_method: AuthMethod::None,
            parameters: vec![],
            response_format: String::new(),
            example_response: None,
            full_url: None,
            required_headers: BTreeMap::new(),
            response_structure: None,
            status_code: None,
            call_frequency: 1,
            timing_avg_ms: None,
            merge_count: 1,
        }
    }

    fn param(name: &str, location: ParamLocation, example: Option<&str>) -> Parameter {
        Parameter {
            name: name.to_string(),
            location,
            required: true,
            example_value: example.map(str::to_string),
            param_type: None,
        }
    }

    #[test]
    fn origin_from_domain_and_named_path_param() {
        let mut s = spec(HttpMethod::Get, "ably.com", "/apps/{app_id}/stats");
        s.parameters = vec![
            param("app_id", ParamLocation::Path, Some("42")),
            param("unit", ParamLocation::Query, Some("hour")),
            param("empty", ParamLocation::Query, None),
        ];
        let req = build_request(&s, "ua").unwrap();
        assert_eq!(req.url, "https://ably.com/apps/42/stats?unit=hour");
        assert_eq!(req.host, "ably.com");
        assert_eq!(req.path, "/apps/42/stats");
        assert_eq!(req.header("user-agent"), Some("ua"));
        assert_eq!(req.header("Accept"), Some(DEFAULT_ACCEPT));
        assert!(req.body.is_none());
    }

    #[test]
    fn origin_and_placeholder_from_full_url() {
        let mut s = spec(HttpMethod::Get, "ably.com", "/users/{id}/profile");
        s.full_url = Some("http://127.0.0.1:8080/users/7/profile?tab=all".into());
        let req = build_request(&s, "ua").unwrap();
        assert_eq!(req.url, "http://127.0.0.1:8080/users/7/profile?tab=all");
    }

    #[test]
    fn generic_id_uses_first_path_param() {
        let mut s = spec(HttpMethod::Delete, "a.com", "/items/{id}");
        s.parameters = vec![param("item_id", ParamLocation::Path, Some("9"))];
        let req = build_request(&s, "ua").unwrap();
        assert_eq!(req.url, "https://a.com/items/9");
    }

    #[test]
    fn unresolved_placeholder_is_omitted() {
        let s = spec(HttpMethod::Get, "a.com", "/orgs/{org}/members");
        let req = build_request(&s, "ua").unwrap();
        assert_eq!(req.url, "https://a.com/orgs/members");
    }

    #[test]
    fn body_and_header_params() {
        let mut s = spec(HttpMethod::Post, "a.com", "/api/login");
        s.parameters = vec![
            param("email", ParamLocation::Body, Some("a@b.c")),
            param("remember", ParamLocation::Body, Some("true")),
            param("X-CSRF-Token", ParamLocation::Header, Some("tok")),
        ];
        s.required_headers
            .insert("x-csrf-token".into(), "stale".into());
        let req = build_request(&s, "ua").unwrap();
        let body: serde_json::Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(body["email"], "a@b.c");
        assert_eq!(body["remember"], "true");
        assert_eq!(req.header("content-type"), Some("application/json"));
        assert_eq!(req.header("X-CSRF-TOKEN"), Some("tok"));
        assert_eq!(
            req.headers
                .iter()
                .filter(|(k, _)| k.eq_ignore_ascii_case("x-csrf-token"))
                .count(),
            1
        );
    }

    #[test]
    fn get_never_sends_body() {
        let mut s = spec(HttpMethod::Get, "a.com", "/search");
        s.parameters = vec![param("q", ParamLocation::Body, Some("x"))];
        assert!(build_request(&s, "ua").unwrap().body.is_none());
    }

    #[test]
    fn missing_host_is_an_error() {
        let s = spec(HttpMethod::Get, "", "/x");
        assert_eq!(build_request(&s, "ua"), Err(RequestError::NoHost));
    }

    #[test]
    fn query_values_are_encoded() {
        let mut s = spec(HttpMethod::Get, "a.com", "/search");
        s.parameters = vec![param("q", ParamLocation::Query, Some("red shoes&more"))];
        let req = build_request(&s, "ua").unwrap();
        assert_eq!(req.url, "https://a.com/search?q=red+shoes%26more");
    }
}
