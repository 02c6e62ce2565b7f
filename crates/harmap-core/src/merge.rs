//! Cross-chunk merge of candidate endpoints into the canonical catalog.
//!
//! Entries are identified by (method, lowercased domain, key path). Conflicts
//! between candidates sharing a key are resolved field by field; the result
//! does not depend on which chunk finished first, only on chunk order.

use std::collections::HashMap;

use crate::endpoint::path::{key_path, normalize_display_path};
use crate::endpoint::{CandidateEndpoint, EndpointSpec, HttpMethod, Parameter};

/// Identity of a catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EndpointKey {
    pub method: HttpMethod,
    pub domain: String,
    pub path: String,
}

impl EndpointKey {
    pub fn new(method: HttpMethod, domain: &str, path: &str) -> Self {
        Self {
            method,
            domain: domain.trim().to_ascii_lowercase(),
            path: key_path(path),
        }
    }

    pub fn of(spec: &EndpointSpec) -> Self {
        Self::new(spec.method, &spec.domain, &spec.path)
    }
}

/// Folds candidates (in chunk order) into a deduplicated catalog sorted by
/// domain, path, method.
pub fn merge_candidates<I>(candidates: I) -> Vec<EndpointSpec>
where
    I: IntoIterator<Item = CandidateEndpoint>,
{
    let mut index: HashMap<EndpointKey, usize> = HashMap::new();
    let mut catalog: Vec<EndpointSpec> = Vec::new();
    let mut seen = 0usize;

    for candidate in candidates {
        seen += 1;
        let key = EndpointKey::new(candidate.method, &candidate.domain, &candidate.path);
        match index.get(&key) {
            Some(&i) => absorb(&mut catalog[i], candidate),
            None => {
                index.insert(key, catalog.len());
                catalog.push(first_spec(candidate));
            }
        }
    }

    catalog.sort_by(|a, b| {
        (a.domain.as_str(), a.path.as_str(), a.method).cmp(&(
            b.domain.as_str(),
            b.path.as_str(),
            b.method,
        ))
    });
    tracing::debug!(
        candidates = seen,
        endpoints = catalog.len(),
        "merged candidate endpoints"
    );
    catalog
}

fn first_spec(c: CandidateEndpoint) -> EndpointSpec {
    let mut parameters: Vec<Parameter> = Vec::with_capacity(c.parameters.len());
    for p in c.parameters {
        merge_parameter(&mut parameters, p);
    }
    EndpointSpec {
        method: c.method,
        path: normalize_display_path(&c.path),
        domain: c.domain.trim().to_ascii_lowercase(),
        endpoint_name: c.endpoint_name,
        purpose: c.purpose,
        category: c.category,
        auth_method: c.auth_method,
        parameters,
        response_format: c.response_format,
        example_response: c.example_response.filter(|s| !s.is_empty()),
        full_url: c.full_url.filter(|s| !s.is_empty()),
        required_headers: c.required_headers,
        response_structure: c.response_structure.filter(|s| !s.is_empty()),
        status_code: c.status_code,
        call_frequency: c.call_frequency.max(1),
        timing_avg_ms: c.timing_avg_ms,
        merge_count: 1,
    }
}

fn absorb(spec: &mut EndpointSpec, c: CandidateEndpoint) {
    spec.merge_count += 1;

    if c.purpose.trim().len() > spec.purpose.trim().len() {
        spec.purpose = c.purpose;
    }
    if c.auth_method.rank() > spec.auth_method.rank() {
        spec.auth_method = c.auth_method;
    }
    fill_if_empty(&mut spec.endpoint_name, c.endpoint_name);
    fill_if_empty(&mut spec.category, c.category);
    fill_if_empty(&mut spec.response_format, c.response_format);
    if spec.example_response.is_none() {
        spec.example_response = c.example_response.filter(|s| !s.is_empty());
    }
    if spec.full_url.is_none() {
        spec.full_url = c.full_url.filter(|s| !s.is_empty());
    }
    if spec.response_structure.is_none() {
        spec.response_structure = c.response_structure.filter(|s| !s.is_empty());
    }
    if spec.status_code.is_none() {
        spec.status_code = c.status_code;
    }
    for (name, value) in c.required_headers {
        spec.required_headers.entry(name).or_insert(value);
    }
    for p in c.parameters {
        merge_parameter(&mut spec.parameters, p);
    }

    // Weighted by the frequencies seen before this candidate is counted.
    let incoming = c.call_frequency.max(1);
    spec.timing_avg_ms = match (spec.timing_avg_ms, c.timing_avg_ms) {
        (Some(a), Some(b)) => {
            let (fa, fb) = (spec.call_frequency as f64, incoming as f64);
            Some((a * fa + b * fb) / (fa + fb))
        }
        (a, b) => a.or(b),
    };
    spec.call_frequency += incoming;
}

fn fill_if_empty(slot: &mut String, value: String) {
    if slot.trim().is_empty() && !value.trim().is_empty() {
        *slot = value;
    }
}

/// Union by name: required only while every contributor says so; first
/// non-empty example and type win.
fn merge_parameter(params: &mut Vec<Parameter>, p: Parameter) {
    match params.iter_mut().find(|q| q.name == p.name) {
        Some(existing) => {
            existing.required = existing.required && p.required;
            if existing.example_value.as_deref().map_or(true, str::is_empty) {
                if let Some(v) = p.example_value.filter(|v| !v.is_empty()) {
                    existing.example_value = Some(v);
                }
            }
            if existing.param_type.is_none() {
                existing.param_type = p.param_type;
            }
        }
        None => params.push(p),
    }
}
