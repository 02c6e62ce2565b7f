//! Individual noise predicates. Each looks at one aspect of a record.

use regex::Regex;
use std::sync::OnceLock;

use super::lists::{
    API_PATH_HINTS, BROWSER_INTERNAL_PREFIXES, PIXEL_MAX_BYTES, STATIC_EXTENSIONS,
    STATIC_MIME_PREFIXES, STRUCTURED_MIME_HINTS, TRACKING_DOMAINS, TRACKING_PATH_PATTERNS,
};
use crate::har::TrafficRecord;
use crate::session::domain_matches;

fn tracking_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        TRACKING_PATH_PATTERNS
            .iter()
            .filter_map(|p| Regex::new(p).ok())
            .collect()
    })
}

/// No response, or a 5xx whose body is too short to describe anything.
pub(super) fn is_failed_request(record: &TrafficRecord) -> bool {
    match &record.response {
        None => true,
        Some(r) if r.status >= 500 => r.body.as_deref().map_or(true, |b| b.len() < 10),
        Some(_) => false,
    }
}

pub(super) fn is_browser_internal(record: &TrafficRecord) -> bool {
    let url = record.url.trim_start().to_ascii_lowercase();
    BROWSER_INTERNAL_PREFIXES
        .iter()
        .any(|prefix| url.starts_with(prefix))
}

pub(super) fn is_tracking_domain(record: &TrafficRecord) -> bool {
    !record.domain.is_empty()
        && TRACKING_DOMAINS
            .iter()
            .any(|d| domain_matches(&record.domain, d))
}

pub(super) fn is_tracking_pattern(record: &TrafficRecord) -> bool {
    let path = record.path.to_ascii_lowercase();
    tracking_patterns().iter().any(|re| re.is_match(&path))
}

pub(super) fn is_tracking_pixel(record: &TrafficRecord) -> bool {
    let Some(response) = &record.response else {
        return false;
    };
    let mime = response.content_type.as_str();
    if mime == "application/x-unknown" {
        return true;
    }
    (mime == "image/gif" || mime == "image/png") && response.body_size < PIXEL_MAX_BYTES
}

pub(super) fn is_static_asset(record: &TrafficRecord) -> bool {
    let path = record.path.to_ascii_lowercase();
    if STATIC_EXTENSIONS.iter().any(|ext| path.ends_with(ext)) {
        return true;
    }
    let mime = record.content_type();
    !mime.is_empty() && STATIC_MIME_PREFIXES.iter().any(|p| mime.starts_with(p))
}

/// Structured-data response, or an untyped response on an API-shaped path.
pub(super) fn is_data_response(record: &TrafficRecord) -> bool {
    let mime = record.content_type();
    let is_html = mime.contains("html");
    if !is_html && STRUCTURED_MIME_HINTS.iter().any(|h| mime.contains(h)) {
        return true;
    }
    if is_html || mime.starts_with("text/plain") {
        return false;
    }
    let path = record.path.to_ascii_lowercase();
    API_PATH_HINTS.iter().any(|h| path.contains(h))
}

pub(super) fn method_allowed(record: &TrafficRecord, methods: &[String]) -> bool {
    methods.is_empty() || methods.iter().any(|m| m.eq_ignore_ascii_case(&record.method))
}
