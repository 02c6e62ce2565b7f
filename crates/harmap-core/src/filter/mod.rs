//! Noise filter: decides which captured exchanges are worth describing as API endpoints.
//!
//! Rules are evaluated in a fixed order and the first match determines the
//! exclusion reason. Classification depends only on the record and the
//! [`FilterConfig`] passed in.

mod lists;
mod rules;

use serde::Serialize;
use std::collections::BTreeMap;

use crate::config::RunConfig;
use crate::har::TrafficRecord;

/// Filter settings for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterConfig {
    /// HTTP method allow-list (uppercased). Empty = all methods.
    pub methods: Vec<String>,
    /// Keep only responses carrying structured data.
    pub data_only: bool,
    /// Keep static assets (scripts, styles, fonts, media).
    pub include_static: bool,
}

impl FilterConfig {
    pub fn from_run(run: &RunConfig) -> Self {
        Self {
            methods: normalize_methods(run.methods.as_deref().unwrap_or_default()),
            data_only: run.data_only,
            include_static: run.include_static,
        }
    }
}

/// Uppercases, trims and dedups a method list, dropping blanks.
pub fn normalize_methods<S: AsRef<str>>(methods: &[S]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for m in methods {
        let m = m.as_ref().trim().to_ascii_uppercase();
        if !m.is_empty() && !out.contains(&m) {
            out.push(m);
        }
    }
    out
}

/// Why a record was dropped. Variant order is rule evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExclusionReason {
    FailedRequest,
    BrowserInternal,
    TrackingDomain,
    TrackingPattern,
    TrackingPixel,
    StaticAsset,
    NonData,
    MethodNotAllowed,
}

impl ExclusionReason {
    pub const ALL: [ExclusionReason; 8] = [
        ExclusionReason::FailedRequest,
        ExclusionReason::BrowserInternal,
        ExclusionReason::TrackingDomain,
        ExclusionReason::TrackingPattern,
        ExclusionReason::TrackingPixel,
        ExclusionReason::StaticAsset,
        ExclusionReason::NonData,
        ExclusionReason::MethodNotAllowed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ExclusionReason::FailedRequest => "failed_request",
            ExclusionReason::BrowserInternal => "browser_internal",
            ExclusionReason::TrackingDomain => "tracking_domain",
            ExclusionReason::TrackingPattern => "tracking_pattern",
            ExclusionReason::TrackingPixel => "tracking_pixel",
            ExclusionReason::StaticAsset => "static_asset",
            ExclusionReason::NonData => "non_data",
            ExclusionReason::MethodNotAllowed => "method_not_allowed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Keep,
    Exclude(ExclusionReason),
}

impl Verdict {
    pub fn is_keep(self) -> bool {
        matches!(self, Verdict::Keep)
    }

    pub fn reason(self) -> Option<ExclusionReason> {
        match self {
            Verdict::Keep => None,
            Verdict::Exclude(r) => Some(r),
        }
    }
}

/// Classifies one record; first matching rule wins.
pub fn classify(record: &TrafficRecord, cfg: &FilterConfig) -> Verdict {
    use ExclusionReason::*;

    if rules::is_failed_request(record) {
        return Verdict::Exclude(FailedRequest);
    }
    if rules::is_browser_internal(record) {
        return Verdict::Exclude(BrowserInternal);
    }
    if rules::is_tracking_domain(record) {
        return Verdict::Exclude(TrackingDomain);
    }
    if rules::is_tracking_pattern(record) {
        return Verdict::Exclude(TrackingPattern);
    }
    if rules::is_tracking_pixel(record) {
        return Verdict::Exclude(TrackingPixel);
    }
    if !cfg.include_static && rules::is_static_asset(record) {
        return Verdict::Exclude(StaticAsset);
    }
    if cfg.data_only && !rules::is_data_response(record) {
        return Verdict::Exclude(NonData);
    }
    if !rules::method_allowed(record, &cfg.methods) {
        return Verdict::Exclude(MethodNotAllowed);
    }
    Verdict::Keep
}

/// Counts produced by [`filter_records`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterStats {
    pub original_count: usize,
    pub kept_count: usize,
    /// Every reason is present, zero when unused.
    pub removed_by_category: BTreeMap<String, usize>,
}

impl FilterStats {
    fn new(original_count: usize) -> Self {
        Self {
            original_count,
            kept_count: 0,
            removed_by_category: ExclusionReason::ALL
                .iter()
                .map(|r| (r.as_str().to_string(), 0))
                .collect(),
        }
    }

    pub fn removed(&self, reason: ExclusionReason) -> usize {
        self.removed_by_category
            .get(reason.as_str())
            .copied()
            .unwrap_or(0)
    }
}

/// Applies [`classify`] to every record, keeping capture order.
pub fn filter_records<'a>(
    records: &'a [TrafficRecord],
    cfg: &FilterConfig,
) -> (Vec<&'a TrafficRecord>, FilterStats) {
    let mut stats = FilterStats::new(records.len());
    let mut kept = Vec::new();
    for record in records {
        match classify(record, cfg) {
            Verdict::Keep => kept.push(record),
            Verdict::Exclude(reason) => {
                tracing::trace!(url = %record.url, reason = reason.as_str(), "excluded");
                *stats
                    .removed_by_category
                    .entry(reason.as_str().to_string())
                    .or_insert(0) += 1;
            }
        }
    }
    stats.kept_count = kept.len();
    (kept, stats)
}
