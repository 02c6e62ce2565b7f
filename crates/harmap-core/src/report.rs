//! Summary statistics and the JSON artifacts written by a run.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

use crate::endpoint::{AuthMethod, EndpointSpec};
use crate::extract::ChunkDiagnostic;
use crate::filter::FilterStats;
use crate::verify::{Outcome, VerificationResult, VerifyOptions};

/// Required-header names containing any of these are reported as auth headers.
const AUTH_HEADER_HINTS: &[&str] = &["auth", "token", "key", "csrf", "bearer"];

/// Counts per verification outcome.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub success: usize,
    pub client_error: usize,
    pub server_error: usize,
    pub transport_error: usize,
    pub timeout: usize,
}

impl Summary {
    pub fn failed(&self) -> usize {
        self.total - self.success
    }

    /// Percentage of successful requests; 0 for an empty run.
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        (self.success as f64 * 10_000.0 / self.total as f64).round() / 100.0
    }

    pub fn count(&self, outcome: Outcome) -> usize {
        match outcome {
            Outcome::Success => self.success,
            Outcome::ClientError => self.client_error,
            Outcome::ServerError => self.server_error,
            Outcome::TransportError => self.transport_error,
            Outcome::Timeout => self.timeout,
        }
    }
}

pub fn summarize(results: &[VerificationResult]) -> Summary {
    let mut s = Summary {
        total: results.len(),
        ..Summary::default()
    };
    for r in results {
        match r.outcome {
            Outcome::Success => s.success += 1,
            Outcome::ClientError => s.client_error += 1,
            Outcome::ServerError => s.server_error += 1,
            Outcome::TransportError => s.transport_error += 1,
            Outcome::Timeout => s.timeout += 1,
        }
    }
    s
}

/// Local time in the `2025-12-05T09:43:18` form used by both artifacts.
pub fn timestamp() -> String {
    chrono::Local::now().format("%Y-%m-%dT%H:%M:%S").to_string()
}

/// `endpoint_test_results.json`.
#[derive(Debug, Clone, Serialize)]
pub struct VerificationReport {
    pub website_name: String,
    pub test_timestamp: String,
    pub total_endpoints: usize,
    pub successful_requests: usize,
    pub failed_requests: usize,
    pub client_errors: usize,
    pub server_errors: usize,
    pub transport_errors: usize,
    pub timeouts: usize,
    pub success_rate: f64,
    pub timeout_seconds: f64,
    pub delay_seconds: f64,
    pub results: Vec<VerificationResult>,
}

impl VerificationReport {
    pub fn new(website_name: &str, options: &VerifyOptions, results: Vec<VerificationResult>) -> Self {
        let s = summarize(&results);
        Self {
            website_name: website_name.to_string(),
            test_timestamp: timestamp(),
            total_endpoints: s.total,
            successful_requests: s.success,
            failed_requests: s.failed(),
            client_errors: s.client_error,
            server_errors: s.server_error,
            transport_errors: s.transport_error,
            timeouts: s.timeout,
            success_rate: s.success_rate(),
            timeout_seconds: options.timeout.as_secs_f64(),
            delay_seconds: options.delay.as_secs_f64(),
            results,
        }
    }

    pub fn summary(&self) -> Summary {
        summarize(&self.results)
    }
}

/// Chunk-level counters for the catalog artifact.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ChunkStats {
    pub total_chunks: usize,
    pub failed_chunks: usize,
    pub oversized_chunks: usize,
    pub skipped_items: usize,
}

impl ChunkStats {
    pub fn from_diagnostics(diagnostics: &[ChunkDiagnostic]) -> Self {
        Self {
            total_chunks: diagnostics.len(),
            failed_chunks: diagnostics.iter().filter(|d| d.failed()).count(),
            oversized_chunks: diagnostics.iter().filter(|d| d.oversized).count(),
            skipped_items: diagnostics.iter().map(|d| d.skipped_items).sum(),
        }
    }
}

/// `api_endpoints.json`.
#[derive(Debug, Clone, Serialize)]
pub struct CatalogReport {
    pub website_name: String,
    pub analysis_timestamp: String,
    pub original_task: String,
    pub total_requests: usize,
    pub filtered_requests: usize,
    pub filter_stats: FilterStats,
    pub chunk_stats: ChunkStats,
    pub chunk_diagnostics: Vec<ChunkDiagnostic>,
    pub endpoints: Vec<EndpointSpec>,
    pub total_endpoints: usize,
    pub auth_methods_detected: Vec<AuthMethod>,
    pub auth_cookie_names: Vec<String>,
    pub auth_headers: Vec<String>,
    pub domains_accessed: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl CatalogReport {
    pub fn new(
        website_name: &str,
        task: &str,
        filter_stats: FilterStats,
        chunk_diagnostics: Vec<ChunkDiagnostic>,
        endpoints: Vec<EndpointSpec>,
        auth_cookie_names: Vec<String>,
        domains_accessed: Vec<String>,
    ) -> Self {
        let auth_methods_detected: Vec<AuthMethod> = endpoints
            .iter()
            .map(|e| e.auth_method)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let auth_headers: Vec<String> = endpoints
            .iter()
            .flat_map(|e| e.required_headers.keys())
            .filter(|name| {
                let lower = name.to_ascii_lowercase();
                AUTH_HEADER_HINTS.iter().any(|hint| lower.contains(hint))
            })
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let chunk_stats = ChunkStats::from_diagnostics(&chunk_diagnostics);
        let notes = (chunk_stats.failed_chunks > 0).then(|| {
            format!(
                "{} of {} chunks failed extraction; their endpoints are missing from this catalog",
                chunk_stats.failed_chunks, chunk_stats.total_chunks
            )
        });

        Self {
            website_name: website_name.to_string(),
            analysis_timestamp: timestamp(),
            original_task: task.to_string(),
            total_requests: filter_stats.original_count,
            filtered_requests: filter_stats.kept_count,
            filter_stats,
            chunk_stats,
            chunk_diagnostics,
            total_endpoints: endpoints.len(),
            endpoints,
            auth_methods_detected,
            auth_cookie_names,
            auth_headers,
            domains_accessed,
            notes,
        }
    }
}

/// The parts of a catalog file the verifier needs. Tolerates extra fields,
/// so older catalogs load too.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogFile {
    #[serde(default)]
    pub website_name: Option<String>,
    #[serde(default)]
    pub endpoints: Vec<EndpointSpec>,
}

impl CatalogFile {
    pub fn load(path: &Path) -> Result<Self> {
        let bytes =
            std::fs::read(path).with_context(|| format!("read catalog: {}", path.display()))?;
        serde_json::from_slice(&bytes).with_context(|| format!("parse catalog: {}", path.display()))
    }
}

/// Writes `value` as pretty JSON, creating parent directories.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create directory: {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json).with_context(|| format!("write {}", path.display()))?;
    tracing::info!("wrote {}", path.display());
    Ok(())
}
