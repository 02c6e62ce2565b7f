//! End-to-end runs over a capture output directory.
//!
//! `analyze`: capture → filter → chunk → extract → merge → catalog file.
//! `verify`: catalog file → sequential replay → results file.
//!
//! Only unreadable inputs are errors. Failed chunks and failed requests are
//! recorded in the artifacts and the run completes.

use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::chunker::chunk_records;
use crate::config::{RunConfig, DEFAULT_MAX_TOKENS_PER_CHUNK};
use crate::extract::{extract_all, InferenceClient, PromptContext};
use crate::filter::{filter_records, FilterConfig};
use crate::har::load_capture;
use crate::merge::merge_candidates;
use crate::report::{write_json, CatalogFile, CatalogReport, VerificationReport};
use crate::session::SessionStore;
use crate::verify::{Verifier, VerifyOptions};

pub const HAR_FILE: &str = "requests.har";
pub const COOKIES_FILE: &str = "cookies.json";
pub const CATALOG_FILE: &str = "api_endpoints.json";
pub const RESULTS_FILE: &str = "endpoint_test_results.json";

/// Relative paths are taken relative to the output directory.
fn resolve(output_dir: &Path, file: Option<&Path>, default: &str) -> PathBuf {
    match file {
        Some(f) if f.is_absolute() => f.to_path_buf(),
        Some(f) => output_dir.join(f),
        None => output_dir.join(default),
    }
}

#[derive(Debug, Clone)]
pub struct AnalyzeOptions {
    pub output_dir: PathBuf,
    pub run: RunConfig,
    pub filter: FilterConfig,
    pub max_tokens_per_chunk: usize,
    pub max_concurrent_chunks: usize,
    pub output_file: Option<PathBuf>,
}

impl AnalyzeOptions {
    /// Options with filter and chunk settings taken from the run config.
    pub fn new(output_dir: PathBuf, run: RunConfig) -> Self {
        Self {
            output_dir,
            filter: FilterConfig::from_run(&run),
            max_tokens_per_chunk: run
                .max_tokens_per_chunk
                .unwrap_or(DEFAULT_MAX_TOKENS_PER_CHUNK),
            max_concurrent_chunks: 1,
            output_file: None,
            run,
        }
    }

    pub fn catalog_path(&self) -> PathBuf {
        resolve(&self.output_dir, self.output_file.as_deref(), CATALOG_FILE)
    }
}

#[derive(Debug)]
pub struct AnalyzeOutcome {
    pub report: CatalogReport,
    pub path: PathBuf,
}

pub async fn run_analyze(
    opts: &AnalyzeOptions,
    client: Arc<dyn InferenceClient>,
) -> Result<AnalyzeOutcome> {
    let har_path = opts.output_dir.join(HAR_FILE);
    if !har_path.exists() {
        anyhow::bail!("HAR file not found: {}", har_path.display());
    }
    let records = load_capture(&har_path)?;
    let session = SessionStore::load(&opts.output_dir.join(COOKIES_FILE))?;
    tracing::info!(
        website = %opts.run.website_name,
        requests = records.len(),
        "analyzing capture"
    );

    let (kept, filter_stats) = filter_records(&records, &opts.filter);
    tracing::info!(
        kept = filter_stats.kept_count,
        removed = filter_stats.original_count - filter_stats.kept_count,
        "filtered capture"
    );

    let ctx = PromptContext::new(&opts.run.website_name, opts.run.task_description(), &session);
    let plan = chunk_records(&kept, opts.max_tokens_per_chunk, &ctx);
    let outcomes = extract_all(client, &plan, &ctx, opts.max_concurrent_chunks).await;

    let mut diagnostics = Vec::with_capacity(outcomes.len());
    let mut candidates = Vec::new();
    for outcome in outcomes {
        diagnostics.push(outcome.diagnostic);
        candidates.extend(outcome.candidates);
    }
    let endpoints = merge_candidates(candidates);

    let domains: Vec<String> = records
        .iter()
        .filter(|r| !r.domain.is_empty())
        .map(|r| r.domain.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let report = CatalogReport::new(
        &opts.run.website_name,
        opts.run.task_description(),
        filter_stats,
        diagnostics,
        endpoints,
        session.auth_cookie_names(),
        domains,
    );
    if let Some(notes) = &report.notes {
        tracing::warn!("{}", notes);
    }

    let path = opts.catalog_path();
    write_json(&path, &report)?;
    tracing::info!(
        endpoints = report.total_endpoints,
        chunks = report.chunk_stats.total_chunks,
        failed_chunks = report.chunk_stats.failed_chunks,
        "analysis complete"
    );
    Ok(AnalyzeOutcome { report, path })
}

#[derive(Debug, Clone)]
pub struct VerifyRunOptions {
    pub output_dir: PathBuf,
    pub verify: VerifyOptions,
    pub endpoints_file: Option<PathBuf>,
    pub output_file: Option<PathBuf>,
}

impl VerifyRunOptions {
    pub fn new(output_dir: PathBuf, verify: VerifyOptions) -> Self {
        Self {
            output_dir,
            verify,
            endpoints_file: None,
            output_file: None,
        }
    }

    pub fn catalog_path(&self) -> PathBuf {
        resolve(&self.output_dir, self.endpoints_file.as_deref(), CATALOG_FILE)
    }

    pub fn results_path(&self) -> PathBuf {
        resolve(&self.output_dir, self.output_file.as_deref(), RESULTS_FILE)
    }
}

#[derive(Debug)]
pub struct VerifyOutcome {
    pub report: VerificationReport,
    pub path: PathBuf,
}

/// Replays the catalog. Blocks; call from `spawn_blocking` in async code.
pub fn run_verify(opts: &VerifyRunOptions) -> Result<VerifyOutcome> {
    let catalog_path = opts.catalog_path();
    if !catalog_path.exists() {
        anyhow::bail!(
            "endpoints file not found: {} (run `harmap analyze` first)",
            catalog_path.display()
        );
    }
    let catalog = CatalogFile::load(&catalog_path)?;
    let session = SessionStore::load(&opts.output_dir.join(COOKIES_FILE))?;
    let website_name = catalog
        .website_name
        .clone()
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| "unknown".to_string());
    tracing::info!(
        website = %website_name,
        endpoints = catalog.endpoints.len(),
        delay_secs = opts.verify.delay.as_secs_f64(),
        "verifying endpoints"
    );

    let verifier = Verifier::new(opts.verify.clone(), session);
    let results = verifier.verify_all(&catalog.endpoints);
    let report = VerificationReport::new(&website_name, &opts.verify, results);

    let path = opts.results_path();
    write_json(&path, &report).context("write verification results")?;
    tracing::info!(
        total = report.total_endpoints,
        successful = report.successful_requests,
        failed = report.failed_requests,
        "verification complete"
    );
    Ok(VerifyOutcome { report, path })
}
