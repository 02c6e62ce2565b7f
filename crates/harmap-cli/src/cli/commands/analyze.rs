//! `harmap analyze` – capture directory to endpoint catalog.

use anyhow::Result;
use harmap_core::config::{HarmapConfig, RunConfig};
use harmap_core::extract::ChatClient;
use harmap_core::pipeline::{self, AnalyzeOptions};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug)]
pub struct AnalyzeArgs {
    pub output_dir: PathBuf,
    pub config: PathBuf,
    pub methods: Option<Vec<String>>,
    pub data_only: bool,
    pub all_traffic: bool,
    pub max_tokens_per_chunk: Option<usize>,
    pub output_file: Option<PathBuf>,
}

/// Flags override the run config; boolean flags can only switch a filter on.
fn apply_overrides(mut run: RunConfig, args: &AnalyzeArgs) -> RunConfig {
    if let Some(methods) = &args.methods {
        run.methods = Some(methods.clone());
    }
    run.data_only |= args.data_only;
    run.include_static |= args.all_traffic;
    if args.max_tokens_per_chunk.is_some() {
        run.max_tokens_per_chunk = args.max_tokens_per_chunk;
    }
    run
}

fn build_options(cfg: &HarmapConfig, run: RunConfig, args: AnalyzeArgs) -> AnalyzeOptions {
    let run = apply_overrides(run, &args);
    let mut opts = AnalyzeOptions::new(args.output_dir, run);
    opts.max_concurrent_chunks = cfg.max_concurrent_chunks.max(1);
    opts.output_file = args.output_file;
    opts
}

pub async fn run_analyze(cfg: &HarmapConfig, args: AnalyzeArgs) -> Result<()> {
    let run = RunConfig::load(&args.config)?;
    let opts = build_options(cfg, run, args);
    let client = ChatClient::from_config(&cfg.inference())?;
    tracing::info!(model = client.model(), "using inference model");

    let outcome = pipeline::run_analyze(&opts, Arc::new(client)).await?;
    let report = &outcome.report;
    println!(
        "{}: {} of {} requests kept, {} chunk(s), {} endpoint(s)",
        report.website_name,
        report.filtered_requests,
        report.total_requests,
        report.chunk_stats.total_chunks,
        report.total_endpoints
    );
    if let Some(notes) = &report.notes {
        println!("  note: {notes}");
    }
    for endpoint in &report.endpoints {
        println!("  {} {}", endpoint.label(), endpoint.display_name());
    }
    println!("Catalog written to {}", outcome.path.display());
    Ok(())
}
