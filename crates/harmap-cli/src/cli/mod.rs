//! CLI for harmap.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use harmap_core::config;
use std::path::PathBuf;

use commands::{run_analyze, run_verify, AnalyzeArgs, VerifyArgs};

/// Top-level CLI for harmap.
#[derive(Debug, Parser)]
#[command(name = "harmap")]
#[command(about = "harmap: turn recorded browser traffic into a verified API endpoint catalog", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Extract an endpoint catalog from a capture directory.
    Analyze {
        /// Directory holding requests.har and cookies.json.
        #[arg(long, value_name = "DIR")]
        output_dir: PathBuf,
        /// Run configuration (JSON, or TOML with a .toml extension).
        #[arg(long, value_name = "PATH")]
        config: PathBuf,
        /// Comma-separated HTTP methods to keep (e.g. GET,POST). Overrides the run config.
        #[arg(long, value_delimiter = ',', value_name = "METHODS")]
        methods: Option<Vec<String>>,
        /// Keep only responses carrying structured data.
        #[arg(long)]
        data_only: bool,
        /// Keep static assets (scripts, styles, fonts, media).
        #[arg(long)]
        all_traffic: bool,
        /// Token ceiling for one extraction chunk.
        #[arg(long, value_name = "N")]
        max_tokens_per_chunk: Option<usize>,
        /// Catalog filename (relative to the output directory unless absolute).
        #[arg(long, value_name = "FILE")]
        output_file: Option<PathBuf>,
    },

    /// Replay catalog endpoints with the captured session and record results.
    Verify {
        /// Directory holding the catalog and cookies.json.
        #[arg(long, value_name = "DIR")]
        output_dir: PathBuf,
        /// Per-request timeout in seconds (default from config).
        #[arg(long, value_name = "SECS")]
        timeout: Option<u64>,
        /// Pause between requests in seconds (default from config).
        #[arg(long, value_name = "SECS")]
        delay: Option<f64>,
        /// Catalog to read (default api_endpoints.json).
        #[arg(long, value_name = "FILE")]
        endpoints_file: Option<PathBuf>,
        /// Results filename (default endpoint_test_results.json).
        #[arg(long, value_name = "FILE")]
        output_file: Option<PathBuf>,
    },
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Analyze {
                output_dir,
                config,
                methods,
                data_only,
                all_traffic,
                max_tokens_per_chunk,
                output_file,
            } => {
                let args = AnalyzeArgs {
                    output_dir,
                    config,
                    methods,
                    data_only,
                    all_traffic,
                    max_tokens_per_chunk,
                    output_file,
                };
                run_analyze(&cfg, args).await?;
            }
            CliCommand::Verify {
                output_dir,
                timeout,
                delay,
                endpoints_file,
                output_file,
            } => {
                let args = VerifyArgs {
                    output_dir,
                    timeout,
                    delay,
                    endpoints_file,
                    output_file,
                };
                run_verify(&cfg, args).await?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
