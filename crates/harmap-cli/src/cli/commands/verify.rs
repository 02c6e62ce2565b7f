//! `harmap verify` – replay the catalog and record results.

use anyhow::{Context, Result};
use harmap_core::config::{delay_from_secs, HarmapConfig};
use harmap_core::pipeline::{self, VerifyRunOptions};
use harmap_core::verify::{Outcome, VerifyOptions};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug)]
pub struct VerifyArgs {
    pub output_dir: PathBuf,
    pub timeout: Option<u64>,
    pub delay: Option<f64>,
    pub endpoints_file: Option<PathBuf>,
    pub output_file: Option<PathBuf>,
}

fn build_options(cfg: &HarmapConfig, args: VerifyArgs) -> Result<VerifyRunOptions> {
    let mut verify = VerifyOptions::from_config(cfg)?;
    if let Some(secs) = args.timeout {
        verify.timeout = Duration::from_secs(secs.max(1));
    }
    if let Some(secs) = args.delay {
        verify.delay = delay_from_secs(secs).context("invalid --delay value")?;
    }
    let mut opts = VerifyRunOptions::new(args.output_dir, verify);
    opts.endpoints_file = args.endpoints_file;
    opts.output_file = args.output_file;
    Ok(opts)
}

pub async fn run_verify(cfg: &HarmapConfig, args: VerifyArgs) -> Result<()> {
    let opts = build_options(cfg, args)?;
    let outcome = tokio::task::spawn_blocking(move || pipeline::run_verify(&opts))
        .await
        .context("verification task panicked")??;

    let report = &outcome.report;
    println!(
        "{}: {}/{} endpoints succeeded ({:.2}%)",
        report.website_name,
        report.successful_requests,
        report.total_endpoints,
        report.success_rate
    );
    let summary = report.summary();
    for kind in Outcome::ALL {
        let n = summary.count(kind);
        if n > 0 && !kind.is_success() {
            println!("  {kind}: {n}");
        }
    }
    println!("Results written to {}", outcome.path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, CliCommand};
    use clap::Parser;

    fn args() -> VerifyArgs {
        VerifyArgs {
            output_dir: PathBuf::from("out"),
            timeout: None,
            delay: None,
            endpoints_file: None,
            output_file: None,
        }
    }

    #[test]
    fn defaults_come_from_config() {
        let cfg = HarmapConfig {
            verify_timeout_secs: 20,
            verify_delay_secs: 0.25,
            ..HarmapConfig::default()
        };
        let opts = build_options(&cfg, args()).unwrap();
        assert_eq!(opts.verify.timeout, Duration::from_secs(20));
        assert_eq!(opts.verify.delay, Duration::from_millis(250));
        assert_eq!(opts.catalog_path(), PathBuf::from("out/api_endpoints.json"));
    }

    #[test]
    fn flags_override_config() {
        let a = VerifyArgs {
            timeout: Some(0),
            delay: Some(2.5),
            endpoints_file: Some(PathBuf::from("other.json")),
            ..args()
        };
        let opts = build_options(&HarmapConfig::default(), a).unwrap();
        assert_eq!(opts.verify.timeout, Duration::from_secs(1));
        assert_eq!(opts.verify.delay, Duration::from_millis(2500));
        assert_eq!(opts.catalog_path(), PathBuf::from("out/other.json"));
    }

    #[test]
    fn infinite_delay_flag_is_an_error() {
        let cli = Cli::try_parse_from(["harmap", "verify", "--output-dir", "out", "--delay", "inf"])
            .unwrap();
        let delay = match cli.command {
            CliCommand::Verify { delay, .. } => delay,
            _ => panic!("expected Verify"),
        };
        assert_eq!(delay, Some(f64::INFINITY));
        let err = build_options(&HarmapConfig::default(), VerifyArgs { delay, ..args() })
            .unwrap_err();
        assert!(err.to_string().contains("--delay"));
    }

    #[test]
    fn unrepresentable_config_delay_is_an_error() {
        let cfg = HarmapConfig {
            verify_delay_secs: 1e300,
            ..HarmapConfig::default()
        };
        assert!(build_options(&cfg, args()).is_err());
    }
}
