//! Tool configuration (`~/.config/harmap/config.toml`) and per-capture run configuration.

mod run;

pub use run::RunConfig;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default ceiling for one extraction chunk, in estimated tokens.
pub const DEFAULT_MAX_TOKENS_PER_CHUNK: usize = 30_000;

/// Chat-completions endpoint used for endpoint extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    /// Base URL of an OpenAI-compatible API (without `/chat/completions`).
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// Hard timeout for one completion call, in seconds.
    pub timeout_secs: u64,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.x.ai/v1".to_string(),
            model: "grok-4-fast-non-reasoning".to_string(),
            temperature: 0.3,
            api_key_env: "XAI_API_KEY".to_string(),
            timeout_secs: 300,
        }
    }
}

/// Global configuration loaded from `~/.config/harmap/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarmapConfig {
    /// Maximum number of chunk extraction calls in flight at once.
    pub max_concurrent_chunks: usize,
    /// Per-request timeout during verification, in seconds.
    pub verify_timeout_secs: u64,
    /// Pause between two verification requests, in seconds.
    pub verify_delay_secs: f64,
    /// User-Agent sent with verification requests.
    pub user_agent: String,
    /// Optional inference section; if missing, built-in defaults are used.
    #[serde(default)]
    pub inference: Option<InferenceConfig>,
}

impl Default for HarmapConfig {
    fn default() -> Self {
        Self {
            max_concurrent_chunks: 1,
            verify_timeout_secs: 10,
            verify_delay_secs: 1.0,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".to_string(),
            inference: None,
        }
    }
}

impl HarmapConfig {
    pub fn inference(&self) -> InferenceConfig {
        self.inference.clone().unwrap_or_default()
    }

    pub fn verify_timeout(&self) -> Duration {
        Duration::from_secs(self.verify_timeout_secs.max(1))
    }

    pub fn verify_delay(&self) -> Result<Duration> {
        delay_from_secs(self.verify_delay_secs).context("invalid verify_delay_secs")
    }
}

/// Converts a pause length in seconds; negative values clamp to zero.
/// Fails on values no `Duration` can hold (infinite or out of range).
pub fn delay_from_secs(secs: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(secs.max(0.0))
        .with_context(|| format!("delay of {secs} seconds is out of range"))
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("harmap")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<HarmapConfig> {
    load_or_init_at(&config_path()?)
}

/// Like [`load_or_init`] but at an explicit path.
pub fn load_or_init_at(path: &Path) -> Result<HarmapConfig> {
    if !path.exists() {
        let default_cfg = HarmapConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(path)
        .with_context(|| format!("read config: {}", path.display()))?;
    let cfg: HarmapConfig =
        toml::from_str(&data).with_context(|| format!("parse config: {}", path.display()))?;
    Ok(cfg)
}
