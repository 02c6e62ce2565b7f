//! Per-capture run configuration (the scraper config that produced the capture).

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Run configuration: website identity plus optional filter and chunking settings.
///
/// Unknown keys are ignored so the scraper's own config file can be passed as-is.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RunConfig {
    pub website_name: String,
    /// Original browsing task, forwarded to the extraction prompt.
    #[serde(default)]
    pub task: Option<String>,
    #[serde(default)]
    pub methods: Option<Vec<String>>,
    #[serde(default)]
    pub data_only: bool,
    #[serde(default)]
    pub include_static: bool,
    #[serde(default)]
    pub max_tokens_per_chunk: Option<usize>,
}

impl RunConfig {
    /// Reads a run config; TOML when the extension is `.toml`, JSON otherwise.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("read run config: {}", path.display()))?;
        let is_toml = path
            .extension()
            .map(|e| e.eq_ignore_ascii_case("toml"))
            .unwrap_or(false);
        let cfg: RunConfig = if is_toml {
            toml::from_str(&data)
                .with_context(|| format!("parse run config TOML: {}", path.display()))?
        } else {
            serde_json::from_str(&data)
                .with_context(|| format!("parse run config JSON: {}", path.display()))?
        };
        if cfg.website_name.trim().is_empty() {
            anyhow::bail!("run config {} has an empty website_name", path.display());
        }
        Ok(cfg)
    }

    pub fn task_description(&self) -> &str {
        self.task
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or("No task description available")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_temp(suffix: &str, body: &str) -> NamedTempFile {
        let mut f = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        f.write_all(body.as_bytes()).unwrap();
        f.flush().unwrap();
        f
    }

    #[test]
    fn json_config_ignores_scraper_fields() {
        let f = write_temp(
            ".json",
            r#"{
                "website_name": "ably",
                "url": "https://ably.com",
                "task": "Open the dashboard",
                "headless": true
            }"#,
        );
        let cfg = RunConfig::load(f.path()).unwrap();
        assert_eq!(cfg.website_name, "ably");
        assert_eq!(cfg.task_description(), "Open the dashboard");
        assert!(!cfg.data_only);
        assert!(cfg.methods.is_none());
    }

    #[test]
    fn toml_config_with_filters() {
        let f = write_temp(
            ".toml",
            r#"
                website_name = "hn"
                methods = ["GET"]
                data_only = true
                max_tokens_per_chunk = 12000
            "#,
        );
        let cfg = RunConfig::load(f.path()).unwrap();
        assert_eq!(cfg.methods.as_deref(), Some(&["GET".to_string()][..]));
        assert!(cfg.data_only);
        assert_eq!(cfg.max_tokens_per_chunk, Some(12000));
        assert_eq!(cfg.task_description(), "No task description available");
    }

    #[test]
    fn missing_website_name_is_an_error() {
        let f = write_temp(".json", r#"{"task": "x"}"#);
        assert!(RunConfig::load(f.path()).is_err());
    }

    #[test]
    fn corrupt_json_is_an_error() {
        let f = write_temp(".json", "{ not json");
        assert!(RunConfig::load(f.path()).is_err());
    }
}
