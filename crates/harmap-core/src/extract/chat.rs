//! OpenAI-compatible chat-completions client over libcurl.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use super::InferenceClient;
use crate::config::InferenceConfig;
use crate::text::truncate_chars;

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: [ChatMessage<'a>; 1],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Blocking client; one curl handle per call, so it is safe to share across
/// `spawn_blocking` tasks.
#[derive(Clone)]
pub struct ChatClient {
    endpoint: String,
    model: String,
    temperature: f32,
    timeout: Duration,
    api_key: String,
}

impl fmt::Debug for ChatClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatClient")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("timeout", &self.timeout)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl ChatClient {
    /// Builds a client from config, reading the API key from the configured
    /// environment variable.
    pub fn from_config(cfg: &InferenceConfig) -> Result<Self> {
        let api_key = std::env::var(&cfg.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .with_context(|| format!("{} environment variable is not set", cfg.api_key_env))?;
        Ok(Self::with_key(cfg, api_key))
    }

    pub fn with_key(cfg: &InferenceConfig, api_key: String) -> Self {
        Self {
            endpoint: format!("{}/chat/completions", cfg.base_url.trim_end_matches('/')),
            model: cfg.model.clone(),
            temperature: cfg.temperature,
            timeout: Duration::from_secs(cfg.timeout_secs.max(1)),
            api_key,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl InferenceClient for ChatClient {
    fn complete(&self, prompt: &str) -> Result<String> {
        let body = serde_json::to_vec(&ChatRequest {
            model: &self.model,
            temperature: self.temperature,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
        })?;

        let mut easy = curl::easy::Easy::new();
        easy.url(&self.endpoint).context("invalid inference URL")?;
        easy.post(true)?;
        easy.post_fields_copy(&body)?;
        easy.connect_timeout(Duration::from_secs(15))?;
        easy.timeout(self.timeout)?;

        let mut list = curl::easy::List::new();
        list.append("Content-Type: application/json")?;
        list.append("Accept: application/json")?;
        list.append(&format!("Authorization: Bearer {}", self.api_key.trim()))?;
        easy.http_headers(list)?;

        let mut response: Vec<u8> = Vec::new();
        {
            let mut transfer = easy.transfer();
            transfer.write_function(|data| {
                response.extend_from_slice(data);
                Ok(data.len())
            })?;
            transfer.perform().context("inference request failed")?;
        }

        let code = easy.response_code().context("no response code")?;
        let text = String::from_utf8_lossy(&response);
        if !(200..300).contains(&code) {
            anyhow::bail!(
                "inference endpoint returned HTTP {}: {}",
                code,
                truncate_chars(text.trim(), 300, "...")
            );
        }

        let parsed: ChatResponse =
            serde_json::from_str(&text).context("parse chat-completions response")?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .context("chat-completions response has no message content")
    }
}
