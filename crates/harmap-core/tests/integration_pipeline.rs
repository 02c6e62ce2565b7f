//! Integration test: analyze a capture directory with a scripted inference
//! client, then verify the resulting catalog against a local HTTP server.

mod common;

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use harmap_core::config::RunConfig;
use harmap_core::endpoint::{AuthMethod, HttpMethod};
use harmap_core::extract::InferenceClient;
use harmap_core::pipeline::{
    run_analyze, run_verify, AnalyzeOptions, VerifyRunOptions, CATALOG_FILE, COOKIES_FILE,
    HAR_FILE, RESULTS_FILE,
};
use harmap_core::verify::{Outcome, VerifyOptions};
use serde_json::json;
use tempfile::tempdir;

/// Answers every prompt with the same endpoint list, counting calls.
struct ScriptedModel {
    reply: String,
    calls: AtomicUsize,
}

impl ScriptedModel {
    fn new(reply: String) -> Arc<Self> {
        Arc::new(Self {
            reply,
            calls: AtomicUsize::new(0),
        })
    }
}

impl InferenceClient for ScriptedModel {
    fn complete(&self, prompt: &str) -> anyhow::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.reply.is_empty() {
            anyhow::bail!("model unavailable");
        }
        assert!(prompt.contains("/api/users"), "prompt should list the kept requests");
        assert!(!prompt.contains("google-analytics"), "tracking must be filtered out");
        Ok(self.reply.clone())
    }
}

fn entry(method: &str, url: &str, status: u16, mime: &str, body: &str) -> serde_json::Value {
    json!({
        "startedDateTime": "2026-10-16T10:00:00.000Z",
        "time": 42.0,
        "request": { "method": method, "url": url, "headers": [] },
        "response": {
            "status": status,
            "headers": [{ "name": "Content-Type", "value": mime }],
            "content": { "size": body.len(), "mimeType": mime, "text": body }
        }
    })
}

fn write_capture(dir: &Path, entries: Vec<serde_json::Value>) {
    let har = json!({ "log": { "version": "1.2", "entries": entries } });
    std::fs::write(dir.join(HAR_FILE), serde_json::to_vec_pretty(&har).unwrap()).unwrap();
}

fn run_config() -> RunConfig {
    RunConfig {
        website_name: "local".to_string(),
        task: Some("Browse the user directory".to_string()),
        ..RunConfig::default()
    }
}

#[tokio::test]
async fn analyze_then_verify_round() {
    let (origin, log) = common::http_server::start();
    let dir = tempdir().unwrap();
    write_capture(
        dir.path(),
        vec![
            entry("GET", &format!("{}/", origin), 200, "text/html", "<html></html>"),
            entry(
                "GET",
                "https://www.google-analytics.com/g/collect?v=2",
                204,
                "text/plain",
                "",
            ),
            entry("GET", &format!("{}/static/app.css", origin), 200, "text/css", "body{}"),
            entry(
                "GET",
                &format!("{}/api/users/123", origin),
                200,
                "application/json",
                r#"{"id":123,"name":"Ada"}"#,
            ),
            entry(
                "GET",
                &format!("{}/api/users/456", origin),
                200,
                "application/json",
                r#"{"id":456,"name":"Lin"}"#,
            ),
        ],
    );
    std::fs::write(
        dir.path().join(COOKIES_FILE),
        r#"[{"name": "session_token", "value": "s3cret", "domain": "127.0.0.1", "path": "/"}]"#,
    )
    .unwrap();

    let reply = json!([
        {
            "method": "GET",
            "path": "/api/users/{id}",
            "full_url": format!("{}/api/users/123", origin),
            "endpoint_name": "Get User",
            "purpose": "Fetch a user",
            "category": "data_fetch",
            "auth_method": "cookie",
            "parameters": [
                { "name": "id", "location": "path", "required": true, "example_value": "123" }
            ],
            "response_format": "json",
            "example_response": { "id": 123, "name": "Ada" }
        },
        {
            "method": "get",
            "path": "/api/users/456",
            "full_url": format!("{}/api/users/456", origin),
            "endpoint_name": "User",
            "purpose": "Fetch a single user profile by id",
            "auth_method": "none"
        },
        { "path": "/missing/method" }
    ])
    .to_string();
    let model = ScriptedModel::new(reply);

    let run = RunConfig {
        data_only: true,
        ..run_config()
    };
    let opts = AnalyzeOptions::new(dir.path().to_path_buf(), run);
    let analyzed = run_analyze(&opts, model.clone()).await.unwrap();
    assert_eq!(model.calls.load(Ordering::SeqCst), 1);
    assert_eq!(analyzed.path, dir.path().join(CATALOG_FILE));
    assert!(analyzed.path.exists());

    let report = &analyzed.report;
    assert_eq!(report.website_name, "local");
    assert_eq!(report.total_requests, 5);
    assert_eq!(report.filtered_requests, 2);
    assert_eq!(report.chunk_stats.total_chunks, 1);
    assert_eq!(report.chunk_stats.failed_chunks, 0);
    assert_eq!(report.chunk_stats.skipped_items, 1);
    assert_eq!(report.total_endpoints, 1);
    assert_eq!(report.endpoints.len(), 1);
    assert!(report.notes.is_none());

    let users = &report.endpoints[0];
    assert_eq!(users.method, HttpMethod::Get);
    assert_eq!(users.path, "/api/users/{id}");
    assert_eq!(users.domain, "127.0.0.1");
    assert_eq!(users.merge_count, 2);
    assert_eq!(users.purpose, "Fetch a single user profile by id");
    assert_eq!(users.auth_method, AuthMethod::Cookie);
    assert_eq!(report.auth_cookie_names, vec!["session_token"]);
    assert_eq!(
        report.domains_accessed,
        vec!["127.0.0.1", "www.google-analytics.com"]
    );

    let on_disk: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&analyzed.path).unwrap()).unwrap();
    assert_eq!(on_disk["total_endpoints"], 1);
    assert_eq!(on_disk["endpoints"][0]["method"], "GET");

    let verify_opts = VerifyRunOptions::new(
        dir.path().to_path_buf(),
        VerifyOptions {
            delay: std::time::Duration::ZERO,
            ..VerifyOptions::default()
        },
    );
    let verified = tokio::task::spawn_blocking(move || run_verify(&verify_opts))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(verified.path, dir.path().join(RESULTS_FILE));
    assert_eq!(verified.report.website_name, "local");
    assert_eq!(verified.report.total_endpoints, 1);
    assert_eq!(verified.report.successful_requests, 1);
    assert_eq!(verified.report.success_rate, 100.0);

    let result = &verified.report.results[0];
    assert_eq!(result.outcome, Outcome::Success);
    assert_eq!(result.cookies_used, 1);
    let seen = log.snapshot();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].target, "/api/users/123");
}

#[tokio::test]
async fn empty_capture_writes_empty_catalog() {
    let dir = tempdir().unwrap();
    write_capture(dir.path(), vec![]);
    let model = ScriptedModel::new("[]".to_string());

    let opts = AnalyzeOptions::new(dir.path().to_path_buf(), run_config());
    let analyzed = run_analyze(&opts, model.clone()).await.unwrap();
    assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    assert_eq!(analyzed.report.total_endpoints, 0);
    assert_eq!(analyzed.report.chunk_stats.total_chunks, 0);
    assert!(analyzed.path.exists());

    let verify_opts = VerifyRunOptions::new(dir.path().to_path_buf(), VerifyOptions::default());
    let verified = tokio::task::spawn_blocking(move || run_verify(&verify_opts))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(verified.report.total_endpoints, 0);
    assert_eq!(verified.report.success_rate, 0.0);
}

#[tokio::test]
async fn failed_inference_still_writes_catalog() {
    let dir = tempdir().unwrap();
    write_capture(
        dir.path(),
        vec![entry(
            "GET",
            "https://shop.example.com/api/users/1",
            200,
            "application/json",
            "{}",
        )],
    );
    let model = ScriptedModel::new(String::new());

    let opts = AnalyzeOptions::new(dir.path().to_path_buf(), run_config());
    let analyzed = run_analyze(&opts, model).await.unwrap();
    assert_eq!(analyzed.report.chunk_stats.total_chunks, 1);
    assert_eq!(analyzed.report.chunk_stats.failed_chunks, 1);
    assert_eq!(analyzed.report.total_endpoints, 0);
    assert!(analyzed.report.notes.is_some());
    let diag = &analyzed.report.chunk_diagnostics[0];
    assert!(diag.error.as_deref().unwrap().contains("model unavailable"));
}

#[tokio::test]
async fn missing_capture_is_an_error() {
    let dir = tempdir().unwrap();
    let model = ScriptedModel::new("[]".to_string());
    let opts = AnalyzeOptions::new(dir.path().to_path_buf(), run_config());
    let err = run_analyze(&opts, model).await.unwrap_err();
    assert!(err.to_string().contains("HAR file not found"));
    assert!(!dir.path().join(CATALOG_FILE).exists());
}
