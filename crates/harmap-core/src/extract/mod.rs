//! Per-chunk endpoint extraction.
//!
//! Each chunk is rendered to a prompt, sent to an [`InferenceClient`] and the
//! reply validated into [`CandidateEndpoint`]s. A failing chunk contributes no
//! candidates and is recorded in its [`ChunkDiagnostic`]; it never stops the
//! run. There are no retries.

mod chat;
mod prompt;
mod response;

pub use chat::ChatClient;
pub use prompt::{render_chunk_summary, render_prompt, PromptContext};
pub use response::{parse_response, strip_code_fences, ParsedChunk};

use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::chunker::{Chunk, ChunkPlan};
use crate::endpoint::CandidateEndpoint;

/// Opaque inference collaborator: prompt text in, model text out.
///
/// Implementations block; callers run them on `spawn_blocking`.
pub trait InferenceClient: Send + Sync {
    fn complete(&self, prompt: &str) -> anyhow::Result<String>;
}

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("inference call failed: {0:#}")]
    Inference(anyhow::Error),
    #[error("malformed model output: {0}")]
    Malformed(String),
    #[error("extraction task aborted: {0}")]
    Aborted(String),
}

/// What happened to one chunk, for the catalog artifact.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChunkDiagnostic {
    pub chunk_index: usize,
    pub record_count: usize,
    pub estimated_tokens: usize,
    pub oversized: bool,
    pub candidates: usize,
    pub skipped_items: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ChunkDiagnostic {
    fn for_chunk(chunk: &Chunk<'_>) -> Self {
        Self {
            chunk_index: chunk.index,
            record_count: chunk.records.len(),
            estimated_tokens: chunk.estimated_tokens,
            oversized: chunk.oversized,
            candidates: 0,
            skipped_items: 0,
            error: None,
        }
    }

    pub fn failed(&self) -> bool {
        self.error.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct ChunkOutcome {
    pub candidates: Vec<CandidateEndpoint>,
    pub diagnostic: ChunkDiagnostic,
}

/// Everything one chunk task needs, detached from the borrowed plan.
struct ChunkJob {
    index: usize,
    prompt: String,
    /// Host used for candidates that name none, when the chunk has exactly one.
    default_domain: Option<String>,
    diagnostic: ChunkDiagnostic,
}

impl ChunkJob {
    fn new(chunk: &Chunk<'_>, ctx: &PromptContext) -> Self {
        let domains: BTreeSet<&str> = chunk
            .records
            .iter()
            .map(|r| r.domain.as_str())
            .filter(|d| !d.is_empty())
            .collect();
        let default_domain = match domains.len() {
            1 => domains.into_iter().next().map(str::to_string),
            _ => None,
        };
        Self {
            index: chunk.index,
            prompt: render_prompt(ctx, &chunk.records),
            default_domain,
            diagnostic: ChunkDiagnostic::for_chunk(chunk),
        }
    }

    fn finish(self, reply: Result<String, ExtractError>) -> ChunkOutcome {
        let ChunkJob {
            index,
            default_domain,
            mut diagnostic,
            ..
        } = self;
        match reply.and_then(|text| parse_response(&text)) {
            Ok(parsed) => {
                let mut candidates = parsed.candidates;
                if let Some(domain) = &default_domain {
                    for c in candidates.iter_mut().filter(|c| c.domain.is_empty()) {
                        c.domain = domain.clone();
                    }
                }
                diagnostic.candidates = candidates.len();
                diagnostic.skipped_items = parsed.skipped;
                tracing::info!(
                    chunk = index,
                    candidates = candidates.len(),
                    skipped = parsed.skipped,
                    "chunk extracted"
                );
                ChunkOutcome {
                    candidates,
                    diagnostic,
                }
            }
            Err(e) => {
                tracing::warn!(chunk = index, "chunk extraction failed: {e}");
                diagnostic.error = Some(e.to_string());
                ChunkOutcome {
                    candidates: Vec::new(),
                    diagnostic,
                }
            }
        }
    }
}

/// Extracts one chunk on the current thread.
pub fn extract_chunk(
    client: &dyn InferenceClient,
    chunk: &Chunk<'_>,
    ctx: &PromptContext,
) -> ChunkOutcome {
    let job = ChunkJob::new(chunk, ctx);
    let reply = client.complete(&job.prompt).map_err(ExtractError::Inference);
    job.finish(reply)
}

/// Extracts every chunk with at most `max_concurrent` inference calls in
/// flight. Outcomes are returned in chunk order regardless of completion
/// order, so downstream merging is deterministic.
pub async fn extract_all(
    client: Arc<dyn InferenceClient>,
    plan: &ChunkPlan<'_>,
    ctx: &PromptContext,
    max_concurrent: usize,
) -> Vec<ChunkOutcome> {
    let max_concurrent = max_concurrent.max(1);
    let mut queue = plan
        .chunks
        .iter()
        .map(|c| ChunkJob::new(c, ctx))
        .collect::<Vec<_>>()
        .into_iter();
    let mut pending: Vec<Option<ChunkJob>> = Vec::with_capacity(plan.len());
    let mut outcomes: Vec<Option<ChunkOutcome>> = vec![None; plan.len()];
    let mut join_set = tokio::task::JoinSet::new();

    loop {
        while join_set.len() < max_concurrent {
            let Some(job) = queue.next() else {
                break;
            };
            let index = job.index;
            let prompt = job.prompt.clone();
            let client = Arc::clone(&client);
            tracing::debug!(chunk = index, total = plan.len(), "dispatching chunk");
            join_set.spawn_blocking(move || (index, client.complete(&prompt)));
            if pending.len() <= index {
                pending.resize_with(index + 1, || None);
            }
            pending[index] = Some(job);
        }

        if join_set.is_empty() {
            break;
        }

        let Some(res) = join_set.join_next().await else {
            break;
        };
        match res {
            Ok((index, reply)) => {
                if let Some(job) = pending.get_mut(index).and_then(Option::take) {
                    outcomes[index] = Some(job.finish(reply.map_err(ExtractError::Inference)));
                }
            }
            Err(e) => tracing::error!("chunk task join: {}", e),
        }
    }

    // Jobs whose task panicked or was cancelled still get a diagnostic.
    for job in pending.into_iter().flatten() {
        let index = job.index;
        outcomes[index] = Some(job.finish(Err(ExtractError::Aborted(
            "task did not complete".to_string(),
        ))));
    }
    outcomes.into_iter().flatten().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunker::chunk_with_estimator;
    use crate::har::TrafficRecord;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn records(domains: &[&str]) -> Vec<TrafficRecord> {
        domains
            .iter()
            .enumerate()
            .map(|(i, d)| TrafficRecord {
                index: i,
                method: "GET".into(),
                url: format!("https://{d}/api/items/{i}"),
                domain: d.to_string(),
                path: format!("/api/items/{i}"),
                query: vec![],
                request_headers: vec![],
                request_body: None,
                response: None,
                started_at: None,
                duration_ms: None,
            })
            .collect()
    }

    /// Replies per chunk based on a marker URL found in the prompt.
    struct ScriptedClient {
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        max_seen: AtomicUsize,
    }

    impl ScriptedClient {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                in_flight: AtomicUsize::new(0),
                max_seen: AtomicUsize::new(0),
            }
        }
    }

    impl InferenceClient for ScriptedClient {
        fn complete(&self, prompt: &str) -> anyhow::Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_seen.fetch_max(now, Ordering::SeqCst);
            // Later chunks finish first.
            let delay = if prompt.contains("/api/items/0") { 60 } else { 5 };
            std::thread::sleep(Duration::from_millis(delay));
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if prompt.contains("/api/items/1\"") {
                anyhow::bail!("upstream 503");
            }
            if prompt.contains("/api/items/2\"") {
                return Ok("I could not find any endpoints.".to_string());
            }
            Ok(r#"```json
[{"method": "GET", "path": "/api/items/{id}", "purpose": "List item"},
 {"method": "BREW", "path": "/coffee"}]
```"#
                .to_string())
        }
    }

    struct FixedClient(&'static str);

    impl InferenceClient for FixedClient {
        fn complete(&self, _prompt: &str) -> anyhow::Result<String> {
            Ok(self.0.to_string())
        }
    }

    fn ctx() -> PromptContext {
        PromptContext {
            website_name: "shop".into(),
            task: "browse".into(),
            ..PromptContext::default()
        }
    }

    #[tokio::test]
    async fn failed_chunks_degrade_to_empty_and_order_is_kept() {
        let recs = records(&["a.com", "a.com", "a.com", "a.com"]);
        let refs: Vec<&TrafficRecord> = recs.iter().collect();
        let plan = chunk_with_estimator(&refs, 1, |_| 1);
        assert_eq!(plan.len(), 4);

        let client = Arc::new(ScriptedClient::new());
        let outcomes = extract_all(client.clone(), &plan, &ctx(), 3).await;

        assert_eq!(client.calls.load(Ordering::SeqCst), 4);
        assert!(client.max_seen.load(Ordering::SeqCst) <= 3);
        let indices: Vec<usize> = outcomes.iter().map(|o| o.diagnostic.chunk_index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3]);

        assert_eq!(outcomes[0].candidates.len(), 1);
        assert_eq!(outcomes[0].candidates[0].domain, "a.com");
        assert_eq!(outcomes[0].diagnostic.skipped_items, 1);
        assert!(!outcomes[0].diagnostic.failed());

        assert!(outcomes[1].candidates.is_empty());
        assert!(outcomes[1]
            .diagnostic
            .error
            .as_deref()
            .unwrap()
            .contains("upstream 503"));
        assert!(outcomes[2].candidates.is_empty());
        assert!(outcomes[2]
            .diagnostic
            .error
            .as_deref()
            .unwrap()
            .starts_with("malformed model output"));
        assert_eq!(outcomes[3].candidates.len(), 1);
    }

    #[tokio::test]
    async fn concurrency_limit_of_one_is_sequential() {
        let recs = records(&["a.com", "b.com", "c.com"]);
        let refs: Vec<&TrafficRecord> = recs.iter().collect();
        let plan = chunk_with_estimator(&refs, 1, |_| 1);
        let client = Arc::new(ScriptedClient::new());
        let outcomes = extract_all(client.clone(), &plan, &ctx(), 1).await;
        assert_eq!(outcomes.len(), 3);
        assert_eq!(client.max_seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn empty_plan_makes_no_calls() {
        let plan = chunk_with_estimator(&[], 100, |_| 1);
        let client = Arc::new(ScriptedClient::new());
        let outcomes = extract_all(client.clone(), &plan, &ctx(), 4).await;
        assert!(outcomes.is_empty());
        assert_eq!(client.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn mixed_domain_chunk_leaves_domain_empty() {
        let recs = records(&["a.com", "b.com"]);
        let refs: Vec<&TrafficRecord> = recs.iter().collect();
        let plan = chunk_with_estimator(&refs, 100, |_| 1);
        let client = FixedClient(
            r#"{"endpoints": [
                {"method": "GET", "path": "/api/items/{id}"},
                {"method": "GET", "path": "/v2/x", "full_url": "https://API.c.com/v2/x"}
            ]}"#,
        );
        let outcome = extract_chunk(&client, &plan.chunks[0], &ctx());
        assert_eq!(outcome.candidates.len(), 2);
        assert_eq!(outcome.candidates[0].domain, "");
        assert_eq!(outcome.candidates[1].domain, "api.c.com");
        assert_eq!(outcome.diagnostic.record_count, 2);
    }
}
