//! Token-budgeted partitioning of kept records into extraction chunks.
//!
//! Greedy packing in capture order, so related calls (login, then data
//! fetch) tend to land in the same chunk. The budget applies to the whole
//! rendered prompt, not just the records: a chunk grows one record at a time
//! and is closed as soon as the next record would push the prompt past the
//! ceiling. A record whose prompt alone exceeds the budget becomes its own
//! chunk instead of being dropped or cut.

use crate::extract::{render_prompt, PromptContext};
use crate::har::TrafficRecord;

/// Average characters per token used for estimation.
const CHARS_PER_TOKEN: usize = 4;
/// Extra headroom added on top of the character-based estimate, in percent.
const SAFETY_MARGIN_PERCENT: usize = 10;

/// Estimated token count of `text`: `ceil(chars / 4)` plus a 10 % margin, rounded up.
pub fn estimate_tokens(text: &str) -> usize {
    let base = text.chars().count().div_ceil(CHARS_PER_TOKEN);
    base + (base * SAFETY_MARGIN_PERCENT).div_ceil(100)
}

/// Token ceiling for one chunk and the estimate of the chunk being built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkBudget {
    pub max_tokens: usize,
    pub used_tokens: usize,
}

impl ChunkBudget {
    pub fn new(max_tokens: usize) -> Self {
        Self {
            max_tokens,
            used_tokens: 0,
        }
    }

    pub fn fits(&self, tokens: usize) -> bool {
        self.used_tokens.saturating_add(tokens) <= self.max_tokens
    }

    pub fn add(&mut self, tokens: usize) {
        self.used_tokens = self.used_tokens.saturating_add(tokens);
    }

    pub fn remaining(&self) -> usize {
        self.max_tokens.saturating_sub(self.used_tokens)
    }

    fn reset(&mut self) {
        self.used_tokens = 0;
    }

    /// Replaces the running estimate with a fresh measurement of the chunk.
    fn remeasure(&mut self, tokens: usize) {
        self.reset();
        self.add(tokens);
    }
}

/// One extraction unit: a non-empty run of consecutive kept records.
#[derive(Debug, Clone)]
pub struct Chunk<'a> {
    pub index: usize,
    pub records: Vec<&'a TrafficRecord>,
    pub estimated_tokens: usize,
    /// Single record whose own estimate exceeds the budget.
    pub oversized: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ChunkPlan<'a> {
    pub chunks: Vec<Chunk<'a>>,
}

impl<'a> ChunkPlan<'a> {
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn oversized_count(&self) -> usize {
        self.chunks.iter().filter(|c| c.oversized).count()
    }

    pub fn record_count(&self) -> usize {
        self.chunks.iter().map(|c| c.records.len()).sum()
    }

    fn close(
        &mut self,
        records: &mut Vec<&'a TrafficRecord>,
        budget: &mut ChunkBudget,
        oversized: bool,
    ) {
        if records.is_empty() {
            return;
        }
        self.chunks.push(Chunk {
            index: self.chunks.len(),
            records: std::mem::take(records),
            estimated_tokens: budget.used_tokens,
            oversized,
        });
        budget.reset();
    }
}

/// Splits records into chunks whose rendered extraction prompt is estimated
/// at no more than `max_tokens`.
pub fn chunk_records<'a>(
    records: &[&'a TrafficRecord],
    max_tokens: usize,
    ctx: &PromptContext,
) -> ChunkPlan<'a> {
    chunk_with_measure(records, max_tokens, |chunk| {
        estimate_tokens(&render_prompt(ctx, chunk))
    })
}

/// Packs records using an additive per-record size estimate.
pub fn chunk_with_estimator<'a, F>(
    records: &[&'a TrafficRecord],
    max_tokens: usize,
    mut estimate: F,
) -> ChunkPlan<'a>
where
    F: FnMut(&TrafficRecord) -> usize,
{
    chunk_with_measure(records, max_tokens, |chunk| {
        chunk.iter().map(|&r| estimate(r)).sum()
    })
}

/// Packs records using `measure`, which estimates a whole candidate chunk.
///
/// `measure` is called with the open chunk plus the next record; the record
/// joins only if the result is within `max_tokens`.
pub fn chunk_with_measure<'a, F>(
    records: &[&'a TrafficRecord],
    max_tokens: usize,
    mut measure: F,
) -> ChunkPlan<'a>
where
    F: FnMut(&[&'a TrafficRecord]) -> usize,
{
    let mut plan = ChunkPlan::default();
    let mut budget = ChunkBudget::new(max_tokens);
    let mut current: Vec<&'a TrafficRecord> = Vec::new();

    for &record in records {
        let was_empty = current.is_empty();
        current.push(record);
        let tokens = measure(current.as_slice());
        if budget.fits(tokens.saturating_sub(budget.used_tokens)) {
            budget.remeasure(tokens);
            continue;
        }

        let alone = if was_empty {
            tokens
        } else {
            current.pop();
            plan.close(&mut current, &mut budget, false);
            current.push(record);
            measure(current.as_slice())
        };
        budget.remeasure(alone);
        if alone > budget.max_tokens {
            tracing::warn!(
                url = %record.url,
                tokens = alone,
                max_tokens,
                "record exceeds chunk budget; emitting it as its own chunk"
            );
            plan.close(&mut current, &mut budget, true);
        }
    }
    plan.close(&mut current, &mut budget, false);

    tracing::debug!(
        records = records.len(),
        chunks = plan.len(),
        oversized = plan.oversized_count(),
        max_tokens,
        "chunked records"
    );
    plan
}
