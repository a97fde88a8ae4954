//! Token-budget transcript splitting.
//!
//! Oversized transcripts are split into sub-transcripts so each fits the
//! generation model's input budget. Messages are never split mid-body: the
//! walk closes the current chunk *before* adding a message that would push
//! the running sum over budget, provided the chunk already holds at least
//! one message. A lone message whose own cost exceeds the budget therefore
//! ends up alone in an over-budget chunk rather than being rejected.
//!
//! The returned total is the token cost of the whole transcript, independent
//! of how many chunks were produced — callers use it for usage accounting.

use tracing::{debug, info};

use crate::transcript::Transcript;

// ── TokenEstimator ───────────────────────────────────────────────────────────

/// Pluggable token counting strategy.
///
/// Trait exists so callers can supply a model-specific tokenizer without
/// changing the chunker. Any consistent monotonic estimator satisfies the
/// splitting contract.
pub trait TokenEstimator: Send + Sync {
    /// Estimate the number of tokens in `text`.
    fn estimate(&self, text: &str) -> u64;
}

/// Default estimator: 1 token ≈ 4 characters.
pub struct CharCountEstimator;

impl TokenEstimator for CharCountEstimator {
    fn estimate(&self, text: &str) -> u64 {
        (text.len() as u64) / 4
    }
}

// ── Splitting ────────────────────────────────────────────────────────────────

/// Split `transcript` into chunks whose estimated cost fits `budget` tokens.
///
/// Returns the ordered chunks and the total token cost of the transcript.
/// Every chunk carries the original title. Concatenating the chunks' message
/// slots in order reproduces the transcript's slots exactly once each.
///
/// A transcript with no messages yields a single title-only chunk.
pub fn split(
    transcript: &Transcript,
    budget: u64,
    estimator: &dyn TokenEstimator,
) -> (Vec<Transcript>, u64) {
    let mut chunks: Vec<Transcript> = Vec::new();
    let mut current: Vec<(String, String)> = Vec::new();
    let mut current_tokens: u64 = 0;
    let mut total_tokens: u64 = 0;

    for (slot, text) in transcript.messages() {
        let cost = estimator.estimate(text);
        total_tokens += cost;

        if current_tokens + cost > budget && !current.is_empty() {
            debug!(
                chunk = chunks.len(),
                tokens = current_tokens,
                budget,
                "budget reached, closing chunk"
            );
            chunks.push(Transcript::from_parts(
                transcript.title(),
                std::mem::take(&mut current),
            ));
            current_tokens = 0;
        }

        current_tokens += cost;
        current.push((slot.to_string(), text.to_string()));
    }

    chunks.push(Transcript::from_parts(transcript.title(), current));

    info!(
        chunks = chunks.len(),
        total_tokens, "transcript split complete"
    );
    (chunks, total_tokens)
}
