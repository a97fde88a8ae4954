//! Domain types shared across the pipeline.
//!
//! ## Key types
//!
//! | Type                | Produced by   | Consumed by                    |
//! |---------------------|---------------|--------------------------------|
//! | `ArtifactKind`      | caller        | prompts, validator, orchestrator |
//! | `ValidatedArtifact` | validator     | orchestrator merge             |
//! | `MergedArtifacts`   | orchestrator  | final report                   |
//! | `GenerationReport`  | orchestrator  | caller (also rides inside the exhaustion error) |
//! | `ValidationFailure` | orchestrator  | logging only, never merged     |

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::errors::PipelineError;

// ── Artifact kind ────────────────────────────────────────────────────────────

/// Which study artifact a pipeline run produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// Topic → note mapping distilled from the transcript.
    Summary,
    /// One fill-in-the-blank coding exercise per chunk.
    Practice,
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Summary => write!(f, "summary"),
            Self::Practice => write!(f, "practice"),
        }
    }
}

// ── Summary artifacts ────────────────────────────────────────────────────────

/// A fenced code example attached to a topic note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeExample {
    /// Language identifier from the fence tag (always present — a fence
    /// without one fails validation).
    pub language: String,
    pub code: String,
}

/// The note recorded for one summary topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicNote {
    /// Explanation text with any fenced example removed.
    pub content: String,
    pub code_example: Option<CodeExample>,
}

// ── Practice artifacts ───────────────────────────────────────────────────────

/// A validated fill-in-the-blank exercise: the question is the half-completed
/// variant (contains the completion marker), the answer the fully-completed one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PracticeArtifact {
    pub language: String,
    pub question: String,
    pub answer: String,
}

// ── Validation results ───────────────────────────────────────────────────────

/// Structured result of one successful validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidatedArtifact {
    Summary(BTreeMap<String, TopicNote>),
    Practice(PracticeArtifact),
}

/// One chunk's failure within a round. Retained for logging; never merged
/// into output.
#[derive(Debug)]
pub struct ValidationFailure {
    /// Index of the chunk in the original split order.
    pub chunk_index: usize,
    pub error: PipelineError,
    /// The offending raw model output, when the call got that far.
    pub raw: Option<String>,
}

// ── Merged output ────────────────────────────────────────────────────────────

/// Accumulated artifacts across orchestration rounds.
///
/// Summary topics merge by key union — a topic from an earlier successful
/// round is never overwritten by a later one. Practice artifacts append.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergedArtifacts {
    Summary(BTreeMap<String, TopicNote>),
    Practice(Vec<PracticeArtifact>),
}

impl MergedArtifacts {
    pub fn empty(kind: ArtifactKind) -> Self {
        match kind {
            ArtifactKind::Summary => Self::Summary(BTreeMap::new()),
            ArtifactKind::Practice => Self::Practice(Vec::new()),
        }
    }

    /// Fold one validated artifact into the accumulated set.
    pub fn absorb(&mut self, artifact: ValidatedArtifact) {
        match (self, artifact) {
            (Self::Summary(merged), ValidatedArtifact::Summary(topics)) => {
                for (topic, note) in topics {
                    if merged.contains_key(&topic) {
                        warn!(topic = %topic, "duplicate topic from a later round, keeping the earlier note");
                        continue;
                    }
                    merged.insert(topic, note);
                }
            }
            (Self::Practice(merged), ValidatedArtifact::Practice(practice)) => {
                merged.push(practice);
            }
            (merged, artifact) => {
                // Kind mismatch cannot happen inside one pipeline run; guard anyway.
                warn!(?artifact, ?merged, "artifact kind does not match the accumulator, dropping");
            }
        }
    }

    /// Number of merged entries (topics or exercises).
    pub fn len(&self) -> usize {
        match self {
            Self::Summary(topics) => topics.len(),
            Self::Practice(practices) => practices.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ── Report ───────────────────────────────────────────────────────────────────

/// Final (or partial) result of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationReport {
    pub kind: ArtifactKind,
    pub artifacts: MergedArtifacts,
    /// Total token cost of the input transcript (usage accounting).
    pub token_sum: u64,
    /// Chunks that never produced a valid artifact. Zero on full success.
    pub failed_chunks: usize,
}

impl GenerationReport {
    /// `true` when every chunk produced a validated artifact.
    pub fn is_complete(&self) -> bool {
        self.failed_chunks == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(content: &str) -> TopicNote {
        TopicNote {
            content: content.into(),
            code_example: None,
        }
    }

    #[test]
    fn summary_merge_is_key_union() {
        let mut merged = MergedArtifacts::empty(ArtifactKind::Summary);
        merged.absorb(ValidatedArtifact::Summary(BTreeMap::from([(
            "Tail Recursion".to_string(),
            note("first round"),
        )])));
        merged.absorb(ValidatedArtifact::Summary(BTreeMap::from([
            ("Tail Recursion".to_string(), note("second round")),
            ("Stack Frames".to_string(), note("new topic")),
        ])));

        let MergedArtifacts::Summary(topics) = merged else {
            panic!("summary accumulator changed kind");
        };
        assert_eq!(topics.len(), 2);
        // Earlier round wins on key collision.
        assert_eq!(topics["Tail Recursion"].content, "first round");
        assert_eq!(topics["Stack Frames"].content, "new topic");
    }

    #[test]
    fn practice_merge_appends() {
        let mut merged = MergedArtifacts::empty(ArtifactKind::Practice);
        for i in 0..3 {
            merged.absorb(ValidatedArtifact::Practice(PracticeArtifact {
                language: "python".into(),
                question: format!("q{i}"),
                answer: format!("a{i}"),
            }));
        }
        assert_eq!(merged.len(), 3);
    }

    #[test]
    fn report_completeness() {
        let report = GenerationReport {
            kind: ArtifactKind::Practice,
            artifacts: MergedArtifacts::empty(ArtifactKind::Practice),
            token_sum: 10,
            failed_chunks: 0,
        };
        assert!(report.is_complete());

        let report = GenerationReport {
            failed_chunks: 2,
            ..report
        };
        assert!(!report.is_complete());
    }

    #[test]
    fn artifact_kind_display() {
        assert_eq!(ArtifactKind::Summary.to_string(), "summary");
        assert_eq!(ArtifactKind::Practice.to_string(), "practice");
    }
}
