//! Pipeline error taxonomy with retry classification.
//!
//! Every error in the generation pipeline is represented here. The
//! orchestrator queries `retry_disposition()` to decide whether a failed
//! chunk goes back into the remaining set — no string matching.
//!
//! ## Dispositions
//!
//! | Error                | Disposition | Who sees it                      |
//! |----------------------|-------------|----------------------------------|
//! | Shape (any variant)  | Retry       | orchestrator, per chunk          |
//! | Provider             | Retry       | orchestrator, per chunk (logged distinctly) |
//! | InputShape           | Fatal       | caller, before any generation    |
//! | InferenceExhausted   | Fatal       | caller, after max attempts       |
//! | Config               | Fatal       | caller, at construction          |

use thiserror::Error;

use crate::types::GenerationReport;

/// Classification used by the orchestrator after a chunk's unit fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDisposition {
    /// The chunk re-enters the remaining set for the next round.
    Retry,
    /// The error escapes the round loop to the caller.
    Fatal,
}

impl RetryDisposition {
    pub fn is_retriable(self) -> bool {
        matches!(self, Self::Retry)
    }
}

/// Raw model output did not match the expected structural contract.
///
/// Always recoverable by re-dispatching the chunk; the upstream model is
/// non-deterministic and may produce a well-shaped response next round.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ShapeError {
    /// Fenced-block count differs from what the artifact kind requires.
    #[error("expected {expected} fenced code blocks, found {found}")]
    CodeBlockCount { expected: usize, found: usize },

    /// The two practice blocks declare different language identifiers.
    #[error("language mismatch: first block is {first}, second block is {second}")]
    LanguageMismatch { first: String, second: String },

    /// A practice code fence carries no language identifier.
    #[error("code block {index} has no language identifier")]
    UntaggedCodeBlock { index: usize },

    /// Neither practice block contains the TODO marker.
    #[error("neither code block contains the completion marker")]
    MarkerMissing,

    /// Both practice blocks contain the TODO marker.
    #[error("both code blocks contain the completion marker")]
    MarkerAmbiguous,

    /// Question and answer disagree on a line before the TODO marker.
    #[error("question and answer differ before the marker at question line {line}")]
    DivergesBeforeMarker { line: usize },

    /// The answer ran out of lines while covering the question's post-marker tail.
    #[error("answer does not cover question line {line} after the marker")]
    AnswerMissingLines { line: usize },

    /// The provider requires a closing sentinel that is absent from the output.
    #[error("required output sentinel {sentinel:?} not found")]
    SentinelMissing { sentinel: String },

    /// Summary output has no numbered-list header to anchor extraction.
    #[error("summary output does not contain a numbered topic list")]
    SummaryHeaderMissing,

    /// Topic extraction produced zero topic/content pairs.
    #[error("no topic entries could be extracted from the summary output")]
    NoTopicsFound,

    /// One-word topics are low-information noise ("Issue", "Problem").
    #[error("topic {topic:?} is a single word and unlikely to be valid")]
    SingleWordTopic { topic: String },

    /// A topic declares a fenced code example without a language tag.
    #[error("code example for topic {topic:?} has no language identifier")]
    MissingCodeLanguage { topic: String },
}

/// Unified error type for the whole generation pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Model output failed structural validation — retried per chunk.
    #[error("shape error: {0}")]
    Shape(#[from] ShapeError),

    /// The provider call itself failed (timeout, auth, quota, transport).
    #[error("provider error [{provider}]: {message}")]
    Provider { provider: String, message: String },

    /// Caller input defect: transcript keys or values are malformed.
    #[error("input shape error: {0}")]
    InputShape(String),

    /// Max attempts exhausted with chunks still failing.
    ///
    /// Artifacts merged in earlier rounds are not discarded; the partial
    /// report rides along so the caller decides whether to accept it.
    #[error("{failed_chunks} chunk(s) still failing after {attempts} attempts")]
    InferenceExhausted {
        failed_chunks: usize,
        attempts: u32,
        partial: Box<GenerationReport>,
    },

    /// Configuration is invalid or missing required fields.
    #[error("configuration error: {0}")]
    Config(String),
}

impl PipelineError {
    /// Classify this error for the orchestrator's round loop.
    pub fn retry_disposition(&self) -> RetryDisposition {
        match self {
            Self::Shape(_) | Self::Provider { .. } => RetryDisposition::Retry,
            Self::InputShape(_) | Self::InferenceExhausted { .. } | Self::Config(_) => {
                RetryDisposition::Fatal
            }
        }
    }

    pub fn is_retriable(&self) -> bool {
        self.retry_disposition().is_retriable()
    }

    /// Build a `Provider` variant conveniently.
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_error_is_retriable() {
        let err = PipelineError::from(ShapeError::MarkerMissing);
        assert!(err.is_retriable());
        assert_eq!(err.retry_disposition(), RetryDisposition::Retry);
    }

    #[test]
    fn provider_error_is_retriable() {
        let err = PipelineError::provider("openai", "connection reset");
        assert!(err.is_retriable());
    }

    #[test]
    fn input_shape_is_fatal() {
        let err = PipelineError::InputShape("value for UserMessage2 is not a string".into());
        assert!(!err.is_retriable());
    }

    #[test]
    fn config_error_is_fatal() {
        let err = PipelineError::Config("token_budget must be > 0".into());
        assert_eq!(err.retry_disposition(), RetryDisposition::Fatal);
    }

    #[test]
    fn shape_error_messages_name_the_defect() {
        let err = ShapeError::CodeBlockCount {
            expected: 2,
            found: 3,
        };
        assert_eq!(err.to_string(), "expected 2 fenced code blocks, found 3");

        let err = ShapeError::LanguageMismatch {
            first: "python".into(),
            second: "rust".into(),
        };
        assert!(err.to_string().contains("python"));
        assert!(err.to_string().contains("rust"));
    }
}
