//! Structural output validation.
//!
//! Transforms one raw model output into exactly one [`ValidatedArtifact`] or
//! fails with a typed [`ShapeError`](crate::errors::ShapeError). Validation
//! is pure: re-validating the same output yields the same result, so the
//! orchestrator can retry freely without re-checking earlier successes.

pub mod extract;
pub mod practice;
pub mod summary;

pub use extract::{fenced_blocks, strip_output_wrapper, FencedBlock};
pub use practice::{validate_practice, TODO_MARKER};
pub use summary::validate_summary;

use crate::errors::ShapeError;
use crate::types::{ArtifactKind, ValidatedArtifact};

/// Validate raw model output for the given artifact kind.
///
/// `sentinel` is the provider's required closing tag, when it declares one;
/// everything from the sentinel onward is stripped before extraction.
pub fn validate(
    kind: ArtifactKind,
    raw: &str,
    sentinel: Option<&str>,
) -> Result<ValidatedArtifact, ShapeError> {
    match kind {
        ArtifactKind::Summary => validate_summary(raw, sentinel).map(ValidatedArtifact::Summary),
        ArtifactKind::Practice => {
            validate_practice(raw, sentinel).map(ValidatedArtifact::Practice)
        }
    }
}
