//! Provider capability: prompt shaping plus one async completion call.
//!
//! One implementation per upstream provider; selection happens through the
//! configuration's artifact-kind → provider mapping, not through a dispatch
//! switch. The orchestrator only ever sees this trait.

use async_trait::async_trait;

use crate::errors::PipelineError;
use crate::prompts;
use crate::transcript::Transcript;
use crate::types::ArtifactKind;

/// A text-generation backend the pipeline can call.
///
/// Implementations are stateless remote reads: abandoning an in-flight call
/// carries no cleanup obligation.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Short provider name for logging and error labels.
    fn name(&self) -> &'static str;

    /// Closing sentinel the validator must strip from this provider's
    /// output, when the provider wraps its answers.
    fn output_sentinel(&self) -> Option<&'static str> {
        None
    }

    fn system_message(&self, kind: ArtifactKind) -> String {
        prompts::system_message(kind, self.output_sentinel().is_some())
    }

    fn user_message(&self, kind: ArtifactKind, chunk: &Transcript) -> String {
        prompts::user_message(kind, chunk)
    }

    /// Send one prompt pair and return the raw model output.
    ///
    /// # Errors
    ///
    /// `PipelineError::Provider` on any transport or backend failure. The
    /// orchestrator treats that the same as a shape failure for retry
    /// purposes but logs it distinctly.
    async fn send(&self, system: &str, user: &str) -> Result<String, PipelineError>;
}

/// Drive one full generation call for a chunk.
pub async fn generate(
    provider: &dyn Provider,
    kind: ArtifactKind,
    chunk: &Transcript,
) -> Result<String, PipelineError> {
    let system = provider.system_message(kind);
    let user = provider.user_message(kind, chunk);
    provider.send(&system, &user).await
}
