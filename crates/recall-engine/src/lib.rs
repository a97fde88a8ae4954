//! Chat-transcript study-artifact generation pipeline.
//!
//! Three cooperating components:
//!
//! | Module         | Purpose                                            |
//! |----------------|----------------------------------------------------|
//! | `chunker`      | Token-budget transcript splitting                  |
//! | `orchestrator` | Concurrent fan-out with bounded per-chunk retry    |
//! | `validate`     | Structural validation of raw model output          |
//!
//! Supporting modules: `transcript` (input domain type), `types` (artifact
//! domain types), `errors` (taxonomy + retry classification), `provider` /
//! `providers` (generation capability and adapters), `prompts`, `config`.

pub mod chunker;
pub mod config;
pub mod errors;
pub mod orchestrator;
pub mod prompts;
pub mod provider;
pub mod providers;
pub mod transcript;
pub mod types;
pub mod validate;

// Convenience re-exports for external consumers.
pub use chunker::{CharCountEstimator, TokenEstimator};
pub use config::{EngineConfig, ProviderFamily, ProviderRoute};
pub use errors::{PipelineError, RetryDisposition, ShapeError};
pub use orchestrator::Orchestrator;
pub use provider::Provider;
pub use transcript::Transcript;
pub use types::{
    ArtifactKind, CodeExample, GenerationReport, MergedArtifacts, PracticeArtifact, TopicNote,
    ValidatedArtifact, ValidationFailure,
};
