//! Engine runtime configuration.
//!
//! Configuration is an explicit value handed to the orchestrator at
//! construction — nothing is looked up ambiently at generation time.
//!
//! ## Precedence (highest to lowest)
//!
//! 1. A TOML file passed to [`EngineConfig::from_path`]
//! 2. Environment variable overrides (`RECALL_*`)
//! 3. Built-in defaults (local OpenAI-compatible endpoint)
//!
//! ## Routing
//!
//! Each artifact kind routes to its own provider + model, so summaries and
//! practice exercises can be served by different backends.

use std::env;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::errors::PipelineError;
use crate::provider::Provider;
use crate::providers::{AnthropicProvider, OpenAiCompatProvider};
use crate::types::ArtifactKind;

/// Default local inference base URL (any OpenAI-compatible server).
const DEFAULT_BASE_URL: &str = "http://localhost:8080/v1";
/// Local servers accept any non-empty key.
const DEFAULT_API_KEY: &str = "local";
const DEFAULT_MODEL: &str = "qwen2.5-coder-32b-instruct";
/// Per-chunk input token budget.
const DEFAULT_TOKEN_BUDGET: u64 = 3_072;
/// Upper bound on output length per provider call.
const DEFAULT_MAX_OUTPUT_TOKENS: u64 = 4_096;
/// Retry rounds before a chunk is declared unrecoverable.
const DEFAULT_MAX_ATTEMPTS: u32 = 9;
/// Concurrent generation units per round.
const DEFAULT_MAX_PARALLEL: usize = 4;
const DEFAULT_TEMPERATURE: f64 = 0.4;

const ENV_BASE_URL: &str = "RECALL_BASE_URL";
const ENV_API_KEY: &str = "RECALL_API_KEY";
const ENV_SUMMARY_MODEL: &str = "RECALL_SUMMARY_MODEL";
const ENV_PRACTICE_MODEL: &str = "RECALL_PRACTICE_MODEL";

/// Which adapter family serves a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderFamily {
    OpenAi,
    Anthropic,
}

/// One artifact kind's provider assignment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderRoute {
    pub family: ProviderFamily,
    pub model: String,
    pub base_url: String,
    pub api_key: String,
    pub temperature: f64,
    pub max_output_tokens: u64,
}

impl ProviderRoute {
    fn default_for(model_env: &str) -> Self {
        Self {
            family: ProviderFamily::OpenAi,
            model: env::var(model_env).unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            base_url: env::var(ENV_BASE_URL).unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            api_key: env::var(ENV_API_KEY).unwrap_or_else(|_| DEFAULT_API_KEY.to_string()),
            temperature: DEFAULT_TEMPERATURE,
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
        }
    }

    fn validate(&self, label: &str) -> Result<(), String> {
        if self.model.is_empty() {
            return Err(format!("{label}: model must not be empty"));
        }
        if self.base_url.is_empty() {
            return Err(format!("{label}: base_url must not be empty"));
        }
        if !(0.0..=1.0).contains(&self.temperature) {
            return Err(format!(
                "{label}: temperature must be in [0, 1], got {}",
                self.temperature
            ));
        }
        if self.max_output_tokens == 0 {
            return Err(format!("{label}: max_output_tokens must be > 0"));
        }
        Ok(())
    }
}

/// Top-level configuration consumed by the orchestrator and the CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub summary: ProviderRoute,
    pub practice: ProviderRoute,
    /// Per-chunk input token budget for the chunker.
    pub token_budget: u64,
    /// Maximum orchestration rounds per pipeline run.
    pub max_attempts: u32,
    /// Concurrent generation units per round.
    pub max_parallel: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            summary: ProviderRoute::default_for(ENV_SUMMARY_MODEL),
            practice: ProviderRoute::default_for(ENV_PRACTICE_MODEL),
            token_budget: DEFAULT_TOKEN_BUDGET,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            max_parallel: DEFAULT_MAX_PARALLEL,
        }
    }
}

impl EngineConfig {
    /// Load from a TOML file; absent keys fall back to the defaults.
    pub fn from_path(path: &Path) -> Result<Self, PipelineError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| PipelineError::Config(format!("cannot read {}: {e}", path.display())))?;
        let config: Self = toml::from_str(&raw)
            .map_err(|e| PipelineError::Config(format!("cannot parse {}: {e}", path.display())))?;
        config
            .validate()
            .map_err(PipelineError::Config)?;
        Ok(config)
    }

    /// The route serving one artifact kind.
    pub fn route(&self, kind: ArtifactKind) -> &ProviderRoute {
        match kind {
            ArtifactKind::Summary => &self.summary,
            ArtifactKind::Practice => &self.practice,
        }
    }

    /// Build the provider for one artifact kind from its route.
    pub fn build_provider(&self, kind: ArtifactKind) -> Result<Arc<dyn Provider>, PipelineError> {
        let route = self.route(kind);
        let provider: Arc<dyn Provider> = match route.family {
            ProviderFamily::OpenAi => Arc::new(OpenAiCompatProvider::new(
                route.base_url.clone(),
                route.api_key.clone(),
                route.model.clone(),
                route.temperature,
                route.max_output_tokens,
            )?),
            ProviderFamily::Anthropic => Arc::new(AnthropicProvider::new(
                route.base_url.clone(),
                route.api_key.clone(),
                route.model.clone(),
                route.temperature,
                route.max_output_tokens,
            )?),
        };
        Ok(provider)
    }

    /// Validate all fields; return the first defect found.
    pub fn validate(&self) -> Result<(), String> {
        self.summary.validate("summary route")?;
        self.practice.validate("practice route")?;
        if self.token_budget == 0 {
            return Err("token_budget must be > 0".to_string());
        }
        if self.max_attempts == 0 {
            return Err("max_attempts must be > 0".to_string());
        }
        if self.max_parallel == 0 {
            return Err("max_parallel must be > 0".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_validates() {
        let config = EngineConfig::default();
        config.validate().expect("default config should be valid");
    }

    #[test]
    fn zero_token_budget_rejected() {
        let mut config = EngineConfig::default();
        config.token_budget = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_max_attempts_rejected() {
        let mut config = EngineConfig::default();
        config.max_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn out_of_range_temperature_rejected() {
        let mut config = EngineConfig::default();
        config.practice.temperature = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn routes_are_per_kind() {
        let mut config = EngineConfig::default();
        config.summary.model = "summariser-model".into();
        config.practice.model = "examiner-model".into();
        assert_eq!(config.route(ArtifactKind::Summary).model, "summariser-model");
        assert_eq!(config.route(ArtifactKind::Practice).model, "examiner-model");
    }

    #[test]
    fn toml_file_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
token_budget = 512
max_attempts = 3

[practice]
family = "anthropic"
model = "claude-sonnet-4-20250514"
base_url = "https://api.anthropic.com"
api_key = "test-key"
temperature = 0.2
max_output_tokens = 2048
"#
        )
        .unwrap();

        let config = EngineConfig::from_path(file.path()).unwrap();
        assert_eq!(config.token_budget, 512);
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.practice.family, ProviderFamily::Anthropic);
        // Untouched sections keep their defaults.
        assert_eq!(config.summary.family, ProviderFamily::OpenAi);
    }

    #[test]
    fn malformed_toml_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "token_budget = \"lots\"").unwrap();
        assert!(EngineConfig::from_path(file.path()).is_err());
    }
}
