use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use recall_engine::{
    ArtifactKind, EngineConfig, GenerationReport, Orchestrator, PipelineError, Transcript,
};
use serde::Serialize;
use tracing::{error, info, warn};

/// Generate study artifacts from a chat transcript.
#[derive(Debug, Parser)]
#[command(name = "recall-engine", version)]
struct Args {
    /// Transcript JSON file (title plus UserMessageN / AssistantMessageN slots).
    #[arg(long)]
    input: PathBuf,

    /// Artifact kinds to generate. Repeatable.
    #[arg(long = "kind", value_enum, required = true)]
    kinds: Vec<ArtifactKind>,

    /// Optional TOML config file; defaults come from RECALL_* env vars.
    #[arg(long)]
    config: Option<PathBuf>,
}

/// Per-kind entry of the CLI's JSON output.
#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case", tag = "status")]
enum KindOutcome {
    Complete { report: GenerationReport },
    Partial { report: GenerationReport },
    Failed { error: String },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    match run(Args::parse()).await {
        Ok(code) => code,
        Err(e) => {
            error!(error = %e, "fatal");
            ExitCode::from(1)
        }
    }
}

async fn run(args: Args) -> Result<ExitCode> {
    let config = match &args.config {
        Some(path) => EngineConfig::from_path(path)?,
        None => EngineConfig::default(),
    };
    config
        .validate()
        .map_err(PipelineError::Config)
        .context("invalid configuration")?;

    let raw = std::fs::read_to_string(&args.input)
        .with_context(|| format!("cannot read {}", args.input.display()))?;
    let value: serde_json::Value =
        serde_json::from_str(&raw).context("input is not valid JSON")?;

    // Input-shape defects are caller defects: report and stop before any
    // generation call is made.
    let transcript = match Transcript::from_value(&value) {
        Ok(transcript) => transcript,
        Err(e) => {
            error!(error = %e, "transcript rejected");
            return Ok(ExitCode::from(2));
        }
    };

    info!(
        title = transcript.title(),
        messages = transcript.message_count(),
        kinds = args.kinds.len(),
        "pipeline starting"
    );

    let mut outcomes = serde_json::Map::new();
    let mut any_artifacts = false;

    for kind in &args.kinds {
        let orchestrator = Orchestrator::from_config(&config, *kind)?;
        let outcome = match orchestrator.run(*kind, &transcript).await {
            Ok(report) => {
                any_artifacts = true;
                KindOutcome::Complete { report }
            }
            Err(PipelineError::InferenceExhausted {
                failed_chunks,
                attempts,
                partial,
            }) => {
                warn!(
                    kind = %kind,
                    failed_chunks,
                    attempts,
                    "returning partial result"
                );
                if !partial.artifacts.is_empty() {
                    any_artifacts = true;
                }
                KindOutcome::Partial { report: *partial }
            }
            Err(e) => {
                error!(kind = %kind, error = %e, "generation failed");
                KindOutcome::Failed {
                    error: e.to_string(),
                }
            }
        };
        outcomes.insert(kind.to_string(), serde_json::to_value(outcome)?);
    }

    println!("{}", serde_json::to_string_pretty(&outcomes)?);

    // At least one artifact anywhere counts as success; an entirely empty
    // run is an internal failure.
    Ok(if any_artifacts {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    })
}
