use std::path::PathBuf;
use thiserror::Error;

use crate::config::Provider;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("No client registered for provider '{provider}' ({stage} stage)")]
    ProviderUnavailable { provider: Provider, stage: String },

    #[error("No model configured for the {0} stage")]
    MissingModel(String),

    #[error("Invalid revision limits: soft limit {soft} / hard limit {hard}")]
    RevisionLimits { soft: usize, hard: usize },

    #[error("timeout_sec must be at least 1")]
    ZeroTimeout,
}

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Execution timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Process failed with exit code {code}: {stderr}")]
    NonZeroExit { code: i32, stderr: String },

    #[error("Provider returned no output: {0}")]
    MissingOutput(String),

    #[error("No client registered for provider '{0}'")]
    Unregistered(Provider),
}

/// Failure of one structured model invocation after recovery is exhausted.
#[derive(Error, Debug)]
pub enum InvokeError {
    #[error("Response did not match the {contract} schema: {}", errors.join("; "))]
    SchemaValidation {
        contract: &'static str,
        errors: Vec<String>,
        raw_text: String,
    },

    #[error("Model returned an empty response for {contract}")]
    EmptyResponse { contract: &'static str },

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),
}

impl InvokeError {
    /// Raw model text attached to the failure, if any
    pub fn raw_text(&self) -> Option<&str> {
        match self {
            InvokeError::SchemaValidation { raw_text, .. } => Some(raw_text),
            _ => None,
        }
    }
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Planner failed: {0}")]
    Planner(#[source] InvokeError),

    #[error("Pipeline cancelled before a plan was produced")]
    Cancelled,
}

#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Failed to create output directory: {0}")]
    CreateDir(std::io::Error),

    #[error("Failed to write report: {0}")]
    WriteReport(std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}
