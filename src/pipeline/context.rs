use crate::config::{Config, PromptLimits, Provider, RevisionConfig, StageOverride};
use crate::error::ConfigError;
use crate::provider::{ClientRegistry, ModelTarget};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::telemetry::{Stage, StageModels};
use super::types::{GenerationMode, GenerationRequest, PriorityMode};

/// Cooperative cancellation shared between the caller and a running pipeline
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Resolved settings for one run; read-only once built
#[derive(Debug, Clone)]
pub struct PipelineContext {
    pub run_id: String,
    pub mode: GenerationMode,
    pub priority: PriorityMode,
    pub agentic: bool,
    pub planner: ModelTarget,
    pub writer: ModelTarget,
    pub reviewer: ModelTarget,
    /// Requested writer concurrency, at least 1
    pub writer_concurrency: usize,
    pub max_review_passes: u32,
    pub revision: RevisionConfig,
    pub invoke_timeout: Duration,
    pub limits: PromptLimits,
}

impl PipelineContext {
    /// Resolve stage targets and limits for `request`.
    ///
    /// Per stage, the first set value wins: the request's agentic options,
    /// the request's top-level provider/model, the config's stage override,
    /// then the config defaults.
    pub fn resolve(
        request: &GenerationRequest,
        config: &Config,
        clients: &ClientRegistry,
    ) -> Result<Self, ConfigError> {
        let options = request.agentic_options.clone().unwrap_or_default();
        let agentic = options.enable_agentic.unwrap_or(false);

        let planner = resolve_stage(
            Stage::Planner,
            options.planner_provider,
            options.planner_model.as_deref(),
            request,
            &config.agentic.planner,
            config,
            clients,
        )?;
        let writer = resolve_stage(
            Stage::Writer,
            options.writer_provider,
            options.writer_model.as_deref(),
            request,
            &config.agentic.writer,
            config,
            clients,
        )?;
        let reviewer = resolve_stage(
            Stage::Reviewer,
            options.reviewer_provider,
            options.reviewer_model.as_deref(),
            request,
            &config.agentic.reviewer,
            config,
            clients,
        )?;

        Ok(Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            mode: request.mode,
            priority: request.priority_mode.unwrap_or_default(),
            agentic,
            planner,
            writer,
            reviewer,
            writer_concurrency: options
                .writer_concurrency
                .unwrap_or(config.agentic.writer_concurrency)
                .max(1),
            max_review_passes: options
                .max_review_passes
                .unwrap_or(config.agentic.max_review_passes),
            revision: config.agentic.revision.clone(),
            invoke_timeout: Duration::from_secs(config.timeout_sec),
            limits: config.prompt_limits.clone(),
        })
    }

    pub fn models(&self) -> StageModels {
        StageModels {
            planner: self.planner.clone(),
            writer: self.writer.clone(),
            reviewer: self.reviewer.clone(),
        }
    }
}

fn resolve_stage(
    stage: Stage,
    provider: Option<Provider>,
    model: Option<&str>,
    request: &GenerationRequest,
    stage_config: &StageOverride,
    config: &Config,
    clients: &ClientRegistry,
) -> Result<ModelTarget, ConfigError> {
    let provider = provider
        .or(request.provider)
        .or(stage_config.provider)
        .unwrap_or(config.defaults.provider);
    let model = model
        .or(request.model.as_deref())
        .or(stage_config.model.as_deref())
        .unwrap_or(config.defaults.model.as_str())
        .trim()
        .to_string();

    if !clients.contains(provider) {
        return Err(ConfigError::ProviderUnavailable {
            provider,
            stage: stage.to_string(),
        });
    }
    if model.is_empty() {
        return Err(ConfigError::MissingModel(stage.to_string()));
    }

    Ok(ModelTarget { provider, model })
}
