use crate::config::Config;
use crate::error::{ConfigError, PipelineError};
use crate::interaction_log::{InteractionLog, NoopInteractionLog};
use crate::invoke::StructuredInvoker;
use crate::provider::ClientRegistry;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use super::context::{CancelFlag, PipelineContext};
use super::contracts::invoke_cases;
use super::planner;
use super::progress::{NoopProgress, ProgressEvent, ProgressSink};
use super::prompts;
use super::registry::CaseRegistry;
use super::reviewer::Reviewer;
use super::telemetry::{Stage, TelemetryCollector};
use super::types::{DebugPayload, GenerationRequest, GenerationResponse};
use super::writer::Writer;

/// Entry point for one generation request.
///
/// Every call to [`run`](Self::run) resolves a fresh context and owns its
/// case registry and telemetry; nothing carries over between runs.
pub struct PipelineOrchestrator {
    config: Config,
    clients: ClientRegistry,
    log: Arc<dyn InteractionLog>,
    progress: Arc<dyn ProgressSink>,
    cancel: CancelFlag,
}

impl PipelineOrchestrator {
    pub fn new(config: Config, clients: ClientRegistry) -> Self {
        Self {
            config,
            clients,
            log: Arc::new(NoopInteractionLog),
            progress: Arc::new(NoopProgress),
            cancel: CancelFlag::new(),
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_interaction_log(mut self, log: Arc<dyn InteractionLog>) -> Self {
        self.log = log;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Resolve the context `run` would use, without calling any model
    pub fn resolve(&self, request: &GenerationRequest) -> Result<PipelineContext, ConfigError> {
        PipelineContext::resolve(request, &self.config, &self.clients)
    }

    pub async fn run(&self, request: &GenerationRequest) -> Result<GenerationResponse, PipelineError> {
        let ctx = self.resolve(request)?;
        let invoker = StructuredInvoker::new(
            &self.clients,
            self.log.as_ref(),
            ctx.invoke_timeout,
            &ctx.run_id,
        );

        info!(
            "Run {}: {} mode, agentic={}, writer {}",
            ctx.run_id, ctx.mode, ctx.agentic, ctx.writer
        );

        if ctx.agentic {
            self.run_agentic(&ctx, &invoker, request).await
        } else {
            Ok(self.run_single(&ctx, &invoker, request).await)
        }
    }

    async fn run_agentic(
        &self,
        ctx: &PipelineContext,
        invoker: &StructuredInvoker<'_>,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, PipelineError> {
        let started = Instant::now();
        let mut telemetry = TelemetryCollector::new();
        let progress = self.progress.as_ref();

        if self.cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        // Planner
        progress.emit(ProgressEvent::StageStarted {
            stage: Stage::Planner,
        });
        let stage_start = Instant::now();
        let plan = match planner::plan(invoker, ctx, request).await {
            Ok(plan) => plan,
            Err(e) => {
                progress.emit(ProgressEvent::Error {
                    message: format!("Planner failed: {}", e),
                });
                return Err(PipelineError::Planner(e));
            }
        };
        self.complete_stage(Stage::Planner, stage_start, &mut telemetry);

        let mut registry = CaseRegistry::new(ctx.mode);

        // Writer
        progress.emit(ProgressEvent::StageStarted {
            stage: Stage::Writer,
        });
        let stage_start = Instant::now();
        let writer = Writer {
            invoker,
            ctx,
            request,
            progress,
            cancel: &self.cancel,
        };
        writer.run(&plan, &mut registry, &mut telemetry).await;
        self.complete_stage(Stage::Writer, stage_start, &mut telemetry);

        // Reviewer
        progress.emit(ProgressEvent::StageStarted {
            stage: Stage::Reviewer,
        });
        let stage_start = Instant::now();
        let reviewer = Reviewer {
            invoker,
            ctx,
            request,
            progress,
            cancel: &self.cancel,
        };
        let review = reviewer.run(&plan, &mut registry, &mut telemetry).await;
        self.complete_stage(Stage::Reviewer, stage_start, &mut telemetry);

        if self.cancel.is_cancelled() {
            telemetry.warn("Pipeline cancelled; returning the cases produced so far");
        }

        let case_count = registry.len();
        let (run_telemetry, warnings) = telemetry.finish(&ctx.run_id, started.elapsed(), ctx.models());

        progress.emit(ProgressEvent::Final {
            case_count,
            passes_executed: review.passes_executed,
            warning_count: warnings.len(),
        });
        info!(
            "Run {} finished: {} cases, {} review passes, {} warnings",
            ctx.run_id,
            case_count,
            review.passes_executed,
            warnings.len()
        );

        Ok(GenerationResponse {
            test_cases: registry.into_cases(),
            plan: Some(plan),
            review_feedback: Some(review.feedback),
            review_summary: review.summary,
            passes_executed: Some(review.passes_executed),
            warnings: if warnings.is_empty() {
                None
            } else {
                Some(warnings)
            },
            telemetry: Some(run_telemetry),
            debug: None,
        })
    }

    /// One direct generation call. Never fails: an unusable answer yields no
    /// cases plus a debug payload.
    async fn run_single(
        &self,
        ctx: &PipelineContext,
        invoker: &StructuredInvoker<'_>,
        request: &GenerationRequest,
    ) -> GenerationResponse {
        let prompt = prompts::single_prompt(ctx, request);
        let tags = vec!["stage:single".to_string()];

        let mut response = GenerationResponse {
            test_cases: Vec::new(),
            plan: None,
            review_feedback: None,
            review_summary: None,
            passes_executed: None,
            warnings: None,
            telemetry: None,
            debug: None,
        };

        match invoke_cases(invoker, &ctx.writer, ctx.mode, &prompt, None, &tags).await {
            Ok(cases) => {
                let mut registry = CaseRegistry::new(ctx.mode);
                let warnings: Vec<String> = cases
                    .into_iter()
                    .filter_map(|case| registry.insert(case))
                    .collect();
                for warning in &warnings {
                    warn!("{}", warning);
                }
                response.test_cases = registry.into_cases();
                if !warnings.is_empty() {
                    response.warnings = Some(warnings);
                }
            }
            Err(e) => {
                warn!("Single-shot generation failed: {}", e);
                self.progress.emit(ProgressEvent::Error {
                    message: e.to_string(),
                });
                response.warnings = Some(vec![format!("Generation failed: {}", e)]);
                response.debug = Some(DebugPayload {
                    raw_text: e.raw_text().map(str::to_string),
                    parse_error: e.to_string(),
                });
            }
        }

        let warning_count = response.warnings.as_ref().map_or(0, Vec::len);
        self.progress.emit(ProgressEvent::Final {
            case_count: response.test_cases.len(),
            passes_executed: 0,
            warning_count,
        });
        response
    }

    fn complete_stage(&self, stage: Stage, start: Instant, telemetry: &mut TelemetryCollector) {
        let elapsed = start.elapsed();
        telemetry.record_stage(stage, elapsed);
        self.progress.emit(ProgressEvent::StageCompleted {
            stage,
            duration_ms: elapsed.as_millis() as u64,
        });
    }
}
