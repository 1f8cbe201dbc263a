use crate::error::InvokeError;
use crate::invoke::StructuredInvoker;
use futures::StreamExt;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use super::context::{CancelFlag, PipelineContext};
use super::contracts::invoke_cases;
use super::pool::run_bounded;
use super::progress::{ProgressEvent, ProgressSink};
use super::prompts;
use super::registry::CaseRegistry;
use super::telemetry::{TelemetryCollector, WriterSliceTelemetry};
use super::types::{CaseDraft, GenerationRequest, PlanItem};

/// Drafts cases for every plan item and merges them into the registry
pub struct Writer<'a> {
    pub invoker: &'a StructuredInvoker<'a>,
    pub ctx: &'a PipelineContext,
    pub request: &'a GenerationRequest,
    pub progress: &'a dyn ProgressSink,
    pub cancel: &'a CancelFlag,
}

struct SliceOutcome {
    plan_id: String,
    duration: Duration,
    result: Result<Vec<CaseDraft>, InvokeError>,
}

impl<'a> Writer<'a> {
    /// Run all slices and return the concurrency actually used.
    ///
    /// With a single worker, slices run in plan order and each prompt lists
    /// the cases drafted so far. With more, workers claim plan items in order
    /// and never see each other's output; collisions are settled by the
    /// registry.
    pub async fn run(
        &self,
        plan: &[PlanItem],
        registry: &mut CaseRegistry,
        telemetry: &mut TelemetryCollector,
    ) -> usize {
        registry.begin_stage("writer");
        let total = plan.len();
        let concurrency = self.ctx.writer_concurrency.min(total).max(1);
        telemetry.set_writer_concurrency(concurrency);

        info!(
            "Drafting {} plan items with concurrency {}",
            total, concurrency
        );

        if concurrency == 1 {
            for (idx, item) in plan.iter().enumerate() {
                if self.cancel.is_cancelled() {
                    break;
                }
                let history = registry.snapshot();
                let outcome = self.draft_slice(idx, total, item, Some(&history)).await;
                self.merge(outcome, registry, telemetry);
            }
        } else {
            let mut results = run_bounded(
                plan.iter().collect::<Vec<_>>(),
                concurrency,
                move || self.cancel.is_cancelled(),
                move |idx, item| self.draft_slice(idx, total, item, None),
            );
            while let Some((_, outcome)) = results.next().await {
                self.merge(outcome, registry, telemetry);
            }
        }

        concurrency
    }

    async fn draft_slice(
        &self,
        index: usize,
        total: usize,
        item: &PlanItem,
        history: Option<&[CaseDraft]>,
    ) -> SliceOutcome {
        self.progress.emit(ProgressEvent::SliceStarted {
            plan_id: item.id.clone(),
            index,
            total,
        });

        let start = Instant::now();
        let prompt = prompts::writer_prompt(self.ctx, self.request, item, history);
        let tags = vec!["stage:writer".to_string(), format!("plan:{}", item.id)];
        let result = invoke_cases(
            self.invoker,
            &self.ctx.writer,
            self.ctx.mode,
            &prompt,
            Some(prompts::CASES_RETRY),
            &tags,
        )
        .await;

        SliceOutcome {
            plan_id: item.id.clone(),
            duration: start.elapsed(),
            result,
        }
    }

    fn merge(
        &self,
        outcome: SliceOutcome,
        registry: &mut CaseRegistry,
        telemetry: &mut TelemetryCollector,
    ) {
        let mut warnings = Vec::new();
        let failed = outcome.result.is_err();

        let case_count = match outcome.result {
            Ok(cases) => {
                let count = cases.len();
                for case in cases {
                    if let Some(warning) = registry.insert(case) {
                        warnings.push(warning);
                    }
                }
                debug!("Plan {} produced {} cases", outcome.plan_id, count);
                count
            }
            Err(e) => {
                warnings.push(format!(
                    "Failed to generate cases for plan {}: {}",
                    outcome.plan_id, e
                ));
                0
            }
        };

        self.progress.emit(ProgressEvent::SliceCompleted {
            plan_id: outcome.plan_id.clone(),
            case_count,
            failed,
        });

        for warning in &warnings {
            telemetry.warn(warning.clone());
        }
        telemetry.push_slice(WriterSliceTelemetry {
            plan_id: outcome.plan_id,
            duration_ms: outcome.duration.as_millis() as u64,
            case_count,
            warnings: if warnings.is_empty() {
                None
            } else {
                Some(warnings)
            },
        });
    }
}
