use crate::invoke::StructuredInvoker;
use futures::StreamExt;
use std::cell::Cell;
use std::time::Instant;
use tracing::{debug, info};

use super::chunker::chunk_feedback;
use super::context::{CancelFlag, PipelineContext};
use super::contracts::{invoke_cases, ReviewReport};
use super::pool::run_bounded;
use super::progress::{ProgressEvent, ProgressSink};
use super::prompts;
use super::registry::CaseRegistry;
use super::telemetry::{ReviewPassTelemetry, TelemetryCollector};
use super::types::{CaseDraft, GenerationRequest, PlanItem, ReviewFeedbackItem, RevisionChunk};

/// Iterative review loop: review, chunk blocking feedback, revise, repeat
pub struct Reviewer<'a> {
    pub invoker: &'a StructuredInvoker<'a>,
    pub ctx: &'a PipelineContext,
    pub request: &'a GenerationRequest,
    pub progress: &'a dyn ProgressSink,
    pub cancel: &'a CancelFlag,
}

#[derive(Debug, Default)]
pub struct ReviewOutcome {
    pub feedback: Vec<ReviewFeedbackItem>,
    pub passes_executed: u32,
    pub summary: Option<String>,
}

impl<'a> Reviewer<'a> {
    pub async fn run(
        &self,
        plan: &[PlanItem],
        registry: &mut CaseRegistry,
        telemetry: &mut TelemetryCollector,
    ) -> ReviewOutcome {
        let mut outcome = ReviewOutcome::default();

        for pass in 1..=self.ctx.max_review_passes {
            if self.cancel.is_cancelled() {
                break;
            }
            self.progress.emit(ProgressEvent::PassStarted { pass });

            let start = Instant::now();
            let cases = registry.snapshot();
            let prompt = prompts::review_prompt(self.ctx, self.request, plan, &cases);
            let tags = vec!["stage:reviewer".to_string(), format!("pass:{}", pass)];

            let report = match self
                .invoker
                .invoke::<ReviewReport>(
                    &self.ctx.reviewer,
                    &prompt,
                    Some(prompts::REVIEW_RETRY),
                    &tags,
                )
                .await
            {
                Ok(report) => report,
                Err(e) => {
                    let message = format!("Review pass {} failed: {}", pass, e);
                    self.progress.emit(ProgressEvent::Error {
                        message: message.clone(),
                    });
                    telemetry.warn(message);
                    break;
                }
            };

            let blocking: Vec<ReviewFeedbackItem> = report
                .feedback
                .iter()
                .filter(|item| item.severity.is_blocking())
                .cloned()
                .collect();

            outcome.passes_executed = pass;
            telemetry.push_pass(ReviewPassTelemetry {
                pass,
                duration_ms: start.elapsed().as_millis() as u64,
                feedback_count: report.feedback.len(),
                blocking_count: blocking.len(),
            });
            self.progress.emit(ProgressEvent::PassCompleted {
                pass,
                feedback_count: report.feedback.len(),
                blocking_count: blocking.len(),
            });

            info!(
                "Review pass {}: {} feedback items, {} blocking",
                pass,
                report.feedback.len(),
                blocking.len()
            );

            outcome.feedback.extend(report.feedback);
            if report.summary.is_some() {
                outcome.summary = report.summary;
            }

            if blocking.is_empty() {
                break;
            }

            let (revisable, unknown) = split_unknown_cases(blocking, registry);
            if !unknown.is_empty() {
                telemetry.warn(format!(
                    "Review pass {} flagged unknown case ids {}; ignoring that feedback",
                    pass,
                    unknown.join(", ")
                ));
            }

            let revision = &self.ctx.revision;
            let chunks = chunk_feedback(&revisable, revision.soft_limit, revision.hard_limit);
            if chunks.is_empty() {
                if unknown.is_empty() {
                    telemetry.warn(format!(
                        "Review pass {} raised blocking feedback without case ids; nothing to revise",
                        pass
                    ));
                }
                break;
            }

            if !self.revise(pass, chunks, registry, telemetry).await {
                break;
            }
        }

        outcome
    }

    /// Run one pass worth of revision chunks. Returns false when a chunk
    /// failed or the run was cancelled, which ends the review loop.
    async fn revise(
        &self,
        pass: u32,
        chunks: Vec<RevisionChunk>,
        registry: &mut CaseRegistry,
        telemetry: &mut TelemetryCollector,
    ) -> bool {
        let total = chunks.len();
        let workers = total
            .min(self.ctx.revision.max_concurrency.min(self.ctx.writer_concurrency))
            .max(1);

        let jobs: Vec<(RevisionChunk, String)> = chunks
            .into_iter()
            .map(|chunk| {
                let cases: Vec<CaseDraft> = chunk
                    .case_ids
                    .iter()
                    .filter_map(|id| registry.get(id).cloned())
                    .collect();
                let prompt = prompts::revision_prompt(
                    self.ctx,
                    self.request,
                    &chunk.case_ids,
                    &cases,
                    &chunk.feedback,
                );
                (chunk, prompt)
            })
            .collect();

        debug!(
            "Pass {}: revising {} chunks with {} workers",
            pass, total, workers
        );

        let failed = Cell::new(false);
        let completed = {
            let failed = &failed;
            let mut results = run_bounded(
                jobs,
                workers,
                move || failed.get() || self.cancel.is_cancelled(),
                move |idx, (chunk, prompt): (RevisionChunk, String)| async move {
                    self.progress.emit(ProgressEvent::ChunkStarted {
                        pass,
                        chunk: idx + 1,
                        total,
                        case_count: chunk.case_ids.len(),
                    });
                    let tags = vec![
                        "stage:revision".to_string(),
                        format!("pass:{}", pass),
                        format!("chunk:{}", idx + 1),
                    ];
                    let result = invoke_cases(
                        self.invoker,
                        &self.ctx.writer,
                        self.ctx.mode,
                        &prompt,
                        Some(prompts::CASES_RETRY),
                        &tags,
                    )
                    .await;
                    if result.is_err() {
                        failed.set(true);
                    }
                    (chunk, result)
                },
            );

            let mut completed = 0;
            while let Some((idx, (chunk, result))) = results.next().await {
                completed += 1;
                match result {
                    Ok(cases) => {
                        let updated = merge_revision(&chunk, cases, registry);
                        self.progress.emit(ProgressEvent::ChunkCompleted {
                            pass,
                            chunk: idx + 1,
                            updated,
                            failed: false,
                        });
                    }
                    Err(e) => {
                        telemetry.warn(format!(
                            "Revision chunk {} of pass {} failed: {}",
                            idx + 1,
                            pass,
                            e
                        ));
                        self.progress.emit(ProgressEvent::ChunkCompleted {
                            pass,
                            chunk: idx + 1,
                            updated: 0,
                            failed: true,
                        });
                    }
                }
            }
            completed
        };

        let skipped = total - completed;
        if skipped > 0 {
            telemetry.warn(format!(
                "Skipped {} of {} revision chunks in pass {}",
                skipped, total, pass
            ));
        }

        !failed.get() && !self.cancel.is_cancelled()
    }
}

/// Drop feedback naming a case the registry never held; returns the kept
/// feedback and the distinct unknown ids in first-seen order
fn split_unknown_cases(
    feedback: Vec<ReviewFeedbackItem>,
    registry: &CaseRegistry,
) -> (Vec<ReviewFeedbackItem>, Vec<String>) {
    let mut unknown: Vec<String> = Vec::new();
    let kept: Vec<ReviewFeedbackItem> = feedback
        .into_iter()
        .filter(|item| match item.case_id.as_deref() {
            Some(id) if !registry.contains(id) => {
                if !unknown.iter().any(|u| u == id) {
                    unknown.push(id.to_string());
                }
                false
            }
            _ => true,
        })
        .collect();
    (kept, unknown)
}

/// Overwrite registry entries with revised cases that belong to `chunk`;
/// revision never introduces new cases
fn merge_revision(
    chunk: &RevisionChunk,
    cases: Vec<CaseDraft>,
    registry: &mut CaseRegistry,
) -> usize {
    let sole_id = match chunk.case_ids.as_slice() {
        [only] => Some(only),
        _ => None,
    };

    let mut updated = 0;
    for mut case in cases {
        let id = match (case.id().trim(), sole_id) {
            ("", Some(only)) => only.clone(),
            (id, _) => id.to_string(),
        };
        if chunk.case_ids.contains(&id) && registry.contains(&id) {
            case.set_id(id);
            registry.replace(case);
            updated += 1;
        } else {
            debug!("Ignoring revised case '{}' outside its chunk", id);
        }
    }
    updated
}
