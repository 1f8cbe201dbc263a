use crate::provider::ModelTarget;
use serde::Serialize;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Planner,
    Writer,
    Reviewer,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Planner => write!(f, "planner"),
            Stage::Writer => write!(f, "writer"),
            Stage::Reviewer => write!(f, "reviewer"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WriterSliceTelemetry {
    pub plan_id: String,
    pub duration_ms: u64,
    pub case_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warnings: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewPassTelemetry {
    pub pass: u32,
    pub duration_ms: u64,
    pub feedback_count: usize,
    pub blocking_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct StageModels {
    pub planner: ModelTarget,
    pub writer: ModelTarget,
    pub reviewer: ModelTarget,
}

/// How one pipeline run executed
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineTelemetry {
    pub run_id: String,
    pub total_duration_ms: u64,
    pub planner_duration_ms: u64,
    pub writer_duration_ms: u64,
    pub reviewer_duration_ms: u64,
    pub writer_concurrency: usize,
    pub writer_slices: Vec<WriterSliceTelemetry>,
    pub review_passes: Vec<ReviewPassTelemetry>,
    pub models: StageModels,
}

/// Append-only accumulator owned by the orchestrator for one run
#[derive(Debug, Default)]
pub struct TelemetryCollector {
    planner: Duration,
    writer: Duration,
    reviewer: Duration,
    writer_concurrency: usize,
    slices: Vec<WriterSliceTelemetry>,
    passes: Vec<ReviewPassTelemetry>,
    warnings: Vec<String>,
}

impl TelemetryCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_stage(&mut self, stage: Stage, elapsed: Duration) {
        match stage {
            Stage::Planner => self.planner += elapsed,
            Stage::Writer => self.writer += elapsed,
            Stage::Reviewer => self.reviewer += elapsed,
        }
    }

    pub fn set_writer_concurrency(&mut self, concurrency: usize) {
        self.writer_concurrency = concurrency;
    }

    pub fn push_slice(&mut self, slice: WriterSliceTelemetry) {
        self.slices.push(slice);
    }

    pub fn push_pass(&mut self, pass: ReviewPassTelemetry) {
        self.passes.push(pass);
    }

    /// Record a response-level warning; exact repeats are kept once
    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!("{}", message);
        if !self.warnings.contains(&message) {
            self.warnings.push(message);
        }
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn finish(
        self,
        run_id: &str,
        total: Duration,
        models: StageModels,
    ) -> (PipelineTelemetry, Vec<String>) {
        let telemetry = PipelineTelemetry {
            run_id: run_id.to_string(),
            total_duration_ms: total.as_millis() as u64,
            planner_duration_ms: self.planner.as_millis() as u64,
            writer_duration_ms: self.writer.as_millis() as u64,
            reviewer_duration_ms: self.reviewer.as_millis() as u64,
            writer_concurrency: self.writer_concurrency,
            writer_slices: self.slices,
            review_passes: self.passes,
            models,
        };
        (telemetry, self.warnings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Provider;

    fn target(model: &str) -> ModelTarget {
        ModelTarget {
            provider: Provider::ClaudeCli,
            model: model.to_string(),
        }
    }

    #[test]
    fn test_collector_accumulates_and_dedupes_warnings() {
        let mut collector = TelemetryCollector::new();
        collector.record_stage(Stage::Writer, Duration::from_millis(30));
        collector.record_stage(Stage::Writer, Duration::from_millis(20));
        collector.set_writer_concurrency(2);
        collector.push_slice(WriterSliceTelemetry {
            plan_id: "PLAN-1".to_string(),
            duration_ms: 30,
            case_count: 3,
            warnings: None,
        });
        collector.warn("slice failed");
        collector.warn("slice failed");
        collector.warn("other");

        let (telemetry, warnings) = collector.finish(
            "run-1",
            Duration::from_millis(80),
            StageModels {
                planner: target("opus"),
                writer: target("sonnet"),
                reviewer: target("opus"),
            },
        );
        assert_eq!(telemetry.writer_duration_ms, 50);
        assert_eq!(telemetry.writer_concurrency, 2);
        assert_eq!(telemetry.writer_slices.len(), 1);
        assert_eq!(warnings, vec!["slice failed".to_string(), "other".to_string()]);

        let value = serde_json::to_value(&telemetry).unwrap();
        assert_eq!(value["writerSlices"][0]["planId"], "PLAN-1");
        assert_eq!(value["models"]["writer"]["model"], "sonnet");
        assert!(value["writerSlices"][0].get("warnings").is_none());
    }
}
