use serde::Serialize;

use super::telemetry::Stage;

/// Discrete progress notifications, pushed in execution order
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    StageStarted {
        stage: Stage,
    },
    StageCompleted {
        stage: Stage,
        duration_ms: u64,
    },
    SliceStarted {
        plan_id: String,
        index: usize,
        total: usize,
    },
    SliceCompleted {
        plan_id: String,
        case_count: usize,
        failed: bool,
    },
    PassStarted {
        pass: u32,
    },
    PassCompleted {
        pass: u32,
        feedback_count: usize,
        blocking_count: usize,
    },
    ChunkStarted {
        pass: u32,
        chunk: usize,
        total: usize,
        case_count: usize,
    },
    ChunkCompleted {
        pass: u32,
        chunk: usize,
        updated: usize,
        failed: bool,
    },
    Final {
        case_count: usize,
        passes_executed: u32,
        warning_count: usize,
    },
    Error {
        message: String,
    },
}

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: ProgressEvent);
}

pub struct NoopProgress;

impl ProgressSink for NoopProgress {
    fn emit(&self, _event: ProgressEvent) {}
}

/// Prints one JSON object per event to stderr
pub struct StderrProgress;

impl ProgressSink for StderrProgress {
    fn emit(&self, event: ProgressEvent) {
        if let Ok(line) = serde_json::to_string(&event) {
            eprintln!("{}", line);
        }
    }
}
