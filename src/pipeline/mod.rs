//! Plan, draft and review/revise pipeline
//!
//! The orchestrator owns one run end to end: it resolves a fresh
//! [`PipelineContext`], runs the planner, fans plan items out to the writer
//! and converges the reviewer loop before assembling the response.

mod chunker;
mod context;
mod contracts;
mod orchestrator;
mod planner;
mod pool;
mod progress;
mod prompts;
mod registry;
mod reviewer;
mod telemetry;
mod types;
mod writer;

pub use context::{CancelFlag, PipelineContext};
pub use orchestrator::PipelineOrchestrator;
pub use progress::{NoopProgress, ProgressEvent, ProgressSink, StderrProgress};
pub use telemetry::{PipelineTelemetry, Stage};
pub use types::*;
