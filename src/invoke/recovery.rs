//! Transition table for the structured invocation recovery ladder.
//!
//! ```text
//! Direct ──schema──▶ Cleanup ──fail──▶ Retry ──schema──▶ RetryCleanup ──fail──▶ give up
//!    └────empty─────────────────────────▲  └────empty──────────────────────────▶ give up
//! ```
//!
//! `Retry` is only reachable when a retry instruction was supplied, which caps
//! every invocation at two model calls. Transport failures never recover here.

/// Where the invoker currently is in the ladder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// First model call, response parsed as-is
    Direct,
    /// Fences stripped, outermost JSON located, parsed again
    Cleanup,
    /// Second model call with the retry instruction appended
    Retry,
    /// Cleanup applied to the retry response
    RetryCleanup,
}

impl Step {
    /// Whether entering this step issues a model call
    pub fn calls_model(self) -> bool {
        matches!(self, Step::Direct | Step::Retry)
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Step::Direct => write!(f, "direct"),
            Step::Cleanup => write!(f, "cleanup"),
            Step::Retry => write!(f, "retry"),
            Step::RetryCleanup => write!(f, "retry_cleanup"),
        }
    }
}

/// Why a step did not produce a valid object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    /// Text came back but did not parse or validate
    Schema,
    /// Nothing but whitespace came back
    Empty,
    /// The call itself failed (timeout, process exit, io)
    Transport,
}

/// Next step after `failure` at `step`, or `None` to surface the error
pub fn next_step(step: Step, failure: Failure, has_retry_instruction: bool) -> Option<Step> {
    let retry = has_retry_instruction.then_some(Step::Retry);
    match (step, failure) {
        (_, Failure::Transport) => None,
        (Step::Direct, Failure::Schema) => Some(Step::Cleanup),
        (Step::Direct, Failure::Empty) => retry,
        (Step::Cleanup, _) => retry,
        (Step::Retry, Failure::Schema) => Some(Step::RetryCleanup),
        (Step::Retry, Failure::Empty) => None,
        (Step::RetryCleanup, _) => None,
    }
}
