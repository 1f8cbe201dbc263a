//! Data model shared by the planner, writer and reviewer stages.

use crate::config::Provider;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::telemetry::PipelineTelemetry;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum GenerationMode {
    #[default]
    HighLevel,
    Detailed,
}

impl GenerationMode {
    /// Prefix for ids the registry assigns to cases that arrive without one
    pub fn id_prefix(self) -> &'static str {
        match self {
            GenerationMode::HighLevel => "TS",
            GenerationMode::Detailed => "TC",
        }
    }
}

impl std::fmt::Display for GenerationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GenerationMode::HighLevel => write!(f, "high-level"),
            GenerationMode::Detailed => write!(f, "detailed"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum PriorityMode {
    #[default]
    Comprehensive,
    CoreFunctionality,
}

impl std::fmt::Display for PriorityMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PriorityMode::Comprehensive => write!(f, "comprehensive"),
            PriorityMode::CoreFunctionality => write!(f, "core-functionality"),
        }
    }
}

/// One unit of planned coverage
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlanItem {
    #[serde(default)]
    pub id: String,

    pub title: String,

    #[serde(default)]
    pub area: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub focus: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_cases: Option<u32>,

    /// Pieces of the requirements this item covers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_refs: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HighLevelCase {
    #[serde(default)]
    pub id: String,

    pub title: String,

    #[serde(default)]
    pub area: String,

    #[serde(default)]
    pub scenario: String,

    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DetailedCase {
    #[serde(default)]
    pub id: String,

    pub title: String,

    #[serde(default)]
    pub area: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub preconditions: Vec<String>,

    #[serde(default)]
    pub test_data: Vec<String>,

    #[serde(default)]
    pub steps: Vec<TestStep>,

    #[serde(default)]
    pub expected_result: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct TestStep {
    /// 1-based; 0 means "not numbered" and is fixed up during validation
    #[serde(default)]
    pub number: u32,

    pub description: String,
}

/// A drafted test case in either output mode
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CaseDraft {
    HighLevel(HighLevelCase),
    Detailed(DetailedCase),
}

impl CaseDraft {
    pub fn id(&self) -> &str {
        match self {
            CaseDraft::HighLevel(c) => &c.id,
            CaseDraft::Detailed(c) => &c.id,
        }
    }

    pub fn set_id(&mut self, id: String) {
        match self {
            CaseDraft::HighLevel(c) => c.id = id,
            CaseDraft::Detailed(c) => c.id = id,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            CaseDraft::HighLevel(c) => &c.title,
            CaseDraft::Detailed(c) => &c.title,
        }
    }

    pub fn area(&self) -> &str {
        match self {
            CaseDraft::HighLevel(c) => &c.area,
            CaseDraft::Detailed(c) => &c.area,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Info,
    Minor,
    Major,
    Critical,
}

impl Severity {
    pub fn rank(self) -> u8 {
        match self {
            Severity::Info => 0,
            Severity::Minor => 1,
            Severity::Major => 2,
            Severity::Critical => 3,
        }
    }

    /// Major and critical feedback forces a revision cycle
    pub fn is_blocking(self) -> bool {
        matches!(self, Severity::Major | Severity::Critical)
    }

    /// Lenient mapping of whatever label the model used; unknown means info
    pub fn normalize(label: Option<&str>) -> Self {
        match label.map(|s| s.trim().to_lowercase()).as_deref() {
            Some("critical") | Some("blocker") => Severity::Critical,
            Some("major") | Some("high") => Severity::Major,
            Some("minor") | Some("medium") | Some("low") => Severity::Minor,
            _ => Severity::Info,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Minor => write!(f, "minor"),
            Severity::Major => write!(f, "major"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

/// Review feedback after severity normalization
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewFeedbackItem {
    /// `None` for feedback about the suite as a whole
    #[serde(skip_serializing_if = "Option::is_none")]
    pub case_id: Option<String>,
    pub issue_type: String,
    pub severity: Severity,
    pub summary: String,
    pub suggestion: String,
}

/// Cases plus the feedback for one revision call
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevisionChunk {
    pub feedback: Vec<ReviewFeedbackItem>,
    pub case_ids: Vec<String>,
}

/// Pre-summarized attachment
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSummary {
    pub name: String,

    #[serde(rename = "type", default)]
    pub file_type: String,

    #[serde(default)]
    pub size_bytes: u64,

    #[serde(default)]
    pub preview_text: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgenticOptions {
    #[serde(default)]
    pub enable_agentic: Option<bool>,
    #[serde(default)]
    pub planner_provider: Option<Provider>,
    #[serde(default)]
    pub planner_model: Option<String>,
    #[serde(default)]
    pub writer_provider: Option<Provider>,
    #[serde(default)]
    pub writer_model: Option<String>,
    #[serde(default)]
    pub reviewer_provider: Option<Provider>,
    #[serde(default)]
    pub reviewer_model: Option<String>,
    #[serde(default)]
    pub max_review_passes: Option<u32>,
    #[serde(default)]
    pub writer_concurrency: Option<usize>,
    #[serde(default)]
    pub stream_progress: Option<bool>,
}

/// Everything one generation call needs
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub requirements: String,

    #[serde(default)]
    pub files: Vec<FileSummary>,

    #[serde(default)]
    pub selected_scenarios: Vec<String>,

    #[serde(default)]
    pub mode: GenerationMode,

    #[serde(default)]
    pub priority_mode: Option<PriorityMode>,

    #[serde(default)]
    pub provider: Option<Provider>,

    #[serde(default)]
    pub model: Option<String>,

    #[serde(default)]
    pub agentic_options: Option<AgenticOptions>,
}

/// Diagnostics for a single-shot response that could not be parsed
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_text: Option<String>,
    pub parse_error: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResponse {
    pub test_cases: Vec<CaseDraft>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<Vec<PlanItem>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub review_feedback: Option<Vec<ReviewFeedbackItem>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub review_summary: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub passes_executed: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub warnings: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub telemetry: Option<PipelineTelemetry>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<DebugPayload>,
}
