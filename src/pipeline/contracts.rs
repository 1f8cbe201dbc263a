//! Response contracts for each model-facing stage.

use crate::error::InvokeError;
use crate::invoke::{decode_list, schema_of, Contract, StructuredInvoker};
use crate::provider::ModelTarget;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::types::{
    CaseDraft, DetailedCase, GenerationMode, HighLevelCase, PlanItem, ReviewFeedbackItem, Severity,
};

/// Ordered plan returned by the planner
#[derive(Debug)]
pub struct PlanContract(pub Vec<PlanItem>);

#[derive(JsonSchema)]
#[allow(dead_code)]
struct PlanWire {
    items: Vec<PlanItem>,
}

impl Contract for PlanContract {
    const NAME: &'static str = "plan";

    fn schema() -> Value {
        schema_of::<PlanWire>()
    }

    fn validate(value: Value) -> Result<Self, Vec<String>> {
        let items: Vec<PlanItem> = decode_list(value, &["items", "plan", "planItems"], "items")?;
        if items.is_empty() {
            return Err(vec!["plan contains no items".to_string()]);
        }

        let errors: Vec<String> = items
            .iter()
            .enumerate()
            .filter(|(_, item)| item.title.trim().is_empty())
            .map(|(idx, _)| format!("items[{}].title is empty", idx))
            .collect();
        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(PlanContract(items))
    }
}

/// Per-mode checks applied to every case in a batch
pub trait CaseShape: DeserializeOwned + JsonSchema + Sized {
    fn normalize(&mut self, idx: usize) -> Result<(), String>;

    fn into_draft(self) -> CaseDraft;
}

impl CaseShape for HighLevelCase {
    fn normalize(&mut self, idx: usize) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err(format!("cases[{}].title is empty", idx));
        }
        self.id = self.id.trim().to_string();
        Ok(())
    }

    fn into_draft(self) -> CaseDraft {
        CaseDraft::HighLevel(self)
    }
}

impl CaseShape for DetailedCase {
    fn normalize(&mut self, idx: usize) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err(format!("cases[{}].title is empty", idx));
        }
        self.id = self.id.trim().to_string();
        for (pos, step) in self.steps.iter_mut().enumerate() {
            if step.number == 0 {
                step.number = pos as u32 + 1;
            }
        }
        Ok(())
    }

    fn into_draft(self) -> CaseDraft {
        CaseDraft::Detailed(self)
    }
}

/// Cases returned by a drafting or revision call
#[derive(Debug)]
pub struct CaseBatch<C> {
    pub cases: Vec<C>,
}

#[derive(JsonSchema)]
#[allow(dead_code)]
struct CaseBatchWire<C> {
    cases: Vec<C>,
}

impl<C: CaseShape> Contract for CaseBatch<C> {
    const NAME: &'static str = "case batch";

    fn schema() -> Value {
        schema_of::<CaseBatchWire<C>>()
    }

    fn validate(value: Value) -> Result<Self, Vec<String>> {
        let mut cases: Vec<C> = decode_list(value, &["cases", "testCases"], "cases")?;
        let errors: Vec<String> = cases
            .iter_mut()
            .enumerate()
            .filter_map(|(idx, case)| case.normalize(idx).err())
            .collect();
        if errors.is_empty() {
            Ok(CaseBatch { cases })
        } else {
            Err(errors)
        }
    }
}

/// Invoke a case-producing prompt with the shape matching `mode`
pub async fn invoke_cases(
    invoker: &StructuredInvoker<'_>,
    target: &ModelTarget,
    mode: GenerationMode,
    prompt: &str,
    retry_instruction: Option<&str>,
    tags: &[String],
) -> Result<Vec<CaseDraft>, InvokeError> {
    match mode {
        GenerationMode::HighLevel => invoker
            .invoke::<CaseBatch<HighLevelCase>>(target, prompt, retry_instruction, tags)
            .await
            .map(|batch| batch.cases.into_iter().map(CaseShape::into_draft).collect()),
        GenerationMode::Detailed => invoker
            .invoke::<CaseBatch<DetailedCase>>(target, prompt, retry_instruction, tags)
            .await
            .map(|batch| batch.cases.into_iter().map(CaseShape::into_draft).collect()),
    }
}

/// Feedback item as the model writes it
#[derive(Debug, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
struct RawFeedback {
    /// Omit for feedback about the suite as a whole
    #[serde(default, alias = "case_id", alias = "testCaseId")]
    case_id: Option<String>,

    #[serde(default, alias = "issue_type", alias = "type")]
    issue_type: Option<String>,

    /// One of info, minor, major, critical
    #[serde(default)]
    severity: Option<String>,

    #[serde(default, alias = "issue")]
    summary: String,

    #[serde(default, alias = "recommendation")]
    suggestion: String,
}

impl From<RawFeedback> for ReviewFeedbackItem {
    fn from(raw: RawFeedback) -> Self {
        ReviewFeedbackItem {
            case_id: raw
                .case_id
                .map(|id| id.trim().to_string())
                .filter(|id| !id.is_empty()),
            issue_type: raw.issue_type.unwrap_or_else(|| "general".to_string()),
            severity: Severity::normalize(raw.severity.as_deref()),
            summary: raw.summary,
            suggestion: raw.suggestion,
        }
    }
}

#[derive(JsonSchema)]
#[allow(dead_code)]
struct ReviewWire {
    feedback: Vec<RawFeedback>,
    summary: Option<String>,
}

/// One review pass worth of feedback
#[derive(Debug)]
pub struct ReviewReport {
    pub feedback: Vec<ReviewFeedbackItem>,
    pub summary: Option<String>,
}

impl Contract for ReviewReport {
    const NAME: &'static str = "review";

    fn schema() -> Value {
        schema_of::<ReviewWire>()
    }

    fn validate(value: Value) -> Result<Self, Vec<String>> {
        let summary = value
            .get("summary")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string());
        let raw: Vec<RawFeedback> = decode_list(value, &["feedback", "issues"], "feedback")?;
        Ok(ReviewReport {
            feedback: raw.into_iter().map(ReviewFeedbackItem::from).collect(),
            summary,
        })
    }
}
