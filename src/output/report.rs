use crate::error::OutputError;
use crate::pipeline::{CaseDraft, GenerationResponse};
use std::fs;
use std::path::{Path, PathBuf};

/// Write the response as pretty JSON at `path` and a markdown report beside
/// it; returns the markdown path
pub fn write_response(path: &Path, response: &GenerationResponse) -> Result<PathBuf, OutputError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(OutputError::CreateDir)?;
    }

    let json = serde_json::to_string_pretty(response)?;
    fs::write(path, json).map_err(OutputError::WriteReport)?;

    let report_path = path.with_extension("md");
    fs::write(&report_path, build_markdown(response)).map_err(OutputError::WriteReport)?;

    Ok(report_path)
}

fn build_markdown(response: &GenerationResponse) -> String {
    let mut content = String::new();

    // Header
    content.push_str("# Generated Test Cases\n\n");

    // Metadata table
    content.push_str("| Metric | Value |\n");
    content.push_str("|--------|-------|\n");
    content.push_str(&format!("| Cases | {} |\n", response.test_cases.len()));
    if let Some(plan) = &response.plan {
        content.push_str(&format!("| Plan Items | {} |\n", plan.len()));
    }
    if let Some(passes) = response.passes_executed {
        content.push_str(&format!("| Review Passes | {} |\n", passes));
    }
    if let Some(telemetry) = &response.telemetry {
        content.push_str(&format!(
            "| Duration | {:.1}s |\n",
            telemetry.total_duration_ms as f64 / 1000.0
        ));
        content.push_str(&format!(
            "| Writer Concurrency | {} |\n",
            telemetry.writer_concurrency
        ));
    }
    let warning_count = response.warnings.as_ref().map_or(0, Vec::len);
    content.push_str(&format!("| Warnings | {} |\n", warning_count));
    content.push_str("\n---\n\n");

    // Plan
    if let Some(plan) = response.plan.as_ref().filter(|p| !p.is_empty()) {
        content.push_str("## Plan\n\n");
        for item in plan {
            content.push_str(&format!("- **{}** {}", item.id, item.title));
            if !item.area.is_empty() {
                content.push_str(&format!(" ({})", item.area));
            }
            content.push('\n');
        }
        content.push('\n');
    }

    // Cases
    if response.test_cases.is_empty() {
        content.push_str("*No test cases*\n\n");
    } else {
        content.push_str("## Test Cases\n\n");
        for case in &response.test_cases {
            push_case(&mut content, case);
            content.push_str("---\n\n");
        }
    }

    // Review feedback
    if let Some(feedback) = response.review_feedback.as_ref().filter(|f| !f.is_empty()) {
        content.push_str("## Review Feedback\n\n");
        for item in feedback {
            let target = item.case_id.as_deref().unwrap_or("general");
            content.push_str(&format!(
                "- [{}] `{}` {}",
                item.severity, target, item.summary
            ));
            if !item.suggestion.is_empty() {
                content.push_str(&format!(" *Suggestion:* {}", item.suggestion));
            }
            content.push('\n');
        }
        content.push('\n');
    }
    if let Some(summary) = &response.review_summary {
        content.push_str(&format!("**Review summary:** {}\n\n", summary));
    }

    if let Some(warnings) = response.warnings.as_ref().filter(|w| !w.is_empty()) {
        content.push_str("## Warnings\n\n");
        for warning in warnings {
            content.push_str(&format!("- {}\n", warning));
        }
        content.push('\n');
    }

    if let Some(debug) = &response.debug {
        content.push_str("## Parse Failure\n\n");
        content.push_str(&format!("{}\n\n", debug.parse_error));
        if let Some(raw) = &debug.raw_text {
            content.push_str(&format!("```\n{}\n```\n\n", raw));
        }
    }

    content
}

fn push_case(content: &mut String, case: &CaseDraft) {
    content.push_str(&format!("### {}: {}\n\n", case.id(), case.title()));
    if !case.area().is_empty() {
        content.push_str(&format!("- **Area:** {}\n", case.area()));
    }

    match case {
        CaseDraft::HighLevel(c) => {
            if !c.scenario.is_empty() {
                content.push_str(&format!("- **Scenario:** {}\n", c.scenario));
            }
            content.push('\n');
            if !c.description.is_empty() {
                content.push_str(&format!("{}\n\n", c.description));
            }
        }
        CaseDraft::Detailed(c) => {
            content.push('\n');
            if !c.description.is_empty() {
                content.push_str(&format!("{}\n\n", c.description));
            }
            if !c.preconditions.is_empty() {
                content.push_str("**Preconditions:**\n");
                for precondition in &c.preconditions {
                    content.push_str(&format!("- {}\n", precondition));
                }
                content.push('\n');
            }
            if !c.test_data.is_empty() {
                content.push_str("**Test Data:**\n");
                for data in &c.test_data {
                    content.push_str(&format!("- {}\n", data));
                }
                content.push('\n');
            }
            if !c.steps.is_empty() {
                content.push_str("**Steps:**\n");
                for step in &c.steps {
                    content.push_str(&format!("{}. {}\n", step.number, step.description));
                }
                content.push('\n');
            }
            if !c.expected_result.is_empty() {
                content.push_str(&format!("**Expected:** {}\n\n", c.expected_result));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{DetailedCase, ReviewFeedbackItem, Severity, TestStep};

    fn response() -> GenerationResponse {
        GenerationResponse {
            test_cases: vec![CaseDraft::Detailed(DetailedCase {
                id: "TC-1".to_string(),
                title: "Reset with a valid email".to_string(),
                area: "recovery".to_string(),
                description: String::new(),
                preconditions: vec!["Account exists".to_string()],
                test_data: vec![],
                steps: vec![TestStep {
                    number: 1,
                    description: "Submit the reset form".to_string(),
                }],
                expected_result: "A reset email is sent".to_string(),
            })],
            plan: None,
            review_feedback: Some(vec![ReviewFeedbackItem {
                case_id: Some("TC-1".to_string()),
                issue_type: "clarity".to_string(),
                severity: Severity::Minor,
                summary: "Name the mailbox".to_string(),
                suggestion: String::new(),
            }]),
            review_summary: None,
            passes_executed: Some(1),
            warnings: Some(vec!["Review pass 2 failed: timeout".to_string()]),
            telemetry: None,
            debug: None,
        }
    }

    #[test]
    fn test_writes_json_and_markdown() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("2026-01-01").join("cases.json");

        let report_path = write_response(&path, &response()).unwrap();
        assert_eq!(report_path, dir.path().join("2026-01-01").join("cases.md"));

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["testCases"][0]["id"], "TC-1");
        assert_eq!(json["passesExecuted"], 1);

        let markdown = fs::read_to_string(&report_path).unwrap();
        assert!(markdown.contains("### TC-1: Reset with a valid email"));
        assert!(markdown.contains("1. Submit the reset form"));
        assert!(markdown.contains("- [minor] `TC-1` Name the mailbox"));
        assert!(markdown.contains("| Warnings | 1 |"));
    }
}
