//! Prompt construction for each stage
//!
//! Templates live under `prompts/` and use `{{PLACEHOLDER}}` markers. Every
//! builder is a pure function of its inputs so identical runs send
//! byte-identical prompts.

use super::context::PipelineContext;
use super::types::{
    CaseDraft, GenerationMode, GenerationRequest, PlanItem, PriorityMode, ReviewFeedbackItem,
};
use regex::{Captures, Regex};

const PLAN_TEMPLATE: &str = include_str!("../../prompts/plan.md");
const WRITE_TEMPLATE: &str = include_str!("../../prompts/write.md");
const REVIEW_TEMPLATE: &str = include_str!("../../prompts/review.md");
const REVISE_TEMPLATE: &str = include_str!("../../prompts/revise.md");
const SINGLE_TEMPLATE: &str = include_str!("../../prompts/single.md");

pub const PLAN_RETRY: &str = "Your previous answer could not be used. Respond with only a JSON \
object of the form {\"items\": [...]} where every item has a non-empty title. No prose, no \
markdown fences.";

pub const CASES_RETRY: &str = "Your previous answer could not be used. Respond with only a JSON \
object of the form {\"cases\": [...]} where every case has a non-empty title. No prose, no \
markdown fences.";

pub const REVIEW_RETRY: &str = "Your previous answer could not be used. Respond with only a JSON \
object of the form {\"feedback\": [...], \"summary\": \"...\"}. Use an empty feedback list if \
there is nothing to report. No prose, no markdown fences.";

pub fn plan_prompt(ctx: &PipelineContext, request: &GenerationRequest) -> String {
    let files = files_section(ctx, request);
    let scenarios = scenarios_section(ctx, request);
    render(
        PLAN_TEMPLATE,
        &[
            ("PRIORITY", priority_text(ctx.priority)),
            ("MODE", mode_text(ctx.mode)),
            ("REQUIREMENTS", request.requirements.trim()),
            ("FILES", files.as_str()),
            ("SCENARIOS", scenarios.as_str()),
        ],
    )
}

/// Drafting prompt for one plan item; `history` is only passed by the
/// sequential writer
pub fn writer_prompt(
    ctx: &PipelineContext,
    request: &GenerationRequest,
    item: &PlanItem,
    history: Option<&[CaseDraft]>,
) -> String {
    let notes = item
        .notes
        .as_deref()
        .map(|n| format!("Notes: {}", n))
        .unwrap_or_default();
    let estimate = item
        .estimated_cases
        .map(|n| n.to_string())
        .unwrap_or_else(|| "unspecified".to_string());
    let files = files_section(ctx, request);
    let scenarios = scenarios_section(ctx, request);
    let history = history_section(ctx, history.unwrap_or(&[]));

    render(
        WRITE_TEMPLATE,
        &[
            ("MODE", mode_text(ctx.mode)),
            ("PLAN_ID", item.id.as_str()),
            ("PLAN_TITLE", item.title.as_str()),
            ("PLAN_AREA", or_unspecified(&item.area)),
            ("PLAN_FOCUS", item.focus.as_deref().unwrap_or("unspecified")),
            ("PLAN_ESTIMATE", estimate.as_str()),
            ("PLAN_NOTES", notes.as_str()),
            ("PRIORITY", priority_text(ctx.priority)),
            ("REQUIREMENTS", request.requirements.trim()),
            ("FILES", files.as_str()),
            ("SCENARIOS", scenarios.as_str()),
            ("HISTORY", history.as_str()),
            ("MODE_RULES", mode_rules(ctx.mode)),
        ],
    )
}

pub fn review_prompt(
    ctx: &PipelineContext,
    request: &GenerationRequest,
    plan: &[PlanItem],
    cases: &[CaseDraft],
) -> String {
    let plan_text = plan
        .iter()
        .map(|item| format!("- {}: {} ({})", item.id, item.title, or_unspecified(&item.area)))
        .collect::<Vec<_>>()
        .join("\n");
    let scenarios = scenarios_section(ctx, request);
    let cases = cases_json(cases);

    render(
        REVIEW_TEMPLATE,
        &[
            ("REQUIREMENTS", request.requirements.trim()),
            ("SCENARIOS", scenarios.as_str()),
            ("PLAN", plan_text.as_str()),
            ("CASES", cases.as_str()),
        ],
    )
}

pub fn revision_prompt(
    ctx: &PipelineContext,
    request: &GenerationRequest,
    case_ids: &[String],
    cases: &[CaseDraft],
    feedback: &[ReviewFeedbackItem],
) -> String {
    let feedback_text = feedback
        .iter()
        .map(|item| {
            let target = item.case_id.as_deref().unwrap_or("general");
            let mut line = format!(
                "- [{}] {} ({}): {}",
                item.severity, target, item.issue_type, item.summary
            );
            if !item.suggestion.is_empty() {
                line.push_str(&format!(" Suggestion: {}", item.suggestion));
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n");
    let ids = case_ids.join(", ");
    let cases = cases_json(cases);

    render(
        REVISE_TEMPLATE,
        &[
            ("MODE", mode_text(ctx.mode)),
            ("CASE_IDS", ids.as_str()),
            ("REQUIREMENTS", request.requirements.trim()),
            ("CASES", cases.as_str()),
            ("FEEDBACK", feedback_text.as_str()),
            ("MODE_RULES", mode_rules(ctx.mode)),
        ],
    )
}

pub fn single_prompt(ctx: &PipelineContext, request: &GenerationRequest) -> String {
    let files = files_section(ctx, request);
    let scenarios = scenarios_section(ctx, request);
    render(
        SINGLE_TEMPLATE,
        &[
            ("MODE", mode_text(ctx.mode)),
            ("PRIORITY", priority_text(ctx.priority)),
            ("REQUIREMENTS", request.requirements.trim()),
            ("FILES", files.as_str()),
            ("SCENARIOS", scenarios.as_str()),
            ("MODE_RULES", mode_rules(ctx.mode)),
        ],
    )
}

/// Fill every `{{NAME}}` marker of `template` in a single pass; substituted
/// text is never rescanned. A marker that starts a line and resolves to an
/// empty value also drops the line breaks after it, so empty sections leave
/// no blank run behind. Unknown markers stay as written.
fn render(template: &str, values: &[(&str, &str)]) -> String {
    let re = match Regex::new(r"\{\{([A-Z_]+)\}\}(\n*)") {
        Ok(re) => re,
        Err(_) => return template.to_string(),
    };

    re.replace_all(template, |caps: &Captures| {
        let whole = caps.get(0).map_or("", |m| m.as_str());
        let name = caps.get(1).map_or("", |m| m.as_str());
        let breaks = caps.get(2).map_or("", |m| m.as_str());
        let Some((_, value)) = values.iter().find(|(key, _)| *key == name) else {
            return whole.to_string();
        };

        let start = caps.get(0).map_or(0, |m| m.start());
        let starts_line = start == 0 || template[..start].ends_with('\n');
        let value = value.trim_end_matches('\n');
        if value.is_empty() && starts_line {
            String::new()
        } else {
            format!("{}{}", value, breaks)
        }
    })
    .into_owned()
}

fn mode_text(mode: GenerationMode) -> &'static str {
    match mode {
        GenerationMode::HighLevel => "high-level scenarios",
        GenerationMode::Detailed => "detailed step-by-step cases",
    }
}

fn mode_rules(mode: GenerationMode) -> &'static str {
    match mode {
        GenerationMode::HighLevel => {
            "Each case needs a `title`, an `area`, a one-line `scenario` and a short `description`."
        }
        GenerationMode::Detailed => {
            "Each case needs `preconditions`, `testData`, numbered `steps` and a single `expectedResult`."
        }
    }
}

fn priority_text(priority: PriorityMode) -> &'static str {
    match priority {
        PriorityMode::Comprehensive => {
            "Comprehensive: cover main flows, alternate paths, boundary values, validation and error handling."
        }
        PriorityMode::CoreFunctionality => {
            "Core functionality: restrict coverage to the critical user paths and the behavior the requirements state explicitly."
        }
    }
}

fn or_unspecified(value: &str) -> &str {
    if value.trim().is_empty() {
        "unspecified"
    } else {
        value
    }
}

fn files_section(ctx: &PipelineContext, request: &GenerationRequest) -> String {
    if request.files.is_empty() {
        return String::new();
    }

    let mut out = String::from("## Attached Files\n");
    for file in &request.files {
        let preview: String = file
            .preview_text
            .chars()
            .take(ctx.limits.file_preview_chars)
            .collect();
        out.push_str(&format!(
            "\n### {} ({}, {} bytes)\n\n{}\n",
            file.name,
            or_unspecified(&file.file_type),
            file.size_bytes,
            preview.trim()
        ));
    }
    out
}

fn scenarios_section(ctx: &PipelineContext, request: &GenerationRequest) -> String {
    if request.selected_scenarios.is_empty() {
        return String::new();
    }

    let limit = ctx.limits.max_scenarios;
    let mut out = String::from("## Selected Scenarios\n\n");
    for scenario in request.selected_scenarios.iter().take(limit) {
        out.push_str(&format!("- {}\n", scenario.trim()));
    }
    let omitted = request.selected_scenarios.len().saturating_sub(limit);
    if omitted > 0 {
        out.push_str(&format!("- ({} more omitted)\n", omitted));
    }
    out
}

fn history_section(ctx: &PipelineContext, history: &[CaseDraft]) -> String {
    if history.is_empty() {
        return String::new();
    }

    let skip = history.len().saturating_sub(ctx.limits.history_cases);
    let mut out = String::from(
        "## Cases Already Drafted\n\nThese exist from earlier plan items. Do not duplicate them.\n\n",
    );
    for case in &history[skip..] {
        out.push_str(&format!(
            "- {}: {} ({})\n",
            case.id(),
            case.title(),
            or_unspecified(case.area())
        ));
    }
    out
}

fn cases_json(cases: &[CaseDraft]) -> String {
    serde_json::to_string_pretty(cases).unwrap_or_else(|_| "[]".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::pipeline::types::{FileSummary, HighLevelCase, Severity};
    use crate::testing::{registry_with, ScriptedClient};
    use std::sync::Arc;

    fn ctx() -> PipelineContext {
        let mut config = Config::default();
        config.prompt_limits.file_preview_chars = 5;
        config.prompt_limits.max_scenarios = 2;
        config.prompt_limits.history_cases = 1;
        let clients = registry_with(Arc::new(ScriptedClient::sequence(vec![])));
        PipelineContext::resolve(&GenerationRequest::default(), &config, &clients).unwrap()
    }

    fn request() -> GenerationRequest {
        GenerationRequest {
            requirements: "Users can reset their password by email.".to_string(),
            files: vec![FileSummary {
                name: "flow.txt".to_string(),
                file_type: "text/plain".to_string(),
                size_bytes: 42,
                preview_text: "abcdefghij".to_string(),
            }],
            selected_scenarios: vec!["a".to_string(), "b".to_string(), "c".to_string()],
            ..Default::default()
        }
    }

    fn case(id: &str, title: &str) -> CaseDraft {
        CaseDraft::HighLevel(HighLevelCase {
            id: id.to_string(),
            title: title.to_string(),
            area: "auth".to_string(),
            scenario: String::new(),
            description: String::new(),
        })
    }

    #[test]
    fn test_plan_prompt_bounds_inputs() {
        let prompt = plan_prompt(&ctx(), &request());
        assert!(prompt.starts_with("# Test Planning"));
        assert!(prompt.contains("abcde\n"));
        assert!(!prompt.contains("abcdef"));
        assert!(prompt.contains("- (1 more omitted)"));
        assert!(!prompt.contains("{{"));
        assert!(!prompt.contains("\n\n\n"));
    }

    #[test]
    fn test_writer_prompt_history_is_bounded() {
        let item = PlanItem {
            id: "PLAN-2".to_string(),
            title: "Expired links".to_string(),
            area: "auth".to_string(),
            focus: None,
            estimated_cases: Some(3),
            chunk_refs: None,
            notes: None,
        };
        let history = vec![case("TS-1", "Old"), case("TS-2", "Recent")];

        let prompt = writer_prompt(&ctx(), &request(), &item, Some(&history));
        assert!(prompt.contains("Plan item PLAN-2: Expired links"));
        assert!(prompt.contains("- TS-2: Recent (auth)"));
        assert!(!prompt.contains("TS-1"));

        let without = writer_prompt(&ctx(), &request(), &item, None);
        assert!(!without.contains("Cases Already Drafted"));
    }

    #[test]
    fn test_revision_prompt_lists_ids_and_feedback() {
        let feedback = vec![ReviewFeedbackItem {
            case_id: None,
            issue_type: "coverage".to_string(),
            severity: Severity::Major,
            summary: "No lockout case".to_string(),
            suggestion: String::new(),
        }];
        let prompt = revision_prompt(
            &ctx(),
            &request(),
            &["TS-1".to_string(), "TS-4".to_string()],
            &[case("TS-1", "Reset")],
            &feedback,
        );
        assert!(prompt.starts_with("# Test Case Revision"));
        assert!(prompt.contains("Cases to revise: TS-1, TS-4"));
        assert!(prompt.contains("- [major] general (coverage): No lockout case"));
    }

    #[test]
    fn test_prompts_are_deterministic() {
        let cases = vec![case("TS-1", "Reset")];
        let a = review_prompt(&ctx(), &request(), &[], &cases);
        let b = review_prompt(&ctx(), &request(), &[], &cases);
        assert_eq!(a, b);
        assert!(single_prompt(&ctx(), &request()).starts_with("# Test Case Generation"));
    }

    #[test]
    fn test_placeholders_in_inputs_stay_literal() {
        let mut request = request();
        request.requirements =
            "Email template greets with {{SCENARIOS}} placeholder.\n\n\n\nFooter {{FILES}}".to_string();

        let prompt = plan_prompt(&ctx(), &request);
        assert!(prompt.contains(
            "Email template greets with {{SCENARIOS}} placeholder.\n\n\n\nFooter {{FILES}}"
        ));
        assert_eq!(prompt.matches("## Selected Scenarios").count(), 1);
        assert_eq!(prompt.matches("## Attached Files").count(), 1);
    }

    #[test]
    fn test_plan_fields_cannot_expand_markers() {
        let item = PlanItem {
            id: "PLAN-1".to_string(),
            title: "Greeting {{REQUIREMENTS}}".to_string(),
            area: String::new(),
            focus: Some("{{HISTORY}}".to_string()),
            estimated_cases: None,
            chunk_refs: None,
            notes: Some("{{MODE_RULES}}".to_string()),
        };
        let history = vec![case("TS-1", "Old")];

        let prompt = writer_prompt(&ctx(), &request(), &item, Some(&history));
        assert!(prompt.contains("## Plan item PLAN-1: Greeting {{REQUIREMENTS}}"));
        assert!(prompt.contains("- Focus: {{HISTORY}}"));
        assert!(prompt.contains("Notes: {{MODE_RULES}}"));
        assert_eq!(prompt.matches("Cases Already Drafted").count(), 1);
        assert_eq!(prompt.matches("Users can reset their password").count(), 1);
    }

    #[test]
    fn test_empty_sections_leave_no_blank_runs() {
        let request = GenerationRequest {
            requirements: "Only requirements.".to_string(),
            ..Default::default()
        };
        let prompt = single_prompt(&ctx(), &request);
        assert!(prompt.contains("Only requirements.\n\n## Instructions"));
        assert!(!prompt.contains("\n\n\n"));
    }
}
