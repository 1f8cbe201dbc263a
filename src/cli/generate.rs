//! CLI handler for the `generate` subcommand

use crate::cli::GenerateArgs;
use crate::config::Config;
use crate::interaction_log::JsonlInteractionLog;
use crate::output::write_response;
use crate::pipeline::{
    AgenticOptions, CancelFlag, FileSummary, GenerationRequest, PipelineContext,
    PipelineOrchestrator, StderrProgress,
};
use crate::provider::ClientRegistry;
use anyhow::Context;
use chrono::Local;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Previews handed to the pipeline are capped at this many characters
const MAX_PREVIEW_CHARS: usize = 4000;

pub async fn execute(args: GenerateArgs) -> anyhow::Result<()> {
    // Load config if it exists, otherwise use defaults
    let config = if args.config.exists() {
        info!("Loading config from {:?}", args.config);
        Config::load(&args.config)?
    } else {
        info!("No config found, using defaults");
        Config::default()
    };
    config.validate()?;

    let requirements = std::fs::read_to_string(&args.requirements).with_context(|| {
        format!(
            "Failed to read requirements file {}",
            args.requirements.display()
        )
    })?;
    if requirements.trim().is_empty() {
        anyhow::bail!(
            "Requirements file {} is empty",
            args.requirements.display()
        );
    }

    let files = args
        .files
        .iter()
        .map(|path| summarize_file(path))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let stream_progress = args.progress || config.agentic.stream_progress;
    let request = build_request(&args, &config, requirements, files, stream_progress);

    let cancel = CancelFlag::new();
    let mut orchestrator =
        PipelineOrchestrator::new(config.clone(), ClientRegistry::from_config(&config))
            .with_cancel(cancel.clone());
    if let Some(path) = &config.interaction_log {
        orchestrator = orchestrator.with_interaction_log(Arc::new(JsonlInteractionLog::new(path)));
    }
    if stream_progress {
        orchestrator = orchestrator.with_progress(Arc::new(StderrProgress));
    }

    if args.dry_run {
        info!("DRY RUN - no provider calls will be made");
        let ctx = orchestrator.resolve(&request)?;
        print_execution_plan(&ctx, &request);
        return Ok(());
    }

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received; finishing in-flight model calls");
            cancel.cancel();
        }
    });

    let response = orchestrator.run(&request).await?;

    let output = args.output.clone().unwrap_or_else(|| {
        let date_str = Local::now().format("%Y-%m-%d").to_string();
        config.report_dir.join(date_str).join("cases.json")
    });
    let report_path = write_response(&output, &response)?;

    match response.passes_executed {
        Some(passes) => println!(
            "Generated {} test cases ({} review passes)",
            response.test_cases.len(),
            passes
        ),
        None => println!("Generated {} test cases", response.test_cases.len()),
    }
    if let Some(warnings) = &response.warnings {
        for warning in warnings {
            println!("  ! {}", warning);
        }
    }
    println!("Wrote {} and {}", output.display(), report_path.display());

    Ok(())
}

fn build_request(
    args: &GenerateArgs,
    config: &Config,
    requirements: String,
    files: Vec<FileSummary>,
    stream_progress: bool,
) -> GenerationRequest {
    GenerationRequest {
        requirements,
        files,
        selected_scenarios: args.scenarios.clone(),
        mode: args.mode,
        priority_mode: args.priority,
        provider: args.provider,
        model: args.model.clone(),
        agentic_options: Some(AgenticOptions {
            enable_agentic: Some(config.agentic.enabled && !args.no_agentic),
            max_review_passes: args.max_review_passes,
            writer_concurrency: args.writer_concurrency,
            stream_progress: Some(stream_progress),
            ..Default::default()
        }),
    }
}

/// Read an attachment into a bounded text preview
fn summarize_file(path: &Path) -> anyhow::Result<FileSummary> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read attached file {}", path.display()))?;
    let preview_text: String = String::from_utf8_lossy(&bytes)
        .chars()
        .take(MAX_PREVIEW_CHARS)
        .collect();

    let file_type = match path.extension().and_then(|e| e.to_str()) {
        Some("md") | Some("markdown") => "text/markdown",
        Some("json") => "application/json",
        Some("yaml") | Some("yml") => "application/yaml",
        Some("csv") => "text/csv",
        Some("html") | Some("htm") => "text/html",
        _ => "text/plain",
    };

    Ok(FileSummary {
        name: path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string()),
        file_type: file_type.to_string(),
        size_bytes: bytes.len() as u64,
        preview_text,
    })
}

fn print_execution_plan(ctx: &PipelineContext, request: &GenerationRequest) {
    println!("\n=== Generation Preview (Dry Run) ===\n");
    println!("Run: {}", ctx.run_id);
    println!("Mode: {}", ctx.mode);
    println!("Priority: {}", ctx.priority);
    println!(
        "Inputs: {} requirement lines, {} files, {} scenarios",
        request.requirements.lines().count(),
        request.files.len(),
        request.selected_scenarios.len()
    );

    if !ctx.agentic {
        println!("Pipeline: single-shot");
        println!("Model: {}", ctx.writer);
        return;
    }

    println!("Pipeline: agentic (plan -> draft -> review)");
    println!("Planner: {}", ctx.planner);
    println!("Writer: {}", ctx.writer);
    println!("Reviewer: {}", ctx.reviewer);
    println!("Writer concurrency: {}", ctx.writer_concurrency);
    println!("Max review passes: {}", ctx.max_review_passes);
    println!(
        "Revision chunks: soft {} / hard {} cases, up to {} concurrent",
        ctx.revision.soft_limit, ctx.revision.hard_limit, ctx.revision.max_concurrency
    );
    println!("Timeout per call: {}s", ctx.invoke_timeout.as_secs());
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_summarize_file_truncates_preview() {
        let mut file = tempfile::Builder::new().suffix(".md").tempfile().unwrap();
        file.write_all("x".repeat(MAX_PREVIEW_CHARS + 100).as_bytes())
            .unwrap();

        let summary = summarize_file(file.path()).unwrap();
        assert_eq!(summary.file_type, "text/markdown");
        assert_eq!(summary.size_bytes, (MAX_PREVIEW_CHARS + 100) as u64);
        assert_eq!(summary.preview_text.chars().count(), MAX_PREVIEW_CHARS);
    }

    #[test]
    fn test_missing_attachment_names_path() {
        let err = summarize_file(Path::new("/nonexistent/brief.txt")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/brief.txt"));
    }
}
