pub mod generate;
pub mod schema;

use crate::config::Provider;
use crate::pipeline::{GenerationMode, PriorityMode};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "casegen")]
#[command(
    author,
    version,
    about = "Plan, draft and review test cases with Claude Code and Codex CLI"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose/debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate test cases from a requirements file
    Generate(GenerateArgs),

    /// Print JSON Schema for config validation
    Schema,
}

#[derive(Parser, Clone)]
pub struct GenerateArgs {
    /// Requirements text file
    #[arg(short, long)]
    pub requirements: PathBuf,

    /// Supporting file to summarize into the prompts (repeatable)
    #[arg(short, long = "file", value_name = "PATH")]
    pub files: Vec<PathBuf>,

    /// Scenario the cases must cover (repeatable)
    #[arg(long = "scenario", value_name = "TEXT")]
    pub scenarios: Vec<String>,

    /// Output shape: high-level or detailed
    #[arg(long, default_value = "high-level", value_parser = parse_mode)]
    pub mode: GenerationMode,

    /// Coverage priority: comprehensive or core-functionality
    #[arg(long, value_parser = parse_priority)]
    pub priority: Option<PriorityMode>,

    /// Provider for every stage (claude_cli, codex_cli)
    #[arg(long)]
    pub provider: Option<Provider>,

    /// Model for every stage
    #[arg(long)]
    pub model: Option<String>,

    /// Single direct generation call instead of plan/draft/review
    #[arg(long)]
    pub no_agentic: bool,

    /// Override the review pass budget (0 disables review)
    #[arg(long)]
    pub max_review_passes: Option<u32>,

    /// Override concurrent writer slices
    #[arg(long)]
    pub writer_concurrency: Option<usize>,

    /// Stream progress events to stderr as JSON lines
    #[arg(long)]
    pub progress: bool,

    /// Response JSON path (default: <report_dir>/<date>/cases.json)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, default_value = "casegen.yaml")]
    pub config: PathBuf,

    /// Show resolved stages without calling any model
    #[arg(long)]
    pub dry_run: bool,
}

fn parse_mode(value: &str) -> Result<GenerationMode, String> {
    match value.to_lowercase().replace('_', "-").as_str() {
        "high-level" | "highlevel" => Ok(GenerationMode::HighLevel),
        "detailed" => Ok(GenerationMode::Detailed),
        _ => Err(format!("Unknown mode: {} (expected high-level or detailed)", value)),
    }
}

fn parse_priority(value: &str) -> Result<PriorityMode, String> {
    match value.to_lowercase().replace('_', "-").as_str() {
        "comprehensive" => Ok(PriorityMode::Comprehensive),
        "core-functionality" | "core" => Ok(PriorityMode::CoreFunctionality),
        _ => Err(format!(
            "Unknown priority: {} (expected comprehensive or core-functionality)",
            value
        )),
    }
}
