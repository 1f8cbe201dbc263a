use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::defaults::*;

#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,

    /// Per model call timeout
    #[serde(default = "default_timeout_sec")]
    pub timeout_sec: u64,

    /// Where `generate` writes its dated output when `--output` is not given
    #[serde(default = "default_report_dir")]
    pub report_dir: PathBuf,

    /// JSONL file receiving every prompt/response pair
    #[serde(default)]
    pub interaction_log: Option<PathBuf>,

    #[serde(default)]
    pub providers: ProvidersConfig,

    #[serde(default)]
    pub defaults: StageConfig,

    #[serde(default)]
    pub agentic: AgenticConfig,

    #[serde(default)]
    pub prompt_limits: PromptLimits,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub claude_cli: ClaudeCliConfig,

    #[serde(default)]
    pub codex_cli: CodexCliConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct ClaudeCliConfig {
    #[serde(default = "default_claude_binary")]
    pub binary: PathBuf,

    #[serde(default = "default_permission_mode")]
    pub permission_mode: String,
}

impl Default for ClaudeCliConfig {
    fn default() -> Self {
        Self {
            binary: default_claude_binary(),
            permission_mode: default_permission_mode(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct CodexCliConfig {
    #[serde(default = "default_codex_binary")]
    pub binary: PathBuf,
}

impl Default for CodexCliConfig {
    fn default() -> Self {
        Self {
            binary: default_codex_binary(),
        }
    }
}

/// Provider/model pair used when a stage does not override it
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct StageConfig {
    #[serde(default = "default_provider")]
    pub provider: Provider,

    #[serde(default = "default_model")]
    pub model: String,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
        }
    }
}

/// Optional per-stage override; unset fields fall back to `defaults`
#[derive(Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
pub struct StageOverride {
    #[serde(default)]
    pub provider: Option<Provider>,

    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct AgenticConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default)]
    pub planner: StageOverride,

    #[serde(default)]
    pub writer: StageOverride,

    #[serde(default)]
    pub reviewer: StageOverride,

    #[serde(default = "default_max_review_passes")]
    pub max_review_passes: u32,

    #[serde(default = "default_writer_concurrency")]
    pub writer_concurrency: usize,

    #[serde(default)]
    pub stream_progress: bool,

    #[serde(default)]
    pub revision: RevisionConfig,
}

impl Default for AgenticConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            planner: StageOverride::default(),
            writer: StageOverride::default(),
            reviewer: StageOverride::default(),
            max_review_passes: default_max_review_passes(),
            writer_concurrency: default_writer_concurrency(),
            stream_progress: false,
            revision: RevisionConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct RevisionConfig {
    /// Case count up to which all revisions go out as a single chunk
    #[serde(default = "default_soft_limit")]
    pub soft_limit: usize,

    /// Upper bound on cases per revision chunk
    #[serde(default = "default_hard_limit")]
    pub hard_limit: usize,

    /// Cap on concurrent revision calls
    #[serde(default = "default_revision_concurrency")]
    pub max_concurrency: usize,
}

impl Default for RevisionConfig {
    fn default() -> Self {
        Self {
            soft_limit: default_soft_limit(),
            hard_limit: default_hard_limit(),
            max_concurrency: default_revision_concurrency(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct PromptLimits {
    #[serde(default = "default_file_preview_chars")]
    pub file_preview_chars: usize,

    #[serde(default = "default_max_scenarios")]
    pub max_scenarios: usize,

    /// Earlier cases listed in sequential writer prompts
    #[serde(default = "default_history_cases")]
    pub history_cases: usize,
}

impl Default for PromptLimits {
    fn default() -> Self {
        Self {
            file_preview_chars: default_file_preview_chars(),
            max_scenarios: default_max_scenarios(),
            history_cases: default_history_cases(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    ClaudeCli,
    CodexCli,
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Provider::ClaudeCli => write!(f, "claude_cli"),
            Provider::CodexCli => write!(f, "codex_cli"),
        }
    }
}

impl std::str::FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "claude_cli" | "claude" => Ok(Provider::ClaudeCli),
            "codex_cli" | "codex" => Ok(Provider::CodexCli),
            _ => Err(format!("Unknown provider: {}", s)),
        }
    }
}
