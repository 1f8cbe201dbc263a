use super::{render_prompt, ModelClient, ModelRequest};
use crate::error::ProviderError;
use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;
use tokio::process::Command;

pub struct ClaudeRunner {
    pub binary: PathBuf,
    pub permission_mode: String,
}

/// Claude wraps the answer in {"result": "...", ...} when run with --output-format json
#[derive(Deserialize)]
struct ClaudeOutput {
    result: String,
}

fn unwrap_result(stdout: &str) -> String {
    match serde_json::from_str::<ClaudeOutput>(stdout.trim()) {
        Ok(out) => out.result,
        Err(_) => stdout.to_string(),
    }
}

#[async_trait]
impl ModelClient for ClaudeRunner {
    fn name(&self) -> &'static str {
        "claude_cli"
    }

    async fn complete(&self, request: &ModelRequest<'_>) -> Result<String, ProviderError> {
        let full_prompt = render_prompt(request);

        // Build command - use string for PATH lookup if not an absolute/relative path
        let binary_str = self.binary.to_string_lossy();
        let mut cmd = if binary_str.contains('/') || binary_str.contains('\\') {
            Command::new(&self.binary)
        } else {
            Command::new(binary_str.as_ref())
        };

        // Ensure subscription auth is used (not API key)
        cmd.env_remove("ANTHROPIC_API_KEY");
        cmd.kill_on_drop(true);

        cmd.arg("-p")
            .arg(&full_prompt)
            .arg("--model")
            .arg(request.model)
            .arg("--output-format")
            .arg("json")
            .arg("--permission-mode")
            .arg(&self.permission_mode);

        let output = cmd.output().await.map_err(ProviderError::Io)?;

        if !output.status.success() {
            return Err(ProviderError::NonZeroExit {
                code: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            });
        }

        Ok(unwrap_result(&String::from_utf8_lossy(&output.stdout)))
    }
}
