use super::{render_prompt, ModelClient, ModelRequest};
use crate::error::ProviderError;
use async_trait::async_trait;
use std::path::PathBuf;
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

pub struct CodexRunner {
    pub binary: PathBuf,
}

#[async_trait]
impl ModelClient for CodexRunner {
    fn name(&self) -> &'static str {
        "codex_cli"
    }

    async fn complete(&self, request: &ModelRequest<'_>) -> Result<String, ProviderError> {
        let full_prompt = render_prompt(request);

        // Final assistant message lands in this file
        let out_file = NamedTempFile::new().map_err(ProviderError::Io)?;
        let out_path = out_file.path().to_path_buf();

        // Use string for PATH lookup if not an absolute/relative path
        let binary_str = self.binary.to_string_lossy();
        let mut cmd = if binary_str.contains('/') || binary_str.contains('\\') {
            Command::new(&self.binary)
        } else {
            Command::new(binary_str.as_ref())
        };

        cmd.arg("exec")
            .arg("--model")
            .arg(request.model)
            .arg("--output-last-message")
            .arg(&out_path)
            // Read prompt from stdin
            .arg("-");

        cmd.kill_on_drop(true);
        cmd.stdin(std::process::Stdio::piped());
        cmd.stdout(std::process::Stdio::piped());
        cmd.stderr(std::process::Stdio::piped());

        let mut child = cmd.spawn().map_err(ProviderError::Io)?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(full_prompt.as_bytes())
                .await
                .map_err(ProviderError::Io)?;
            stdin.shutdown().await.map_err(ProviderError::Io)?;
        }

        let output = child.wait_with_output().await.map_err(ProviderError::Io)?;

        if !output.status.success() {
            return Err(ProviderError::NonZeroExit {
                code: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            });
        }

        tokio::fs::read_to_string(&out_path)
            .await
            .map_err(|e| ProviderError::MissingOutput(format!("{}: {}", out_path.display(), e)))
    }
}
