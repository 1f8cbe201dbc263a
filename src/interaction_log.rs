use crate::provider::ModelTarget;
use chrono::Utc;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::warn;

/// One prompt/response exchange with a model
#[derive(Debug, Clone, Serialize)]
pub struct InteractionRecord {
    pub timestamp: String,
    pub run_id: String,
    pub provider: String,
    pub model: String,
    pub prompt_sha256: String,
    pub prompt: String,
    pub response: String,
    pub tags: Vec<String>,
}

impl InteractionRecord {
    pub fn new(
        run_id: &str,
        target: &ModelTarget,
        prompt: &str,
        response: &str,
        tags: Vec<String>,
    ) -> Self {
        let digest = Sha256::digest(prompt.as_bytes());
        Self {
            timestamp: Utc::now().to_rfc3339(),
            run_id: run_id.to_string(),
            provider: target.provider.to_string(),
            model: target.model.clone(),
            prompt_sha256: format!("{:x}", digest),
            prompt: prompt.to_string(),
            response: response.to_string(),
            tags,
        }
    }
}

/// Fire-and-forget sink for model exchanges; must never fail the caller
pub trait InteractionLog: Send + Sync {
    fn record(&self, record: &InteractionRecord);
}

pub struct NoopInteractionLog;

impl InteractionLog for NoopInteractionLog {
    fn record(&self, _record: &InteractionRecord) {}
}

/// Appends one JSON line per exchange
pub struct JsonlInteractionLog {
    path: PathBuf,
}

impl JsonlInteractionLog {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    fn append(&self, record: &InteractionRecord) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut line = serde_json::to_string(record)?;
        line.push('\n');
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())
    }
}

impl InteractionLog for JsonlInteractionLog {
    fn record(&self, record: &InteractionRecord) {
        if let Err(e) = self.append(record) {
            warn!(
                "Failed to write interaction log {}: {}",
                self.path.display(),
                e
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Provider;

    fn target() -> ModelTarget {
        ModelTarget {
            provider: Provider::ClaudeCli,
            model: "sonnet".to_string(),
        }
    }

    #[test]
    fn test_jsonl_log_appends_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs/interactions.jsonl");
        let log = JsonlInteractionLog::new(&path);

        log.record(&InteractionRecord::new("run-1", &target(), "p1", "r1", vec![]));
        log.record(&InteractionRecord::new(
            "run-1",
            &target(),
            "p2",
            "r2",
            vec!["stage:writer".to_string()],
        ));

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["prompt"], "p2");
        assert_eq!(second["tags"][0], "stage:writer");
        assert_eq!(second["provider"], "claude_cli");
    }

    #[test]
    fn test_unwritable_log_does_not_panic() {
        let dir = tempfile::tempdir().unwrap();
        // A directory cannot be opened for appending
        let log = JsonlInteractionLog::new(dir.path());
        log.record(&InteractionRecord::new("run-1", &target(), "p", "r", vec![]));
    }

    #[test]
    fn test_prompt_digest_is_stable() {
        let a = InteractionRecord::new("a", &target(), "same prompt", "x", vec![]);
        let b = InteractionRecord::new("b", &target(), "same prompt", "y", vec![]);
        assert_eq!(a.prompt_sha256, b.prompt_sha256);
        assert_eq!(a.prompt_sha256.len(), 64);
    }
}
