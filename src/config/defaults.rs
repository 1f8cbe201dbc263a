use std::path::PathBuf;

use super::Provider;

pub fn default_version() -> u32 {
    1
}

pub fn default_report_dir() -> PathBuf {
    PathBuf::from("reports")
}

pub fn default_timeout_sec() -> u64 {
    300
}

pub fn default_claude_binary() -> PathBuf {
    // Check common install location first
    if let Some(home) = std::env::var_os("HOME") {
        let local_path = PathBuf::from(home).join(".claude/local/claude");
        if local_path.exists() {
            return local_path;
        }
    }
    // Fall back to PATH lookup
    PathBuf::from("claude")
}

pub fn default_permission_mode() -> String {
    "default".to_string()
}

pub fn default_codex_binary() -> PathBuf {
    PathBuf::from("codex")
}

pub fn default_provider() -> Provider {
    Provider::ClaudeCli
}

pub fn default_model() -> String {
    "sonnet".to_string()
}

pub fn default_true() -> bool {
    true
}

pub fn default_max_review_passes() -> u32 {
    2
}

pub fn default_writer_concurrency() -> usize {
    1
}

pub fn default_soft_limit() -> usize {
    12
}

pub fn default_hard_limit() -> usize {
    16
}

pub fn default_revision_concurrency() -> usize {
    3
}

pub fn default_file_preview_chars() -> usize {
    1500
}

pub fn default_max_scenarios() -> usize {
    25
}

pub fn default_history_cases() -> usize {
    80
}
