mod claude;
mod codex;

pub use claude::ClaudeRunner;
pub use codex::CodexRunner;

use crate::config::{Config, Provider};
use crate::error::ProviderError;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

/// Resolved provider and model for one pipeline stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelTarget {
    pub provider: Provider,
    pub model: String,
}

impl std::fmt::Display for ModelTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.provider, self.model)
    }
}

/// One model call: the prompt plus the JSON schema the answer must satisfy
#[derive(Debug, Clone)]
pub struct ModelRequest<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
    pub schema: &'a serde_json::Value,
}

#[async_trait]
pub trait ModelClient: Send + Sync {
    fn name(&self) -> &'static str;

    /// Run the request and return the model's raw text answer
    async fn complete(&self, request: &ModelRequest<'_>) -> Result<String, ProviderError>;
}

/// Append the response schema to the prompt so CLI backends see it
pub fn render_prompt(request: &ModelRequest<'_>) -> String {
    let schema = serde_json::to_string_pretty(request.schema).unwrap_or_default();
    format!(
        "{}\n\n## Response Format\n\nRespond with a single JSON value and nothing else. \
        It must validate against this JSON Schema:\n\n```json\n{}\n```",
        request.prompt, schema
    )
}

/// Clients available to a pipeline run, keyed by provider
#[derive(Clone, Default)]
pub struct ClientRegistry {
    clients: HashMap<Provider, Arc<dyn ModelClient>>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the CLI-backed clients described by the config
    pub fn from_config(config: &Config) -> Self {
        let mut registry = Self::new();
        registry.register(
            Provider::ClaudeCli,
            Arc::new(ClaudeRunner {
                binary: config.providers.claude_cli.binary.clone(),
                permission_mode: config.providers.claude_cli.permission_mode.clone(),
            }),
        );
        registry.register(
            Provider::CodexCli,
            Arc::new(CodexRunner {
                binary: config.providers.codex_cli.binary.clone(),
            }),
        );
        registry
    }

    pub fn register(&mut self, provider: Provider, client: Arc<dyn ModelClient>) {
        self.clients.insert(provider, client);
    }

    pub fn get(&self, provider: Provider) -> Option<Arc<dyn ModelClient>> {
        self.clients.get(&provider).cloned()
    }

    pub fn contains(&self, provider: Provider) -> bool {
        self.clients.contains_key(&provider)
    }
}
