//! In-process doubles for the model backend and progress sink.

use crate::config::Provider;
use crate::error::ProviderError;
use crate::pipeline::{PlanItem, ProgressEvent, ProgressSink};
use crate::provider::{ClientRegistry, ModelClient, ModelRequest};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

type Responder = Box<dyn Fn(&str) -> Result<String, String> + Send + Sync>;

/// Model client answering from a closure over the prompt text
pub struct ScriptedClient {
    responder: Responder,
    calls: Mutex<Vec<String>>,
    delay: Option<Duration>,
}

impl ScriptedClient {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&str) -> Result<String, String> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            calls: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    /// Replies in order; `Err` entries become process failures
    pub fn sequence(replies: Vec<Result<&str, &str>>) -> Self {
        let replies: Vec<Result<String, String>> = replies
            .into_iter()
            .map(|r| r.map(str::to_string).map_err(str::to_string))
            .collect();
        let next = AtomicUsize::new(0);
        Self::new(move |_| {
            let idx = next.fetch_add(1, Ordering::SeqCst);
            replies
                .get(idx)
                .cloned()
                .unwrap_or_else(|| Err("script exhausted".to_string()))
        })
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl ModelClient for ScriptedClient {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn complete(&self, request: &ModelRequest<'_>) -> Result<String, ProviderError> {
        self.calls.lock().unwrap().push(request.prompt.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        (self.responder)(request.prompt)
            .map_err(|stderr| ProviderError::NonZeroExit { code: 1, stderr })
    }
}

/// Registry serving every provider from the same client
pub fn registry_with(client: Arc<ScriptedClient>) -> ClientRegistry {
    let mut registry = ClientRegistry::new();
    registry.register(Provider::ClaudeCli, client.clone());
    registry.register(Provider::CodexCli, client);
    registry
}

#[derive(Default)]
pub struct RecordingProgress {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingProgress {
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl ProgressSink for RecordingProgress {
    fn emit(&self, event: ProgressEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// Plan id from a writer prompt's "Plan item <id>: <title>" heading
pub fn plan_id_in(prompt: &str) -> Option<String> {
    let rest = &prompt[prompt.find("Plan item ")? + "Plan item ".len()..];
    rest.find(':').map(|end| rest[..end].to_string())
}

/// Case ids from a revision prompt's "Cases to revise:" line
pub fn revision_ids_in(prompt: &str) -> Vec<String> {
    prompt
        .lines()
        .find_map(|line| line.strip_prefix("Cases to revise: "))
        .map(|ids| ids.split(", ").map(str::to_string).collect())
        .unwrap_or_default()
}

pub fn plan_item(id: &str, title: &str) -> PlanItem {
    PlanItem {
        id: id.to_string(),
        title: title.to_string(),
        area: "general".to_string(),
        focus: None,
        estimated_cases: None,
        chunk_refs: None,
        notes: None,
    }
}
