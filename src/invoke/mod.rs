//! Structured model invocation with schema validation and bounded recovery.

mod cleanup;
mod contract;
mod recovery;

pub use contract::{decode_list, schema_of, Contract};
pub use recovery::{next_step, Failure, Step};

use crate::error::{InvokeError, ProviderError};
use crate::interaction_log::{InteractionLog, InteractionRecord};
use crate::provider::{ClientRegistry, ModelClient, ModelRequest, ModelTarget};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// Calls a model and turns its answer into a validated contract.
///
/// At most two model calls happen per `invoke`: the direct call and, when a
/// retry instruction is given, one corrective call. The transitions live in
/// `recovery::next_step`.
pub struct StructuredInvoker<'a> {
    clients: &'a ClientRegistry,
    log: &'a dyn InteractionLog,
    timeout: Duration,
    run_id: &'a str,
}

impl<'a> StructuredInvoker<'a> {
    pub fn new(
        clients: &'a ClientRegistry,
        log: &'a dyn InteractionLog,
        timeout: Duration,
        run_id: &'a str,
    ) -> Self {
        Self {
            clients,
            log,
            timeout,
            run_id,
        }
    }

    pub async fn invoke<C: Contract>(
        &self,
        target: &ModelTarget,
        prompt: &str,
        retry_instruction: Option<&str>,
        tags: &[String],
    ) -> Result<C, InvokeError> {
        let client = self
            .clients
            .get(target.provider)
            .ok_or(ProviderError::Unregistered(target.provider))?;
        let schema = C::schema();

        let mut step = Step::Direct;
        let mut raw = String::new();

        loop {
            let outcome: Result<C, (Failure, InvokeError)> = match step {
                Step::Direct | Step::Retry => {
                    let call_prompt = match (step, retry_instruction) {
                        (Step::Retry, Some(instruction)) => format!("{}\n\n{}", prompt, instruction),
                        _ => prompt.to_string(),
                    };
                    match self
                        .call(client.as_ref(), target, &call_prompt, &schema, tags, step)
                        .await
                    {
                        Err(e) => Err((Failure::Transport, e.into())),
                        Ok(text) if text.trim().is_empty() => Err((
                            Failure::Empty,
                            InvokeError::EmptyResponse { contract: C::NAME },
                        )),
                        Ok(text) => {
                            raw = text;
                            parse_direct::<C>(&raw)
                        }
                    }
                }
                Step::Cleanup | Step::RetryCleanup => parse_cleaned::<C>(&raw),
            };

            match outcome {
                Ok(value) => {
                    debug!("{} accepted at step {} from {}", C::NAME, step, target);
                    return Ok(value);
                }
                Err((failure, err)) => match next_step(step, failure, retry_instruction.is_some()) {
                    Some(next) => {
                        debug!("{} failed at step {} ({}); trying {}", C::NAME, step, err, next);
                        step = next;
                    }
                    None => {
                        warn!("{} invocation on {} gave up at step {}: {}", C::NAME, target, step, err);
                        return Err(err);
                    }
                },
            }
        }
    }

    async fn call(
        &self,
        client: &dyn ModelClient,
        target: &ModelTarget,
        prompt: &str,
        schema: &Value,
        tags: &[String],
        step: Step,
    ) -> Result<String, ProviderError> {
        let request = ModelRequest {
            model: &target.model,
            prompt,
            schema,
        };

        debug!(
            "Invoking {} via {} with {} byte prompt ({})",
            target,
            client.name(),
            prompt.len(),
            step
        );

        let result = match tokio::time::timeout(self.timeout, client.complete(&request)).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout(self.timeout)),
        };

        let response = match &result {
            Ok(text) => text.clone(),
            Err(e) => format!("<error: {}>", e),
        };
        let mut record_tags = tags.to_vec();
        record_tags.push(format!("attempt:{}", step));
        self.log.record(&InteractionRecord::new(
            self.run_id,
            target,
            prompt,
            &response,
            record_tags,
        ));

        result
    }
}

fn parse_direct<C: Contract>(raw: &str) -> Result<C, (Failure, InvokeError)> {
    let value = serde_json::from_str::<Value>(raw.trim())
        .map_err(|e| schema_failure::<C>(vec![format!("invalid JSON: {}", e)], raw))?;
    C::validate(value).map_err(|errors| schema_failure::<C>(errors, raw))
}

fn parse_cleaned<C: Contract>(raw: &str) -> Result<C, (Failure, InvokeError)> {
    let value = cleanup::extract_json(raw).map_err(|e| schema_failure::<C>(vec![e], raw))?;
    C::validate(value).map_err(|errors| schema_failure::<C>(errors, raw))
}

fn schema_failure<C: Contract>(errors: Vec<String>, raw: &str) -> (Failure, InvokeError) {
    (
        Failure::Schema,
        InvokeError::SchemaValidation {
            contract: C::NAME,
            errors,
            raw_text: raw.to_string(),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Provider;
    use crate::interaction_log::NoopInteractionLog;
    use crate::testing::{registry_with, ScriptedClient};
    use serde::Deserialize;
    use std::sync::Arc;

    #[derive(Debug, Deserialize, schemars::JsonSchema)]
    struct Answer {
        value: u32,
    }

    impl Contract for Answer {
        const NAME: &'static str = "answer";

        fn schema() -> Value {
            schema_of::<Answer>()
        }

        fn validate(value: Value) -> Result<Self, Vec<String>> {
            serde_json::from_value(value).map_err(|e| vec![e.to_string()])
        }
    }

    fn target() -> ModelTarget {
        ModelTarget {
            provider: Provider::ClaudeCli,
            model: "sonnet".to_string(),
        }
    }

    async fn run(
        client: Arc<ScriptedClient>,
        retry: Option<&str>,
    ) -> Result<Answer, InvokeError> {
        let registry = registry_with(client);
        let log = NoopInteractionLog;
        let invoker = StructuredInvoker::new(&registry, &log, Duration::from_secs(5), "run");
        invoker.invoke::<Answer>(&target(), "question", retry, &[]).await
    }

    #[tokio::test]
    async fn test_direct_success_single_call() {
        let client = Arc::new(ScriptedClient::sequence(vec![Ok(r#"{"value": 7}"#)]));
        let answer = run(client.clone(), Some("fix it")).await.unwrap();
        assert_eq!(answer.value, 7);
        assert_eq!(client.call_count(), 1);
    }

    #[tokio::test]
    async fn test_cleanup_recovers_fenced_output() {
        let client = Arc::new(ScriptedClient::sequence(vec![Ok(
            "Result:\n```json\n{\"value\": 3}\n```",
        )]));
        let answer = run(client.clone(), None).await.unwrap();
        assert_eq!(answer.value, 3);
        assert_eq!(client.call_count(), 1);
    }

    #[tokio::test]
    async fn test_retry_instruction_appended_once() {
        let client = Arc::new(ScriptedClient::sequence(vec![
            Ok("I cannot answer in JSON"),
            Ok(r#"{"value": 9}"#),
        ]));
        let answer = run(client.clone(), Some("Respond with JSON only.")).await.unwrap();
        assert_eq!(answer.value, 9);

        let calls = client.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0], "question");
        assert_eq!(calls[1], "question\n\nRespond with JSON only.");
    }

    #[tokio::test]
    async fn test_gives_up_after_two_calls() {
        let client = Arc::new(ScriptedClient::sequence(vec![
            Ok("nope"),
            Ok(r#"{"value": "not a number"}"#),
            Ok(r#"{"value": 1}"#),
        ]));
        let err = run(client.clone(), Some("again")).await.unwrap_err();
        assert_eq!(client.call_count(), 2);
        match err {
            InvokeError::SchemaValidation { raw_text, .. } => {
                assert!(raw_text.contains("not a number"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_no_retry_without_instruction() {
        let client = Arc::new(ScriptedClient::sequence(vec![Ok("garbage"), Ok(r#"{"value": 1}"#)]));
        let err = run(client.clone(), None).await.unwrap_err();
        assert_eq!(client.call_count(), 1);
        assert_eq!(err.raw_text(), Some("garbage"));
    }

    #[tokio::test]
    async fn test_empty_response_retries_then_fails() {
        let client = Arc::new(ScriptedClient::sequence(vec![Ok("  "), Ok("")]));
        let err = run(client.clone(), Some("again")).await.unwrap_err();
        assert!(matches!(err, InvokeError::EmptyResponse { contract: "answer" }));
        assert_eq!(client.call_count(), 2);
    }

    #[tokio::test]
    async fn test_transport_error_not_retried() {
        let client = Arc::new(ScriptedClient::sequence(vec![Err("boom"), Ok(r#"{"value": 1}"#)]));
        let err = run(client.clone(), Some("again")).await.unwrap_err();
        assert!(matches!(err, InvokeError::Provider(ProviderError::NonZeroExit { .. })));
        assert_eq!(client.call_count(), 1);
    }

    #[tokio::test]
    async fn test_timeout_surfaces_as_provider_error() {
        let client = Arc::new(
            ScriptedClient::sequence(vec![Ok(r#"{"value": 1}"#)])
                .with_delay(Duration::from_millis(200)),
        );
        let registry = registry_with(client);
        let log = NoopInteractionLog;
        let invoker = StructuredInvoker::new(&registry, &log, Duration::from_millis(20), "run");
        let err = invoker
            .invoke::<Answer>(&target(), "q", Some("again"), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, InvokeError::Provider(ProviderError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_unregistered_provider() {
        let registry = ClientRegistry::new();
        let log = NoopInteractionLog;
        let invoker = StructuredInvoker::new(&registry, &log, Duration::from_secs(1), "run");
        let err = invoker.invoke::<Answer>(&target(), "q", None, &[]).await.unwrap_err();
        assert!(matches!(
            err,
            InvokeError::Provider(ProviderError::Unregistered(Provider::ClaudeCli))
        ));
    }
}
