use tracing::debug;

use crate::ProviderId;
use crate::content::Role;
use crate::errors::{HarnessError, ProviderError};
use crate::provider::{ProviderAdapter, ProviderRequest, ProviderStreamHandle};
use crate::vendors::sse::{open_sse_response, sse_event_stream};

use super::config::OpenAiClientConfig;
use super::transport::OpenAiFrameMapper;

/// Provider id of the OpenAI adapter.
pub const OPENAI_PROVIDER: &str = "openai";

/// Provider adapter for OpenAI's Responses API (streaming).
pub struct OpenAiProvider {
    client: reqwest::Client,
    config: OpenAiClientConfig,
}

impl OpenAiProvider {
    /// Creates a provider from explicit client configuration.
    pub fn new(config: OpenAiClientConfig) -> Result<Self, HarnessError> {
        if config.api_key.trim().is_empty() {
            return Err(HarnessError::Config(
                "OpenAI client config api_key must not be empty".into(),
            ));
        }
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| HarnessError::Config(format!("failed to build OpenAI client: {e}")))?;
        Ok(Self { client, config })
    }

    /// Creates a provider using `OPENAI_API_KEY`.
    pub fn from_env() -> Result<Self, HarnessError> {
        Self::new(OpenAiClientConfig::from_env()?)
    }
}

#[async_trait::async_trait]
impl ProviderAdapter for OpenAiProvider {
    fn id(&self) -> ProviderId {
        ProviderId::new(OPENAI_PROVIDER)
    }

    async fn start_stream(
        &self,
        req: ProviderRequest,
    ) -> Result<ProviderStreamHandle, ProviderError> {
        let provider_id = self.id();
        let body = build_request_body(&req);
        debug!(run_id = %req.run_id, session_id = %req.session_id, model = %req.model.model, "starting OpenAI responses stream");

        let mut http_req = self
            .client
            .post(self.config.responses_url())
            .bearer_auth(&self.config.api_key)
            .json(&body);
        if let Some(timeout) = req.options.timeout {
            http_req = http_req.timeout(timeout);
        }

        let (bytes_stream, metadata) =
            open_sse_response(&provider_id, http_req, "x-request-id").await?;
        let mapper = OpenAiFrameMapper {
            provider: provider_id.clone(),
        };
        Ok(ProviderStreamHandle {
            stream: Box::pin(sse_event_stream(provider_id, bytes_stream, mapper)),
            metadata,
        })
    }
}

pub(crate) fn build_request_body(req: &ProviderRequest) -> serde_json::Value {
    let mut input = Vec::with_capacity(req.messages.len() + 1);
    if let Some(system_prompt) = req.system_prompt.as_deref() {
        input.push(serde_json::json!({
            "role": "system",
            "content": system_prompt,
        }));
    }
    for message in &req.messages {
        let role = match message.role {
            Role::User => "user",
            Role::Assistant => "assistant",
        };
        input.push(serde_json::json!({
            "role": role,
            "content": message.content,
        }));
    }

    serde_json::json!({
        "model": req.model.model,
        "input": input,
        "stream": true,
        "store": false,
        "max_output_tokens": req.options.max_output_tokens,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::Message;
    use crate::model::{ModelRef, RunOptions};

    fn request(system_prompt: Option<&str>) -> ProviderRequest {
        ProviderRequest {
            run_id: uuid::Uuid::new_v4(),
            session_id: uuid::Uuid::new_v4(),
            model: ModelRef::new("openai", "gpt-5-nano"),
            system_prompt: system_prompt.map(ToOwned::to_owned),
            messages: vec![Message::user("Say hello in 10 words or less")],
            options: RunOptions::default(),
        }
    }

    #[test]
    fn request_body_streams_without_storing() {
        let body = build_request_body(&request(None));
        assert_eq!(body["stream"], true);
        assert_eq!(body["store"], false);
        assert_eq!(body["model"], "gpt-5-nano");
        assert_eq!(body["max_output_tokens"], 1024);
        assert_eq!(body["input"].as_array().map(Vec::len), Some(1));
    }

    #[test]
    fn system_prompt_is_first_input_item() {
        let body = build_request_body(&request(Some("Keep responses brief.")));
        assert_eq!(body["input"][0]["role"], "system");
        assert_eq!(body["input"][1]["content"], "Say hello in 10 words or less");
    }

    #[test]
    fn empty_api_key_is_config_error() {
        assert!(matches!(
            OpenAiProvider::new(OpenAiClientConfig::new("  ")),
            Err(HarnessError::Config(_))
        ));
    }

    #[tokio::test]
    async fn env_gated_smoke_stream_finishes_if_key_present() {
        if std::env::var("OPENAI_API_KEY")
            .unwrap_or_default()
            .trim()
            .is_empty()
        {
            eprintln!("skipping OpenAI stream smoke test (OPENAI_API_KEY missing)");
            return;
        }

        let harness = crate::Harness::builder()
            .register_provider(std::sync::Arc::new(
                OpenAiProvider::from_env().expect("provider"),
            ))
            .build()
            .expect("harness");

        let mut run = harness
            .session(crate::SessionConfig::named("smoke-stream"))
            .run(ModelRef::new("openai", "gpt-5-nano"))
            .timeout(std::time::Duration::from_secs(30))
            .system_prompt("Reply with a short greeting.")
            .user_text("hello")
            .start_stream()
            .await
            .expect("start stream");

        let mut saw_finish = false;
        while let Some(event) = run.next_event().await {
            match event {
                crate::StreamEvent::Finish { .. } => saw_finish = true,
                crate::StreamEvent::Error { error, .. } => panic!("OpenAI smoke failed: {error}"),
                _ => {}
            }
        }
        assert!(saw_finish, "expected finish event");
    }
}
