use tracing::debug;

use crate::ProviderId;
use crate::content::Role;
use crate::errors::{HarnessError, ProviderError};
use crate::provider::{ProviderAdapter, ProviderRequest, ProviderStreamHandle};
use crate::vendors::sse::{open_sse_response, sse_event_stream};

use super::config::AnthropicClientConfig;
use super::transport::AnthropicFrameMapper;

/// Provider id of the Anthropic adapter.
pub const ANTHROPIC_PROVIDER: &str = "anthropic";

/// Provider adapter for Anthropic's Messages API (streaming).
pub struct AnthropicProvider {
    client: reqwest::Client,
    config: AnthropicClientConfig,
}

impl AnthropicProvider {
    /// Creates a provider from explicit client configuration.
    pub fn new(config: AnthropicClientConfig) -> Result<Self, HarnessError> {
        if config.api_key.trim().is_empty() {
            return Err(HarnessError::Config(
                "Anthropic client config api_key must not be empty".into(),
            ));
        }
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                HarnessError::Config(format!("failed to build Anthropic client: {e}"))
            })?;
        Ok(Self { client, config })
    }

    /// Creates a provider using `ANTHROPIC_API_KEY`.
    pub fn from_env() -> Result<Self, HarnessError> {
        Self::new(AnthropicClientConfig::from_env()?)
    }
}

#[async_trait::async_trait]
impl ProviderAdapter for AnthropicProvider {
    fn id(&self) -> ProviderId {
        ProviderId::new(ANTHROPIC_PROVIDER)
    }

    async fn start_stream(
        &self,
        req: ProviderRequest,
    ) -> Result<ProviderStreamHandle, ProviderError> {
        let provider_id = self.id();
        let body = build_request_body(&req);
        debug!(run_id = %req.run_id, session_id = %req.session_id, model = %req.model.model, "starting Anthropic messages stream");

        let mut http_req = self
            .client
            .post(self.config.messages_url())
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", &self.config.api_version)
            .json(&body);
        if let Some(timeout) = req.options.timeout {
            http_req = http_req.timeout(timeout);
        }

        let (bytes_stream, metadata) =
            open_sse_response(&provider_id, http_req, "request-id").await?;
        let mapper = AnthropicFrameMapper::new(provider_id.clone());
        Ok(ProviderStreamHandle {
            stream: Box::pin(sse_event_stream(provider_id, bytes_stream, mapper)),
            metadata,
        })
    }
}

pub(crate) fn build_request_body(req: &ProviderRequest) -> serde_json::Value {
    let messages: Vec<serde_json::Value> = req
        .messages
        .iter()
        .map(|message| {
            let role = match message.role {
                Role::User => "user",
                Role::Assistant => "assistant",
            };
            serde_json::json!({ "role": role, "content": message.content })
        })
        .collect();

    let mut body = serde_json::json!({
        "model": req.model.model,
        "max_tokens": req.options.max_output_tokens,
        "stream": true,
        "messages": messages,
    });
    if let Some(system_prompt) = req.system_prompt.as_deref() {
        body["system"] = serde_json::Value::String(system_prompt.to_string());
    }
    body
}
