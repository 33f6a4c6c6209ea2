use std::time::Duration;

use crate::errors::HarnessError;

/// Configuration for the Anthropic provider client.
#[derive(Clone, Debug)]
pub struct AnthropicClientConfig {
    /// API key sent as `x-api-key`.
    pub api_key: String,
    /// Base URL for the Messages API; override for proxies or local test servers.
    pub base_url: String,
    /// Value of the `anthropic-version` header.
    pub api_version: String,
    /// Default HTTP timeout for requests.
    pub timeout: Duration,
}

impl AnthropicClientConfig {
    /// Creates a config with defaults and a provided API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: "https://api.anthropic.com".to_string(),
            api_version: "2023-06-01".to_string(),
            timeout: Duration::from_secs(120),
        }
    }

    /// Builds a config from `ANTHROPIC_API_KEY` and an optional `ANTHROPIC_BASE_URL`.
    pub fn from_env() -> Result<Self, HarnessError> {
        let api_key = std::env::var("ANTHROPIC_API_KEY").unwrap_or_default();
        if api_key.trim().is_empty() {
            return Err(HarnessError::Config(
                "missing ANTHROPIC_API_KEY for Anthropic provider".into(),
            ));
        }
        let config = Self::new(api_key);
        Ok(match std::env::var("ANTHROPIC_BASE_URL") {
            Ok(url) if !url.trim().is_empty() => config.base_url(url.trim()),
            _ => config,
        })
    }

    /// Overrides the API base URL.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Overrides the default HTTP timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub(crate) fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.base_url.trim_end_matches('/'))
    }
}
