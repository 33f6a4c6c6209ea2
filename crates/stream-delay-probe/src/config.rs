use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use stream_delay_harness::vendors::{anthropic::ANTHROPIC_PROVIDER, openai::OPENAI_PROVIDER};
use stream_delay_harness::{AgentConfig, ModelRef};

use crate::outcome::ProbeError;

pub const PROVIDER_ENV: &str = "STREAM_DELAY_PROVIDER";
pub const DIRECT_MODEL_ENV: &str = "STREAM_DELAY_DIRECT_MODEL";
pub const AGENT_MODEL_ENV: &str = "STREAM_DELAY_AGENT_MODEL";

/// Prompt sent by both probes.
pub const PROBE_PROMPT: &str = "Say hello in 10 words or less";

/// Load `.env` from the crate directory and then the working directory.
pub fn load_dotenv() {
    let _ = dotenvy::from_path(Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/.env")));
    dotenvy::dotenv().ok();
}

/// Vendor the probes talk to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ProviderKind {
    #[default]
    Anthropic,
    OpenAi,
}

impl ProviderKind {
    pub fn id(self) -> &'static str {
        match self {
            ProviderKind::Anthropic => ANTHROPIC_PROVIDER,
            ProviderKind::OpenAi => OPENAI_PROVIDER,
        }
    }

    fn default_direct_model(self) -> &'static str {
        match self {
            ProviderKind::Anthropic => "claude-haiku-4-5-20251001",
            ProviderKind::OpenAi => "gpt-5-nano",
        }
    }

    fn default_agent_model(self) -> &'static str {
        match self {
            ProviderKind::Anthropic => "claude-3-5-sonnet-20241022",
            ProviderKind::OpenAi => "gpt-5-nano",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for ProviderKind {
    type Err = ProbeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "anthropic" | "claude" => Ok(ProviderKind::Anthropic),
            "openai" => Ok(ProviderKind::OpenAi),
            other => Err(ProbeError::Config(format!(
                "unsupported {PROVIDER_ENV} value: {other:?} (expected anthropic or openai)"
            ))),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn provider_from(lookup: &impl Fn(&str) -> Option<String>) -> Result<ProviderKind, ProbeError> {
    non_empty(lookup(PROVIDER_ENV))
        .map(|v| v.parse::<ProviderKind>())
        .transpose()
        .map(Option::unwrap_or_default)
}

/// Settings of the direct-stream probe.
#[derive(Clone, Debug)]
pub struct DirectProbeConfig {
    pub provider: ProviderKind,
    pub model: ModelRef,
    pub prompt: String,
    /// Delay at or above which the issue counts as confirmed.
    pub delay_threshold: Duration,
    pub max_output_tokens: u32,
}

impl DirectProbeConfig {
    pub fn for_provider(provider: ProviderKind) -> Self {
        Self {
            provider,
            model: ModelRef::new(provider.id(), provider.default_direct_model()),
            prompt: PROBE_PROMPT.to_string(),
            delay_threshold: Duration::from_millis(2000),
            max_output_tokens: 256,
        }
    }

    pub fn from_env() -> Result<Self, ProbeError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolves provider and model through `lookup` (an env-var reader in
    /// production).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ProbeError> {
        let mut config = Self::for_provider(provider_from(&lookup)?);
        if let Some(model) = non_empty(lookup(DIRECT_MODEL_ENV)) {
            config.model.model = model;
        }
        Ok(config)
    }
}

/// Settings of the agent-stream probe.
#[derive(Clone, Debug)]
pub struct AgentProbeConfig {
    pub provider: ProviderKind,
    pub agent_name: String,
    pub instructions: String,
    pub model: ModelRef,
    pub message: String,
    /// Delay at or above which the bug counts as confirmed.
    pub delay_threshold: Duration,
    /// Close latency a healthy iterator is expected to stay within.
    pub expected_close: Duration,
}

impl AgentProbeConfig {
    pub fn for_provider(provider: ProviderKind) -> Self {
        Self {
            provider,
            agent_name: "test-agent".to_string(),
            instructions: "You are a helpful assistant. Keep responses brief.".to_string(),
            model: ModelRef::new(provider.id(), provider.default_agent_model()),
            message: PROBE_PROMPT.to_string(),
            delay_threshold: Duration::from_millis(1000),
            expected_close: Duration::from_millis(100),
        }
    }

    pub fn from_env() -> Result<Self, ProbeError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ProbeError> {
        let mut config = Self::for_provider(provider_from(&lookup)?);
        if let Some(model) = non_empty(lookup(AGENT_MODEL_ENV)) {
            config.model.model = model;
        }
        Ok(config)
    }

    pub fn agent_config(&self) -> AgentConfig {
        AgentConfig {
            name: self.agent_name.clone(),
            instructions: self.instructions.clone(),
            model: self.model.clone(),
        }
    }
}
