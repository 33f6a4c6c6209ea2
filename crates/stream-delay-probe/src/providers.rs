use std::sync::Arc;

use stream_delay_harness::vendors::anthropic::AnthropicProvider;
use stream_delay_harness::vendors::openai::OpenAiProvider;
use stream_delay_harness::{Harness, HarnessError, ProviderAdapter};

use crate::config::ProviderKind;

/// Builds a harness with the selected vendor, reading credentials from the
/// environment.
pub fn harness_from_env(kind: ProviderKind) -> Result<Harness, HarnessError> {
    let provider: Arc<dyn ProviderAdapter> = match kind {
        ProviderKind::Anthropic => Arc::new(AnthropicProvider::from_env()?),
        ProviderKind::OpenAi => Arc::new(OpenAiProvider::from_env()?),
    };
    tracing::debug!(provider = %kind, "registering provider");
    Harness::builder().register_provider(provider).build()
}
