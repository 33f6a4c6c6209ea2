use std::collections::HashMap;
use std::sync::Arc;

use crate::errors::HarnessError;
use crate::model::ProviderId;
use crate::provider::ProviderAdapter;
use crate::session::{Session, SessionConfig};

pub(crate) struct HarnessInner {
    providers: HashMap<ProviderId, Arc<dyn ProviderAdapter>>,
}

impl HarnessInner {
    pub(crate) fn provider(&self, id: &ProviderId) -> Option<Arc<dyn ProviderAdapter>> {
        self.providers.get(id).cloned()
    }
}

/// Entry point for creating sessions and running models.
#[derive(Clone)]
pub struct Harness {
    pub(crate) inner: Arc<HarnessInner>,
}

impl Harness {
    /// Starts a builder for registering providers and creating a `Harness`.
    pub fn builder() -> HarnessBuilder {
        HarnessBuilder::default()
    }

    /// Creates a logical session for grouping related runs.
    pub fn session(&self, config: SessionConfig) -> Session {
        Session::new(self.inner.clone(), config)
    }

    /// Returns true when a provider with this id is registered.
    pub fn has_provider(&self, id: &ProviderId) -> bool {
        self.inner.providers.contains_key(id)
    }
}

/// Builder used to register provider adapters before creating a `Harness`.
#[derive(Default)]
pub struct HarnessBuilder {
    providers: Vec<Arc<dyn ProviderAdapter>>,
}

impl HarnessBuilder {
    /// Registers a provider adapter. One adapter per provider id.
    pub fn register_provider(mut self, provider: Arc<dyn ProviderAdapter>) -> Self {
        self.providers.push(provider);
        self
    }

    /// Builds the harness, rejecting duplicate provider ids.
    pub fn build(self) -> Result<Harness, HarnessError> {
        let mut map: HashMap<ProviderId, Arc<dyn ProviderAdapter>> = HashMap::new();
        for provider in self.providers {
            let id = provider.id();
            if map.contains_key(&id) {
                return Err(HarnessError::Config(format!(
                    "duplicate provider registration: {id}"
                )));
            }
            map.insert(id, provider);
        }
        Ok(Harness {
            inner: Arc::new(HarnessInner { providers: map }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ProviderError;
    use crate::provider::{ProviderRequest, ProviderStreamHandle};

    struct DummyProvider(&'static str);

    #[async_trait::async_trait]
    impl ProviderAdapter for DummyProvider {
        fn id(&self) -> ProviderId {
            ProviderId::new(self.0)
        }

        async fn start_stream(
            &self,
            _req: ProviderRequest,
        ) -> Result<ProviderStreamHandle, ProviderError> {
            unreachable!("not used in this test")
        }
    }

    #[test]
    fn build_rejects_duplicate_provider_ids() {
        let result = Harness::builder()
            .register_provider(Arc::new(DummyProvider("dummy")))
            .register_provider(Arc::new(DummyProvider("dummy")))
            .build();
        assert!(
            matches!(result, Err(HarnessError::Config(message)) if message.contains("duplicate provider"))
        );
    }

    #[test]
    fn build_registers_distinct_providers() {
        let harness = Harness::builder()
            .register_provider(Arc::new(DummyProvider("anthropic")))
            .register_provider(Arc::new(DummyProvider("openai")))
            .build()
            .expect("harness");
        assert!(harness.has_provider(&ProviderId::new("anthropic")));
        assert!(harness.has_provider(&ProviderId::new("openai")));
        assert!(!harness.has_provider(&ProviderId::new("bedrock")));
    }
}
