use std::pin::Pin;

use crate::content::{Message, Usage};
use crate::errors::ProviderError;
use crate::model::{ModelRef, ProviderId, RunOptions};

/// Vendor-neutral event produced by a provider adapter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProviderEvent {
    /// Incremental text fragment (may be empty).
    TextDelta { text: String },
    /// The current text segment is complete.
    TextEnd,
    /// The provider reported the generation as finished.
    Finish {
        finish_reason: Option<String>,
        usage: Option<Usage>,
    },
}

/// Fully validated request handed to a provider adapter.
#[derive(Clone, Debug)]
pub struct ProviderRequest {
    pub run_id: uuid::Uuid,
    pub session_id: uuid::Uuid,
    pub model: ModelRef,
    pub system_prompt: Option<String>,
    pub messages: Vec<Message>,
    pub options: RunOptions,
}

/// Response metadata captured when the provider accepted the request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProviderResponseMeta {
    /// Vendor request id header, when present.
    pub request_id: Option<String>,
}

pub type ProviderEventStream =
    Pin<Box<dyn futures::Stream<Item = Result<ProviderEvent, ProviderError>> + Send + 'static>>;

/// Accepted provider stream plus response metadata.
pub struct ProviderStreamHandle {
    pub stream: ProviderEventStream,
    pub metadata: ProviderResponseMeta,
}

/// Contract implemented by every vendor integration.
///
/// `start_stream` resolves once the provider has accepted the request; the
/// returned stream ends when the vendor transport closes.
#[async_trait::async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Provider id used for registration and model routing.
    fn id(&self) -> ProviderId;

    /// Issues the request and returns the provider event stream.
    async fn start_stream(
        &self,
        req: ProviderRequest,
    ) -> Result<ProviderStreamHandle, ProviderError>;
}
