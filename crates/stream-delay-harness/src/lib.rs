//! Streaming model client used by the stream-delay probes.
//!
//! Every run is normalized into the same event sequence (`RunStarted`,
//! `TextDelta`*, `TextEnd`, `Finish`, or a terminal `Error`) and the sequence
//! only ends once the vendor transport has closed. Vendor-specific APIs are
//! namespaced under `vendors::*`.
//!
//! # Direct streaming
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use futures::StreamExt as _;
//! use stream_delay_harness::prelude::*;
//! use stream_delay_harness::vendors::anthropic::AnthropicProvider;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), HarnessError> {
//! let harness = Harness::builder()
//!     .register_provider(Arc::new(AnthropicProvider::from_env()?))
//!     .build()?;
//!
//! let mut run = harness
//!     .session(SessionConfig::named("demo"))
//!     .run(ModelRef::new("anthropic", "claude-haiku-4-5-20251001"))
//!     .user_text("Say hello")
//!     .start_stream()
//!     .await?;
//!
//! while let Some(event) = run.next().await {
//!     if let StreamEvent::TextDelta { text, .. } = event {
//!         print!("{text}");
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Agent streaming
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use futures::StreamExt as _;
//! # use stream_delay_harness::prelude::*;
//! # use stream_delay_harness::vendors::anthropic::AnthropicProvider;
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), HarnessError> {
//! # let harness = Harness::builder()
//! #     .register_provider(Arc::new(AnthropicProvider::from_env()?))
//! #     .build()?;
//! let agent = Agent::new(
//!     &harness,
//!     AgentConfig {
//!         name: "test-agent".into(),
//!         instructions: "Keep responses brief.".into(),
//!         model: ModelRef::new("anthropic", "claude-3-5-sonnet-20241022"),
//!     },
//! );
//! let mut text = Box::pin(agent.stream([Message::user("Say hello")]).await?.text_stream());
//! while let Some(chunk) = text.next().await {
//!     print!("{}", chunk?);
//! }
//! # Ok(())
//! # }
//! ```

/// Agent wrapper that pre-filters runs down to text increments.
pub mod agent;
/// Conversation messages, usage, and final run output.
pub mod content;
/// Public error types used by the harness API.
pub mod errors;
/// Harness entry point and builder.
pub mod harness;
/// Model and provider identifiers plus generic run options.
pub mod model;
/// Common imports for typical usage.
pub mod prelude;
/// Provider adapter contracts used by vendor integrations.
pub mod provider;
/// Run builder and streaming handle.
pub mod run;
/// Session configuration and session handle.
pub mod session;
/// Normalized public stream events.
pub mod stream;
/// Vendor-specific integrations.
pub mod vendors;

pub use agent::{Agent, AgentConfig, AgentStream};
pub use content::{Message, Role, RunOutput, Usage};
pub use errors::{HarnessError, ProviderError, RunFailure};
pub use harness::{Harness, HarnessBuilder};
pub use model::{ModelRef, ProviderId, RunOptions};
pub use provider::{
    ProviderAdapter, ProviderEvent, ProviderEventStream, ProviderRequest, ProviderResponseMeta,
    ProviderStreamHandle,
};
pub use run::{RunBuilder, RunStream};
pub use session::{Session, SessionConfig};
pub use stream::StreamEvent;
