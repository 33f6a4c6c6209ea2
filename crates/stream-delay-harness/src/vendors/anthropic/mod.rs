//! Anthropic Messages API integration.
mod adapter;
mod config;
pub(crate) mod transport;

pub use adapter::{ANTHROPIC_PROVIDER, AnthropicProvider};
pub use config::AnthropicClientConfig;
