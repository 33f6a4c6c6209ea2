//! OpenAI Responses API integration.
mod adapter;
mod config;
pub(crate) mod transport;

pub use adapter::{OPENAI_PROVIDER, OpenAiProvider};
pub use config::OpenAiClientConfig;
