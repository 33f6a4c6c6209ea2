//! Vendor integrations. Each vendor translates its SSE wire format into
//! `ProviderEvent`s.
pub mod anthropic;
pub mod openai;
pub(crate) mod sse;
