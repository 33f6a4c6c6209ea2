//! Common imports for typical harness usage.
pub use crate::{
    Agent, AgentConfig, AgentStream, Harness, HarnessBuilder, HarnessError, Message, ModelRef,
    ProviderId, RunBuilder, RunOutput, RunStream, Session, SessionConfig, StreamEvent,
};
