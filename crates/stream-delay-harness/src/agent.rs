use crate::content::Message;
use crate::errors::HarnessError;
use crate::harness::Harness;
use crate::model::ModelRef;
use crate::run::RunStream;
use crate::session::{Session, SessionConfig};

/// Configuration for a conversational agent.
#[derive(Clone, Debug)]
pub struct AgentConfig {
    /// Agent name, used as the session name.
    pub name: String,
    /// Instructions sent as the system prompt of every run.
    pub instructions: String,
    /// Model bound to the agent.
    pub model: ModelRef,
}

/// Thin agent wrapper: a named session with fixed instructions and a bound
/// model, exposing only the text increments of each run.
#[derive(Clone)]
pub struct Agent {
    session: Session,
    config: AgentConfig,
}

impl Agent {
    /// Creates an agent on top of a harness. Provider lookup is deferred to
    /// `stream`.
    pub fn new(harness: &Harness, config: AgentConfig) -> Self {
        let session = harness.session(SessionConfig::named(config.name.clone()));
        Self { session, config }
    }

    /// Returns the agent name.
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Returns the model the agent runs against.
    pub fn model(&self) -> &ModelRef {
        &self.config.model
    }

    /// Starts one streaming run with the agent's instructions and the given
    /// conversation.
    pub async fn stream(
        &self,
        messages: impl IntoIterator<Item = Message>,
    ) -> Result<AgentStream, HarnessError> {
        let run = self
            .session
            .run(self.config.model.clone())
            .system_prompt(self.config.instructions.clone())
            .messages(messages)
            .start_stream()
            .await?;
        tracing::debug!(agent = %self.config.name, run_id = %run.run_id(), "agent stream started");
        Ok(AgentStream { run })
    }
}

/// Streaming result of `Agent::stream`.
pub struct AgentStream {
    run: RunStream,
}

impl AgentStream {
    /// Returns the underlying run id.
    pub fn run_id(&self) -> uuid::Uuid {
        self.run.run_id()
    }

    /// Plain text increments, in order. Empty increments are passed through.
    pub fn text_stream(self) -> impl futures::Stream<Item = Result<String, HarnessError>> + Send {
        self.run.text_stream()
    }
}
