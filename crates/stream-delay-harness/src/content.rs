/// Author of a conversation message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// End-user turn.
    User,
    /// Prior model turn.
    Assistant,
}

/// One conversation message sent to a model run.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    /// Creates a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Creates an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Token accounting reported by the provider with the finish event.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Usage {
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
}

impl Usage {
    /// Fills fields missing from `self` with values from `other`.
    pub fn merge(self, other: Usage) -> Usage {
        Usage {
            input_tokens: self.input_tokens.or(other.input_tokens),
            output_tokens: self.output_tokens.or(other.output_tokens),
        }
    }
}

/// Final aggregated output for a finished run.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize, Default)]
pub struct RunOutput {
    /// Text fragments in the order they were produced.
    pub parts: Vec<String>,
    /// Vendor-specific finish reason when available (for example `end_turn`).
    pub finish_reason: Option<String>,
    /// Usage metadata when the provider sent any.
    pub usage: Option<Usage>,
}

impl RunOutput {
    /// Concatenates all text parts in order.
    pub fn text(&self) -> String {
        self.parts.concat()
    }
}
