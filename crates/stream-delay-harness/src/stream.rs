use crate::{RunOutput, errors::RunFailure, model::ProviderId};

/// Normalized stream events exposed by `RunStream`.
///
/// A healthy run yields `RunStarted`, any number of `TextDelta`, usually one
/// `TextEnd` per text segment, then `Finish`. The sequence ends (returns
/// `None`) once the provider transport has closed, whether or not `Finish`
/// was seen.
#[derive(Clone, Debug, PartialEq)]
pub enum StreamEvent {
    /// First event for every run.
    RunStarted {
        run_id: uuid::Uuid,
        session_id: uuid::Uuid,
        provider: ProviderId,
        model: String,
    },
    /// Incremental text output chunk. `text` may be empty.
    TextDelta {
        run_id: uuid::Uuid,
        seq: u64,
        text: String,
    },
    /// No further text for the current segment.
    TextEnd { run_id: uuid::Uuid },
    /// Generation finished, with aggregated output.
    Finish {
        run_id: uuid::Uuid,
        output: RunOutput,
    },
    /// Terminal failure event.
    Error {
        run_id: uuid::Uuid,
        error: RunFailure,
    },
}
