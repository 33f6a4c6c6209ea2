use std::fmt;
use std::time::Duration;

use stream_delay_harness::Usage;

/// Lifecycle point recorded during a probe run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Milestone {
    /// Last incremental text (or non-empty agent chunk).
    LastText,
    /// Text-section-end event.
    TextEnd,
    /// Generation-finish event.
    Finish,
    /// The consuming loop observed end-of-sequence.
    StreamClosed,
}

impl fmt::Display for Milestone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Milestone::LastText => "last text increment",
            Milestone::TextEnd => "text-end",
            Milestone::Finish => "finish",
            Milestone::StreamClosed => "stream closed",
        })
    }
}

/// A milestone and its offset from the run-start instant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimingSample {
    pub milestone: Milestone,
    pub at: Duration,
}

/// Whole milliseconds, as printed in reports.
pub fn millis(d: Duration) -> u128 {
    d.as_millis()
}

/// `later - earlier` in milliseconds; negative when `later` came first.
pub fn signed_millis(later: Duration, earlier: Duration) -> i128 {
    later.as_millis() as i128 - earlier.as_millis() as i128
}

/// Timings of one direct-stream run, all relative to run start.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirectRunResult {
    /// Offset of the last text-delta event (zero when none arrived).
    pub last_text: Duration,
    pub text_end: Option<Duration>,
    pub finish: Option<Duration>,
    /// Offset at which the event loop exited.
    pub closed: Duration,
    /// Number of text-delta events, empty ones included.
    pub text_deltas: usize,
    pub finish_reason: Option<String>,
    pub usage: Option<Usage>,
}

impl DirectRunResult {
    /// Loop exit minus last text.
    pub fn delay_after_last_text(&self) -> Duration {
        self.closed.saturating_sub(self.last_text)
    }

    /// Recorded milestones in chronological order.
    pub fn samples(&self) -> Vec<TimingSample> {
        let mut samples = vec![TimingSample {
            milestone: Milestone::LastText,
            at: self.last_text,
        }];
        if let Some(at) = self.text_end {
            samples.push(TimingSample {
                milestone: Milestone::TextEnd,
                at,
            });
        }
        if let Some(at) = self.finish {
            samples.push(TimingSample {
                milestone: Milestone::Finish,
                at,
            });
        }
        samples.push(TimingSample {
            milestone: Milestone::StreamClosed,
            at: self.closed,
        });
        samples.sort_by_key(|s| s.at);
        samples
    }
}

/// Timings of one agent-stream run, all relative to run start.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AgentRunResult {
    /// Non-empty chunks received.
    pub chunks: usize,
    /// Offset of the last non-empty chunk (zero when none arrived).
    pub last_chunk: Duration,
    /// Offset at which the text iterator reported completion.
    pub closed: Duration,
}

impl AgentRunResult {
    /// Loop exit minus last chunk.
    pub fn delay_after_last_chunk(&self) -> Duration {
        self.closed.saturating_sub(self.last_chunk)
    }

    pub fn samples(&self) -> Vec<TimingSample> {
        vec![
            TimingSample {
                milestone: Milestone::LastText,
                at: self.last_chunk,
            },
            TimingSample {
                milestone: Milestone::StreamClosed,
                at: self.closed,
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn samples_are_chronological_even_when_finish_precedes_text_end() {
        let result = DirectRunResult {
            last_text: ms(400),
            text_end: Some(ms(3500)),
            finish: Some(ms(3400)),
            closed: ms(3600),
            text_deltas: 4,
            finish_reason: None,
            usage: None,
        };
        let order: Vec<Milestone> = result.samples().iter().map(|s| s.milestone).collect();
        assert_eq!(
            order,
            vec![
                Milestone::LastText,
                Milestone::Finish,
                Milestone::TextEnd,
                Milestone::StreamClosed
            ]
        );
        assert_eq!(result.delay_after_last_text(), ms(3200));
    }

    #[test]
    fn signed_millis_goes_negative() {
        assert_eq!(signed_millis(ms(100), ms(250)), -150);
        assert_eq!(signed_millis(ms(250), ms(100)), 150);
    }

    #[test]
    fn agent_delay_is_close_minus_last_chunk() {
        let result = AgentRunResult {
            chunks: 3,
            last_chunk: ms(820),
            closed: ms(4100),
        };
        assert_eq!(result.delay_after_last_chunk(), ms(3280));
        assert_eq!(result.samples()[1].milestone, Milestone::StreamClosed);
    }
}
