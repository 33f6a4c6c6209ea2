//! Direct-stream probe: consumes the full event sequence of one run and
//! times text-end, finish, and close against the last text delta.
use std::io::Write;
use std::pin::pin;
use std::time::Duration;

use futures::{Stream, StreamExt as _};
use stream_delay_harness::{Harness, SessionConfig, StreamEvent, Usage};
use tokio::time::Instant;
use tracing::{debug, info};

use crate::config::DirectProbeConfig;
use crate::outcome::{ExitPolicy, ProbeError, ProbeReport};
use crate::timing::{DirectRunResult, millis, signed_millis};

pub const DIRECT_PROBE: &str = "direct-stream-probe";
pub const DIRECT_EXIT_POLICY: ExitPolicy = ExitPolicy::PropagateErrors;

/// Runs the probe against `harness` and writes the report to `out`.
pub async fn run_direct_probe<W: Write>(
    harness: &Harness,
    config: &DirectProbeConfig,
    out: &mut W,
) -> ProbeReport<DirectRunResult> {
    let outcome = probe(harness, config, out).await;
    ProbeReport::new(DIRECT_PROBE, outcome, DIRECT_EXIT_POLICY)
}

async fn probe<W: Write>(
    harness: &Harness,
    config: &DirectProbeConfig,
    out: &mut W,
) -> Result<DirectRunResult, ProbeError> {
    writeln!(out, "Starting direct stream...")?;
    debug!(model = %config.model, prompt = %config.prompt, "issuing streaming request");
    let start = Instant::now();

    let run = harness
        .session(SessionConfig::named(DIRECT_PROBE))
        .run(config.model.clone())
        .max_output_tokens(config.max_output_tokens)
        .user_text(config.prompt.clone())
        .start_stream()
        .await?;
    info!(run_id = %run.run_id(), model = %config.model, "direct stream opened");

    let result = measure_direct(run, start, out).await?;
    for sample in result.samples() {
        debug!(milestone = %sample.milestone, at_ms = millis(sample.at) as u64, "timing sample");
    }
    write_direct_report(out, &result, config.delay_threshold)?;
    Ok(result)
}

#[derive(Default)]
struct DirectTimings {
    last_text: Duration,
    text_end: Option<Duration>,
    finish: Option<Duration>,
    text_deltas: usize,
    finish_reason: Option<String>,
    usage: Option<Usage>,
}

impl DirectTimings {
    fn into_result(self, closed: Duration) -> DirectRunResult {
        DirectRunResult {
            last_text: self.last_text,
            text_end: self.text_end,
            finish: self.finish,
            closed,
            text_deltas: self.text_deltas,
            finish_reason: self.finish_reason,
            usage: self.usage,
        }
    }
}

/// Consumes `events` until end-of-sequence, echoing text and logging the
/// text-end/finish markers as they arrive.
///
/// A `StreamEvent::Error` stops consumption and fails the measurement.
pub async fn measure_direct<S, W>(
    events: S,
    start: Instant,
    out: &mut W,
) -> Result<DirectRunResult, ProbeError>
where
    S: Stream<Item = StreamEvent>,
    W: Write,
{
    let mut events = pin!(events);
    let mut timings = DirectTimings::default();

    while let Some(event) = events.next().await {
        let now = start.elapsed();
        match event {
            StreamEvent::TextDelta { text, .. } => {
                timings.last_text = now;
                timings.text_deltas += 1;
                if !text.is_empty() {
                    write!(out, "{text}")?;
                    out.flush()?;
                }
            }
            StreamEvent::TextEnd { .. } => {
                timings.text_end = Some(now);
                writeln!(
                    out,
                    "\n[text-end event received at {}ms ({:+}ms after last text)]",
                    millis(now),
                    signed_millis(now, timings.last_text)
                )?;
            }
            StreamEvent::Finish { output, .. } => {
                timings.finish = Some(now);
                timings.finish_reason = output.finish_reason;
                timings.usage = output.usage;
                writeln!(
                    out,
                    "[finish event received at {}ms ({:+}ms after last text)]",
                    millis(now),
                    signed_millis(now, timings.last_text)
                )?;
            }
            StreamEvent::Error { error, .. } => return Err(error.into()),
            StreamEvent::RunStarted { .. } => {}
        }
    }

    Ok(timings.into_result(start.elapsed()))
}

/// True when the close delay reaches `threshold`.
pub fn issue_confirmed(result: &DirectRunResult, threshold: Duration) -> bool {
    result.delay_after_last_text() >= threshold
}

fn arrival_line(at: Option<Duration>, last_text: Duration) -> String {
    match at {
        Some(at) => format!(
            "{}ms ({:+}ms after last text)",
            millis(at),
            signed_millis(at, last_text)
        ),
        None => "not received".to_string(),
    }
}

pub fn write_direct_report<W: Write>(
    out: &mut W,
    result: &DirectRunResult,
    threshold: Duration,
) -> std::io::Result<()> {
    let delay = millis(result.delay_after_last_text());
    writeln!(out, "\n\n--- Timing Analysis ---")?;
    writeln!(out, "Last text-delta:  {}ms", millis(result.last_text))?;
    writeln!(
        out,
        "text-end arrived: {}",
        arrival_line(result.text_end, result.last_text)
    )?;
    writeln!(
        out,
        "finish arrived:   {}",
        arrival_line(result.finish, result.last_text)
    )?;
    writeln!(out, "Stream closed:    {}ms", millis(result.closed))?;
    if let Some(reason) = &result.finish_reason {
        writeln!(out, "Finish reason:    {reason}")?;
    }
    if let Some(usage) = result.usage {
        writeln!(
            out,
            "Usage:            input={} output={}",
            usage.input_tokens.map_or("?".to_string(), |n| n.to_string()),
            usage.output_tokens.map_or("?".to_string(), |n| n.to_string()),
        )?;
    }
    writeln!(out, "\n⚠️  Total delay after last text: {delay}ms")?;

    writeln!(out, "\n=== Summary ===")?;
    writeln!(out, "Delay after last text chunk: {delay}ms")?;
    if issue_confirmed(result, threshold) {
        writeln!(
            out,
            "❌ ISSUE CONFIRMED: {}+ms delay detected between the last text chunk and stream close",
            millis(threshold)
        )?;
    } else {
        writeln!(out, "✅ No significant delay detected")?;
    }
    Ok(())
}
