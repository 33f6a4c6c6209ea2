use std::io::Write;
use std::pin::pin;
use std::time::Duration;

use futures::{Stream, StreamExt as _};
use stream_delay_harness::{Agent, HarnessError, Message};
use tokio::time::Instant;
use tracing::{debug, info};

use crate::config::AgentProbeConfig;
use crate::outcome::{ExitPolicy, ProbeError, ProbeReport};
use crate::timing::{AgentRunResult, millis};

pub const AGENT_PROBE: &str = "agent-stream-probe";
pub const AGENT_EXIT_POLICY: ExitPolicy = ExitPolicy::SwallowErrors;

/// Streams one reply from `agent` and reports how long its text iterator
/// takes to close. Failures never change the exit status.
pub async fn run_agent_probe<W: Write>(
    agent: &Agent,
    config: &AgentProbeConfig,
    out: &mut W,
) -> ProbeReport<AgentRunResult> {
    let outcome = probe(agent, config, out).await;
    ProbeReport::new(AGENT_PROBE, outcome, AGENT_EXIT_POLICY)
}

async fn probe<W: Write>(
    agent: &Agent,
    config: &AgentProbeConfig,
    out: &mut W,
) -> Result<AgentRunResult, ProbeError> {
    writeln!(out, "Starting stream...")?;
    let start = Instant::now();

    let stream = agent.stream([Message::user(config.message.clone())]).await?;
    info!(agent = agent.name(), model = %agent.model(), run_id = %stream.run_id(), "agent stream opened");

    writeln!(out, "\n--- Streaming chunks ---")?;
    let result = measure_agent(stream.text_stream(), start, out).await?;
    write_agent_report(out, &result, config)?;
    Ok(result)
}

/// Consumes plain-text increments until completion. Only non-empty
/// increments are counted and printed.
pub async fn measure_agent<S, W>(
    chunks: S,
    start: Instant,
    out: &mut W,
) -> Result<AgentRunResult, ProbeError>
where
    S: Stream<Item = Result<String, HarnessError>>,
    W: Write,
{
    let mut chunks = pin!(chunks);
    let mut count = 0;
    let mut last_chunk = Duration::ZERO;

    while let Some(chunk) = chunks.next().await {
        let chunk = chunk?;
        if chunk.is_empty() {
            debug!("skipping empty text increment");
            continue;
        }
        count += 1;
        last_chunk = start.elapsed();
        writeln!(out, "Chunk {count} ({}ms): \"{chunk}\"", millis(last_chunk))?;
    }

    Ok(AgentRunResult {
        chunks: count,
        last_chunk,
        closed: start.elapsed(),
    })
}

pub fn bug_confirmed(result: &AgentRunResult, threshold: Duration) -> bool {
    result.delay_after_last_chunk() >= threshold
}

pub fn write_agent_report<W: Write>(
    out: &mut W,
    result: &AgentRunResult,
    config: &AgentProbeConfig,
) -> std::io::Result<()> {
    let delay = millis(result.delay_after_last_chunk());
    writeln!(out, "\n--- Results ---")?;
    writeln!(out, "Total chunks: {}", result.chunks)?;
    writeln!(out, "Total time: {}ms", millis(result.closed))?;
    writeln!(out, "Last chunk at: {}ms", millis(result.last_chunk))?;
    writeln!(out, "Iterator closed at: {}ms", millis(result.closed))?;
    writeln!(out, "❌ Delay after last chunk: {delay}ms")?;

    if bug_confirmed(result, config.delay_threshold) {
        writeln!(
            out,
            "\n🐛 BUG CONFIRMED: Iterator took {}+ms to close after last chunk",
            millis(config.delay_threshold)
        )?;
        writeln!(
            out,
            "Expected: Iterator should close within ~{}ms of last chunk",
            millis(config.expected_close)
        )?;
        writeln!(out, "Actual: Iterator took {delay}ms to close")?;
    }
    Ok(())
}
