//! Server-sent-events plumbing shared by the vendor adapters.
use std::collections::VecDeque;
use std::pin::Pin;

use futures::StreamExt as _;
use futures::stream;

use crate::ProviderId;
use crate::errors::ProviderError;
use crate::provider::{ProviderEvent, ProviderResponseMeta};

pub(crate) type ByteStream =
    Pin<Box<dyn futures::Stream<Item = Result<bytes::Bytes, reqwest::Error>> + Send + 'static>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SseFrame {
    pub event: Option<String>,
    pub data: String,
}

impl SseFrame {
    /// Parses the frame's data as JSON. Empty and `[DONE]` payloads yield `None`.
    pub fn json(&self, provider: &ProviderId) -> Result<Option<serde_json::Value>, ProviderError> {
        let data = self.data.trim();
        if data.is_empty() || data == "[DONE]" {
            return Ok(None);
        }
        serde_json::from_str(data).map(Some).map_err(|e| {
            ProviderError::protocol(provider.clone(), format!("invalid SSE JSON frame: {e}"))
        })
    }
}

/// Incremental SSE parser; frames may be split across arbitrary byte chunks.
#[derive(Default)]
pub(crate) struct SseDecoder {
    buf: Vec<u8>,
}

impl SseDecoder {
    pub fn push_chunk(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.buf.extend_from_slice(chunk);
        let mut frames = Vec::new();
        while let Some((idx, delim_len)) = find_frame_delimiter(&self.buf) {
            let frame_bytes: Vec<u8> = self.buf.drain(..idx + delim_len).take(idx).collect();
            if let Some(frame) = parse_sse_frame(&frame_bytes) {
                frames.push(frame);
            }
        }
        frames
    }

    /// Flushes a trailing frame that was not followed by a blank line.
    pub fn finish(&mut self) -> Option<SseFrame> {
        let rest = std::mem::take(&mut self.buf);
        parse_sse_frame(&rest)
    }
}

fn find_frame_delimiter(buf: &[u8]) -> Option<(usize, usize)> {
    let mut i = 0;
    while i + 1 < buf.len() {
        if buf[i] == b'\n' && buf[i + 1] == b'\n' {
            return Some((i, 2));
        }
        if i + 3 < buf.len() && &buf[i..i + 4] == b"\r\n\r\n" {
            return Some((i, 4));
        }
        i += 1;
    }
    None
}

fn parse_sse_frame(bytes: &[u8]) -> Option<SseFrame> {
    if bytes.is_empty() {
        return None;
    }
    let text = String::from_utf8_lossy(bytes);
    let mut event: Option<String> = None;
    let mut data_lines: Vec<&str> = Vec::new();
    for raw_line in text.split('\n') {
        let line = raw_line.trim_end_matches('\r');
        if line.is_empty() || line.starts_with(':') {
            continue;
        }
        if let Some(rest) = line.strip_prefix("event:") {
            event = Some(rest.trim_start().to_string());
        } else if let Some(rest) = line.strip_prefix("data:") {
            data_lines.push(rest.strip_prefix(' ').unwrap_or(rest));
        }
    }
    if event.is_none() && data_lines.is_empty() {
        return None;
    }
    Some(SseFrame {
        event,
        data: data_lines.join("\n"),
    })
}

/// Vendor-specific translation from SSE frames to provider events.
///
/// Mappers may keep state across frames (Anthropic reports the stop reason
/// before the final `message_stop`).
pub(crate) trait FrameMapper: Send + 'static {
    fn map_frame(&mut self, frame: &SseFrame) -> Result<Vec<ProviderEvent>, ProviderError>;
}

/// Sends a prepared streaming request and checks the HTTP status.
pub(crate) async fn open_sse_response(
    provider_id: &ProviderId,
    request: reqwest::RequestBuilder,
    request_id_header: &str,
) -> Result<(ByteStream, ProviderResponseMeta), ProviderError> {
    let response = request.send().await.map_err(|e| {
        ProviderError::transport(provider_id.clone(), format!("request failed: {e}"))
    })?;
    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());
        return Err(ProviderError::provider(
            provider_id.clone(),
            format!("streaming request failed with status {status}: {body}"),
            Some(status.as_u16()),
        ));
    }
    let metadata = ProviderResponseMeta {
        request_id: response
            .headers()
            .get(request_id_header)
            .and_then(|v| v.to_str().ok())
            .map(ToOwned::to_owned),
    };
    Ok((Box::pin(response.bytes_stream()), metadata))
}

/// Turns an HTTP body into provider events. The stream ends when the body
/// ends; it does not stop early at the vendor's completion event.
pub(crate) fn sse_event_stream<M: FrameMapper>(
    provider_id: ProviderId,
    bytes_stream: ByteStream,
    mapper: M,
) -> impl futures::Stream<Item = Result<ProviderEvent, ProviderError>> + Send {
    struct State<M> {
        provider_id: ProviderId,
        bytes_stream: ByteStream,
        decoder: SseDecoder,
        mapper: M,
        pending: VecDeque<ProviderEvent>,
        done: bool,
    }

    stream::try_unfold(
        State {
            provider_id,
            bytes_stream,
            decoder: SseDecoder::default(),
            mapper,
            pending: VecDeque::new(),
            done: false,
        },
        |mut state| async move {
            loop {
                if let Some(event) = state.pending.pop_front() {
                    return Ok(Some((event, state)));
                }
                if state.done {
                    return Ok(None);
                }

                match state.bytes_stream.next().await {
                    Some(Ok(chunk)) => {
                        for frame in state.decoder.push_chunk(&chunk) {
                            state.pending.extend(state.mapper.map_frame(&frame)?);
                        }
                    }
                    Some(Err(e)) => {
                        return Err(ProviderError::transport(
                            state.provider_id,
                            format!("streaming read failed: {e}"),
                        ));
                    }
                    None => {
                        if let Some(frame) = state.decoder.finish() {
                            state.pending.extend(state.mapper.map_frame(&frame)?);
                        }
                        state.done = true;
                    }
                }
            }
        },
    )
}
