use std::collections::HashSet;

use crate::ProviderId;
use crate::content::Usage;
use crate::errors::ProviderError;
use crate::provider::ProviderEvent;
use crate::vendors::sse::{FrameMapper, SseFrame};

/// Maps Messages API stream events.
///
/// `stop_reason` and output usage arrive in `message_delta`, ahead of the
/// `message_stop` that becomes `ProviderEvent::Finish`, so they are buffered.
pub(crate) struct AnthropicFrameMapper {
    provider: ProviderId,
    text_blocks: HashSet<u64>,
    stop_reason: Option<String>,
    usage: Usage,
    saw_usage: bool,
}

impl AnthropicFrameMapper {
    pub fn new(provider: ProviderId) -> Self {
        Self {
            provider,
            text_blocks: HashSet::new(),
            stop_reason: None,
            usage: Usage::default(),
            saw_usage: false,
        }
    }

    fn record_usage(&mut self, usage: Option<&serde_json::Value>) {
        let Some(usage) = usage else {
            return;
        };
        // message_delta usage is cumulative, so later values win.
        let reported = Usage {
            input_tokens: usage.get("input_tokens").and_then(|v| v.as_u64()),
            output_tokens: usage.get("output_tokens").and_then(|v| v.as_u64()),
        };
        self.usage = reported.merge(self.usage);
        self.saw_usage = true;
    }

    pub(crate) fn map_json(
        &mut self,
        value: &serde_json::Value,
    ) -> Result<Vec<ProviderEvent>, ProviderError> {
        let Some(event_type) = value.get("type").and_then(|v| v.as_str()) else {
            return Ok(Vec::new());
        };
        let index = value.get("index").and_then(|v| v.as_u64());
        match event_type {
            "message_start" => {
                self.record_usage(value.get("message").and_then(|m| m.get("usage")));
                Ok(Vec::new())
            }
            "content_block_start" => {
                let is_text = value
                    .get("content_block")
                    .and_then(|b| b.get("type"))
                    .and_then(|v| v.as_str())
                    == Some("text");
                if let (true, Some(index)) = (is_text, index) {
                    self.text_blocks.insert(index);
                }
                Ok(Vec::new())
            }
            "content_block_delta" => {
                let delta = value.get("delta");
                if delta.and_then(|d| d.get("type")).and_then(|v| v.as_str()) != Some("text_delta")
                {
                    return Ok(Vec::new());
                }
                Ok(delta
                    .and_then(|d| d.get("text"))
                    .and_then(|v| v.as_str())
                    .map(|text| {
                        vec![ProviderEvent::TextDelta {
                            text: text.to_string(),
                        }]
                    })
                    .unwrap_or_default())
            }
            "content_block_stop" => match index {
                Some(index) if self.text_blocks.remove(&index) => Ok(vec![ProviderEvent::TextEnd]),
                _ => Ok(Vec::new()),
            },
            "message_delta" => {
                if let Some(reason) = value
                    .get("delta")
                    .and_then(|d| d.get("stop_reason"))
                    .and_then(|v| v.as_str())
                {
                    self.stop_reason = Some(reason.to_string());
                }
                self.record_usage(value.get("usage"));
                Ok(Vec::new())
            }
            "message_stop" => Ok(vec![ProviderEvent::Finish {
                finish_reason: self.stop_reason.take(),
                usage: self.saw_usage.then_some(self.usage),
            }]),
            "error" => {
                let error = value.get("error");
                let kind = error
                    .and_then(|e| e.get("type"))
                    .and_then(|v| v.as_str())
                    .unwrap_or("error");
                let message = error
                    .and_then(|e| e.get("message"))
                    .and_then(|v| v.as_str())
                    .unwrap_or("Anthropic stream error");
                Err(ProviderError::provider(
                    self.provider.clone(),
                    format!("{kind}: {message}"),
                    None,
                ))
            }
            _ => Ok(Vec::new()),
        }
    }
}

impl FrameMapper for AnthropicFrameMapper {
    fn map_frame(&mut self, frame: &SseFrame) -> Result<Vec<ProviderEvent>, ProviderError> {
        match frame.json(&self.provider)? {
            Some(value) => self.map_json(&value),
            None => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn mapper() -> AnthropicFrameMapper {
        AnthropicFrameMapper::new(ProviderId::new("anthropic"))
    }

    fn map_all(mapper: &mut AnthropicFrameMapper, values: &[serde_json::Value]) -> Vec<ProviderEvent> {
        values
            .iter()
            .flat_map(|v| mapper.map_json(v).expect("map"))
            .collect()
    }

    #[test]
    fn maps_full_message_lifecycle() {
        let mut mapper = mapper();
        let events = map_all(
            &mut mapper,
            &[
                json!({"type":"message_start","message":{"usage":{"input_tokens":14,"output_tokens":1}}}),
                json!({"type":"content_block_start","index":0,"content_block":{"type":"text","text":""}}),
                json!({"type":"ping"}),
                json!({"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"Hello"}}),
                json!({"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"!"}}),
                json!({"type":"content_block_stop","index":0}),
                json!({"type":"message_delta","delta":{"stop_reason":"end_turn"},"usage":{"output_tokens":6}}),
                json!({"type":"message_stop"}),
            ],
        );
        assert_eq!(
            events,
            vec![
                ProviderEvent::TextDelta {
                    text: "Hello".into()
                },
                ProviderEvent::TextDelta { text: "!".into() },
                ProviderEvent::TextEnd,
                ProviderEvent::Finish {
                    finish_reason: Some("end_turn".into()),
                    usage: Some(Usage {
                        input_tokens: Some(14),
                        output_tokens: Some(6),
                    }),
                },
            ]
        );
    }

    #[test]
    fn non_text_blocks_do_not_emit_text_end() {
        let mut mapper = mapper();
        let events = map_all(
            &mut mapper,
            &[
                json!({"type":"content_block_start","index":0,"content_block":{"type":"thinking","thinking":""}}),
                json!({"type":"content_block_delta","index":0,"delta":{"type":"thinking_delta","thinking":"hmm"}}),
                json!({"type":"content_block_stop","index":0}),
            ],
        );
        assert!(events.is_empty());
    }

    #[test]
    fn finish_without_usage_reports_none() {
        let mut mapper = mapper();
        let events = map_all(&mut mapper, &[json!({"type":"message_stop"})]);
        assert_eq!(
            events,
            vec![ProviderEvent::Finish {
                finish_reason: None,
                usage: None,
            }]
        );
    }

    #[test]
    fn error_event_becomes_provider_error() {
        let err = mapper()
            .map_json(&json!({"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}))
            .expect_err("error event");
        assert!(
            matches!(err, ProviderError::Provider { message, .. } if message == "overloaded_error: Overloaded")
        );
    }
}
