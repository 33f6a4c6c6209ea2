use crate::ProviderId;
use crate::content::Usage;
use crate::errors::ProviderError;
use crate::provider::ProviderEvent;
use crate::vendors::sse::{FrameMapper, SseFrame};

/// Maps Responses API stream events. Stateless.
pub(crate) struct OpenAiFrameMapper {
    pub provider: ProviderId,
}

impl FrameMapper for OpenAiFrameMapper {
    fn map_frame(&mut self, frame: &SseFrame) -> Result<Vec<ProviderEvent>, ProviderError> {
        match frame.json(&self.provider)? {
            Some(value) => map_openai_json_to_events(&self.provider, &value),
            None => Ok(Vec::new()),
        }
    }
}

pub(crate) fn map_openai_json_to_events(
    provider: &ProviderId,
    value: &serde_json::Value,
) -> Result<Vec<ProviderEvent>, ProviderError> {
    let Some(event_type) = value.get("type").and_then(|v| v.as_str()) else {
        return Ok(Vec::new());
    };
    match event_type {
        "response.output_text.delta" => Ok(value
            .get("delta")
            .and_then(|v| v.as_str())
            .map(|delta| {
                vec![ProviderEvent::TextDelta {
                    text: delta.to_string(),
                }]
            })
            .unwrap_or_default()),
        "response.output_text.done" => Ok(vec![ProviderEvent::TextEnd]),
        "response.completed" | "response.incomplete" => {
            let response = value.get("response").unwrap_or(value);
            let finish_reason = response
                .get("incomplete_details")
                .and_then(|d| d.get("reason"))
                .and_then(|v| v.as_str())
                .or_else(|| response.get("status").and_then(|v| v.as_str()))
                .map(ToOwned::to_owned);
            Ok(vec![ProviderEvent::Finish {
                finish_reason,
                usage: response.get("usage").map(usage_from_json),
            }])
        }
        "response.error" | "response.failed" | "error" => {
            let message = value
                .get("error")
                .or_else(|| value.get("response").and_then(|r| r.get("error")))
                .and_then(|e| e.get("message"))
                .and_then(|v| v.as_str())
                .or_else(|| value.get("message").and_then(|v| v.as_str()))
                .unwrap_or("OpenAI stream error");
            Err(ProviderError::provider(provider.clone(), message, None))
        }
        _ => Ok(Vec::new()),
    }
}

fn usage_from_json(usage: &serde_json::Value) -> Usage {
    Usage {
        input_tokens: usage.get("input_tokens").and_then(|v| v.as_u64()),
        output_tokens: usage.get("output_tokens").and_then(|v| v.as_u64()),
    }
}
