use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::StreamExt as _;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::content::{Message, RunOutput};
use crate::errors::{HarnessError, RunFailure};
use crate::harness::HarnessInner;
use crate::model::{ModelRef, RunOptions};
use crate::provider::{ProviderAdapter, ProviderEvent, ProviderEventStream, ProviderRequest};
use crate::stream::StreamEvent;

/// Builder for configuring and starting a single model run.
pub struct RunBuilder {
    harness: Arc<HarnessInner>,
    session_id: uuid::Uuid,
    session_name: String,
    model: ModelRef,
    system_prompt: Option<String>,
    messages: Vec<Message>,
    options: RunOptions,
}

impl RunBuilder {
    pub(crate) fn new(
        harness: Arc<HarnessInner>,
        session_id: uuid::Uuid,
        session_name: String,
        model: ModelRef,
    ) -> Self {
        Self {
            harness,
            session_id,
            session_name,
            model,
            system_prompt: None,
            messages: Vec::new(),
            options: RunOptions::default(),
        }
    }

    /// Sets the system prompt for the run.
    pub fn system_prompt(mut self, text: impl Into<String>) -> Self {
        self.system_prompt = Some(text.into());
        self
    }

    /// Appends a user message.
    pub fn user_text(mut self, text: impl Into<String>) -> Self {
        self.messages.push(Message::user(text));
        self
    }

    /// Appends conversation messages in order.
    pub fn messages(mut self, messages: impl IntoIterator<Item = Message>) -> Self {
        self.messages.extend(messages);
        self
    }

    /// Sets an optional per-run HTTP timeout.
    pub fn timeout(mut self, timeout: std::time::Duration) -> Self {
        self.options.timeout = Some(timeout);
        self
    }

    /// Sets the bounded stream buffer size used between the runtime task and
    /// the consumer.
    pub fn stream_buffer_capacity(mut self, capacity: usize) -> Self {
        self.options.stream_buffer_capacity = capacity;
        self
    }

    /// Sets the generated-token cap sent to the provider.
    pub fn max_output_tokens(mut self, max_tokens: u32) -> Self {
        self.options.max_output_tokens = max_tokens;
        self
    }

    /// Validates the builder state and starts a streaming run.
    ///
    /// Provider failures (rejected request, broken stream) do not surface
    /// here; they arrive as a terminal `StreamEvent::Error`.
    pub async fn start_stream(self) -> Result<RunStream, HarnessError> {
        let harness = self.harness.clone();
        let session_name = self.session_name.clone();
        let request = self.validate_and_build_request()?;
        let provider = harness
            .provider(&request.model.provider)
            .ok_or_else(|| HarnessError::ProviderNotFound {
                provider: request.model.provider.clone(),
            })?;

        let (tx, rx) = mpsc::channel(request.options.stream_buffer_capacity);
        let run_id = request.run_id;
        let session_id = request.session_id;
        debug!(%run_id, session = %session_name, model = %request.model, "spawning run task");
        tokio::spawn(run_task(provider, request, tx));

        Ok(RunStream {
            run_id,
            session_id,
            rx,
        })
    }

    fn validate_and_build_request(self) -> Result<ProviderRequest, HarnessError> {
        if self.model.provider.as_str().trim().is_empty() {
            return Err(HarnessError::Validation(
                "model provider must not be empty".into(),
            ));
        }
        if self.model.model.trim().is_empty() {
            return Err(HarnessError::Validation("model must not be empty".into()));
        }
        if self.options.stream_buffer_capacity == 0 {
            return Err(HarnessError::Validation(
                "stream_buffer_capacity must be greater than 0".into(),
            ));
        }
        if self.options.max_output_tokens == 0 {
            return Err(HarnessError::Validation(
                "max_output_tokens must be greater than 0".into(),
            ));
        }
        if self.messages.is_empty() {
            return Err(HarnessError::Validation(
                "at least one message is required".into(),
            ));
        }
        if self.messages.iter().any(|m| m.content.trim().is_empty()) {
            return Err(HarnessError::Validation(
                "message content must not be empty".into(),
            ));
        }

        Ok(ProviderRequest {
            run_id: uuid::Uuid::new_v4(),
            session_id: self.session_id,
            model: self.model,
            system_prompt: self.system_prompt.filter(|s| !s.trim().is_empty()),
            messages: self.messages,
            options: self.options,
        })
    }
}

/// Streaming handle returned by `RunBuilder::start_stream`.
///
/// Implements `futures::Stream<Item = StreamEvent>`. The stream yields `None`
/// only after the provider transport has closed.
pub struct RunStream {
    run_id: uuid::Uuid,
    session_id: uuid::Uuid,
    rx: mpsc::Receiver<StreamEvent>,
}

impl RunStream {
    /// Returns the run id for this stream.
    pub fn run_id(&self) -> uuid::Uuid {
        self.run_id
    }

    /// Returns the session id that owns this run.
    pub fn session_id(&self) -> uuid::Uuid {
        self.session_id
    }

    /// Waits for and returns the next normalized stream event.
    pub async fn next_event(&mut self) -> Option<StreamEvent> {
        self.rx.recv().await
    }

    /// Narrows the run to its text increments.
    ///
    /// Text-end and finish markers are dropped; a terminal failure becomes an
    /// `Err` item.
    pub fn text_stream(self) -> impl futures::Stream<Item = Result<String, HarnessError>> + Send {
        self.filter_map(|event| {
            futures::future::ready(match event {
                StreamEvent::TextDelta { text, .. } => Some(Ok(text)),
                StreamEvent::Error { error, .. } => Some(Err(HarnessError::RunFailed(error))),
                StreamEvent::RunStarted { .. }
                | StreamEvent::TextEnd { .. }
                | StreamEvent::Finish { .. } => None,
            })
        })
    }
}

impl futures::Stream for RunStream {
    type Item = StreamEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<StreamEvent>> {
        self.rx.poll_recv(cx)
    }
}

async fn run_task(
    provider: Arc<dyn ProviderAdapter>,
    request: ProviderRequest,
    tx: mpsc::Sender<StreamEvent>,
) {
    let run_id = request.run_id;
    let provider_id = request.model.provider.clone();
    let model_name = request.model.model.clone();

    let started = StreamEvent::RunStarted {
        run_id,
        session_id: request.session_id,
        provider: provider_id.clone(),
        model: model_name.clone(),
    };
    if !send_event(&tx, started).await {
        debug!(%run_id, "run stream receiver dropped before RunStarted");
        return;
    }

    let handle = match provider.start_stream(request).await {
        Ok(handle) => handle,
        Err(err) => {
            warn!(%run_id, provider = %provider_id, error = %err, "provider rejected request");
            let _ = send_event(
                &tx,
                StreamEvent::Error {
                    run_id,
                    error: RunFailure::from(&err),
                },
            )
            .await;
            return;
        }
    };
    debug!(%run_id, provider = %provider_id, request_id = ?handle.metadata.request_id, "provider stream accepted");

    let mut stream = handle.stream;
    let mut seq = 0_u64;
    let mut parts: Vec<String> = Vec::new();
    while let Some(next) = stream.next().await {
        let event = match next {
            Ok(ProviderEvent::TextDelta { text }) => {
                debug!(%run_id, provider = %provider_id, model = %model_name, seq, "provider text delta");
                parts.push(text.clone());
                let event = StreamEvent::TextDelta { run_id, seq, text };
                seq = seq.saturating_add(1);
                event
            }
            Ok(ProviderEvent::TextEnd) => {
                debug!(%run_id, provider = %provider_id, "provider text end");
                StreamEvent::TextEnd { run_id }
            }
            Ok(ProviderEvent::Finish {
                finish_reason,
                usage,
            }) => {
                debug!(%run_id, provider = %provider_id, ?finish_reason, "provider finish");
                let output = RunOutput {
                    parts: std::mem::take(&mut parts),
                    finish_reason,
                    usage,
                };
                if send_event(&tx, StreamEvent::Finish { run_id, output }).await {
                    drain_after_finish(run_id, &mut stream).await;
                }
                return;
            }
            Err(err) => {
                warn!(%run_id, provider = %provider_id, error = %err, "provider stream failed");
                let _ = send_event(
                    &tx,
                    StreamEvent::Error {
                        run_id,
                        error: RunFailure::from(&err),
                    },
                )
                .await;
                return;
            }
        };
        if !send_event(&tx, event).await {
            debug!(%run_id, "run stream receiver dropped during output");
            return;
        }
    }

    // No finish: the sequence still ends normally.
    warn!(%run_id, provider = %provider_id, delta_count = seq, "provider transport closed without finish");
}

/// Holds the consumer channel open until the provider transport closes, so
/// end-of-stream tracks the real end of the response body.
async fn drain_after_finish(run_id: uuid::Uuid, stream: &mut ProviderEventStream) {
    while let Some(next) = stream.next().await {
        match next {
            Ok(event) => debug!(%run_id, ?event, "ignoring provider event after finish"),
            Err(err) => {
                warn!(%run_id, error = %err, "provider stream failed after finish");
                break;
            }
        }
    }
    debug!(%run_id, "provider transport closed");
}

async fn send_event(tx: &mpsc::Sender<StreamEvent>, event: StreamEvent) -> bool {
    tx.send(event).await.is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::Usage;
    use crate::errors::ProviderError;
    use crate::model::ProviderId;
    use crate::provider::{ProviderResponseMeta, ProviderStreamHandle};
    use futures::stream;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct FakeProvider {
        calls: Arc<AtomicUsize>,
        behavior: FakeProviderBehavior,
    }

    enum FakeProviderBehavior {
        ImmediateError(ProviderError),
        Events(Vec<(Duration, Result<ProviderEvent, ProviderError>)>),
    }

    #[async_trait::async_trait]
    impl ProviderAdapter for FakeProvider {
        fn id(&self) -> ProviderId {
            ProviderId::new("fake")
        }

        async fn start_stream(
            &self,
            _req: ProviderRequest,
        ) -> Result<ProviderStreamHandle, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.behavior {
                FakeProviderBehavior::ImmediateError(err) => Err(err.clone()),
                FakeProviderBehavior::Events(events) => Ok(ProviderStreamHandle {
                    stream: Box::pin(stream::iter(events.clone()).then(|(delay, event)| async move {
                        tokio::time::sleep(delay).await;
                        event
                    })),
                    metadata: ProviderResponseMeta::default(),
                }),
            }
        }
    }

    fn harness_with(behavior: FakeProviderBehavior) -> crate::Harness {
        crate::Harness::builder()
            .register_provider(Arc::new(FakeProvider {
                calls: Arc::new(AtomicUsize::new(0)),
                behavior,
            }))
            .build()
            .expect("build harness")
    }

    fn builder_with_fake_events(events: Vec<Result<ProviderEvent, ProviderError>>) -> RunBuilder {
        let events = events.into_iter().map(|e| (Duration::ZERO, e)).collect();
        harness_with(FakeProviderBehavior::Events(events))
            .session(crate::SessionConfig::named("test"))
            .run(ModelRef::new("fake", "model-a"))
            .user_text("hello")
    }

    fn finish(reason: &str) -> Result<ProviderEvent, ProviderError> {
        Ok(ProviderEvent::Finish {
            finish_reason: Some(reason.into()),
            usage: None,
        })
    }

    fn delta(text: &str) -> Result<ProviderEvent, ProviderError> {
        Ok(ProviderEvent::TextDelta { text: text.into() })
    }

    #[tokio::test]
    async fn run_builder_validation_rejects_missing_messages() {
        let err = harness_with(FakeProviderBehavior::Events(vec![]))
            .session(crate::SessionConfig::named("s"))
            .run(ModelRef::new("fake", "m"))
            .start_stream()
            .await;
        let err = match err {
            Ok(_) => panic!("missing messages should fail"),
            Err(err) => err,
        };
        assert!(matches!(err, HarnessError::Validation(msg) if msg.contains("at least one message")));
    }

    #[tokio::test]
    async fn run_builder_validation_rejects_blank_message() {
        let err = builder_with_fake_events(vec![])
            .messages([Message::assistant("   ")])
            .start_stream()
            .await;
        let err = match err {
            Ok(_) => panic!("blank message should fail"),
            Err(err) => err,
        };
        assert!(matches!(err, HarnessError::Validation(msg) if msg.contains("must not be empty")));
    }

    #[tokio::test]
    async fn run_builder_validation_rejects_zero_buffer() {
        let err = builder_with_fake_events(vec![])
            .stream_buffer_capacity(0)
            .start_stream()
            .await;
        assert!(matches!(err, Err(HarnessError::Validation(msg)) if msg.contains("stream_buffer_capacity")));
    }

    #[tokio::test]
    async fn emits_ordered_events_with_sequence_numbers() {
        let mut stream = builder_with_fake_events(vec![
            delta("a"),
            delta(""),
            delta("b"),
            Ok(ProviderEvent::TextEnd),
            Ok(ProviderEvent::Finish {
                finish_reason: Some("end_turn".into()),
                usage: Some(Usage {
                    input_tokens: Some(5),
                    output_tokens: Some(2),
                }),
            }),
        ])
        .start_stream()
        .await
        .expect("start");

        assert!(matches!(
            stream.next_event().await,
            Some(StreamEvent::RunStarted { .. })
        ));
        let mut seqs = Vec::new();
        let mut saw_text_end = false;
        let mut output = None;
        while let Some(event) = stream.next_event().await {
            match event {
                StreamEvent::TextDelta { seq, .. } => seqs.push(seq),
                StreamEvent::TextEnd { .. } => saw_text_end = true,
                StreamEvent::Finish { output: out, .. } => output = Some(out),
                other => panic!("unexpected event: {other:?}"),
            }
        }
        assert_eq!(seqs, vec![0, 1, 2]);
        assert!(saw_text_end);
        let output = output.expect("finish event");
        assert_eq!(output.text(), "ab");
        assert_eq!(output.finish_reason.as_deref(), Some("end_turn"));
        assert_eq!(output.usage.and_then(|u| u.output_tokens), Some(2));
    }

    #[tokio::test]
    async fn start_rejection_becomes_terminal_error() {
        let stream = harness_with(FakeProviderBehavior::ImmediateError(
            ProviderError::provider("fake", "unauthorized", Some(401)),
        ))
        .session(crate::SessionConfig::named("test"))
        .run(ModelRef::new("fake", "model-a"))
        .user_text("hello")
        .start_stream()
        .await
        .expect("start");

        let events: Vec<_> = stream.collect().await;
        assert_eq!(events.len(), 2);
        assert!(matches!(
            &events[1],
            StreamEvent::Error {
                error: RunFailure::Provider { .. },
                ..
            }
        ));
    }

    #[tokio::test]
    async fn provider_runtime_error_becomes_terminal_error() {
        let events: Vec<_> = builder_with_fake_events(vec![
            delta("partial"),
            Err(ProviderError::transport("fake", "connection reset")),
            delta("never seen"),
        ])
        .start_stream()
        .await
        .expect("start")
        .collect()
        .await;

        assert!(matches!(
            events.last(),
            Some(StreamEvent::Error {
                error: RunFailure::Transport { .. },
                ..
            })
        ));
        assert!(!events.iter().any(
            |e| matches!(e, StreamEvent::TextDelta { text, .. } if text == "never seen")
        ));
    }

    #[tokio::test]
    async fn stream_ending_without_finish_just_ends() {
        let events: Vec<_> = builder_with_fake_events(vec![delta("a"), Ok(ProviderEvent::TextEnd)])
            .start_stream()
            .await
            .expect("start")
            .collect()
            .await;
        assert_eq!(events.len(), 3);
        assert!(matches!(&events[1], StreamEvent::TextDelta { text, .. } if text == "a"));
        assert!(matches!(events.last(), Some(StreamEvent::TextEnd { .. })));
        assert!(!events.iter().any(|e| matches!(e, StreamEvent::Error { .. } | StreamEvent::Finish { .. })));
    }

    #[tokio::test]
    async fn text_stream_without_finish_yields_text_then_ends() {
        let items: Vec<_> = builder_with_fake_events(vec![delta("Hi"), delta(" there")])
            .start_stream()
            .await
            .expect("start")
            .text_stream()
            .collect()
            .await;
        assert_eq!(items, vec![Ok("Hi".to_string()), Ok(" there".to_string())]);
    }

    #[tokio::test(start_paused = true)]
    async fn end_of_stream_waits_for_provider_transport_to_close() {
        let harness = harness_with(FakeProviderBehavior::Events(vec![
            (Duration::from_millis(50), delta("hi")),
            (Duration::from_millis(10), finish("stop")),
            (Duration::from_millis(3000), Ok(ProviderEvent::TextEnd)),
        ]));
        let mut stream = harness
            .session(crate::SessionConfig::named("drain"))
            .run(ModelRef::new("fake", "model-a"))
            .user_text("hello")
            .start_stream()
            .await
            .expect("start");

        let start = tokio::time::Instant::now();
        let mut finish_at = None;
        let mut trailing = 0;
        while let Some(event) = stream.next_event().await {
            match event {
                StreamEvent::Finish { .. } => finish_at = Some(start.elapsed()),
                StreamEvent::TextEnd { .. } => trailing += 1,
                _ => {}
            }
        }
        let closed_at = start.elapsed();

        assert_eq!(finish_at, Some(Duration::from_millis(60)));
        assert_eq!(closed_at, Duration::from_millis(3060));
        assert_eq!(trailing, 0, "events after finish are not forwarded");
    }

    #[tokio::test]
    async fn text_stream_yields_text_only_and_surfaces_failures() {
        let items: Vec<_> = builder_with_fake_events(vec![
            delta("Hello"),
            delta(""),
            Ok(ProviderEvent::TextEnd),
            Err(ProviderError::provider("fake", "overloaded", Some(529))),
        ])
        .start_stream()
        .await
        .expect("start")
        .text_stream()
        .collect()
        .await;

        assert_eq!(items.len(), 3);
        assert_eq!(items[0], Ok("Hello".to_string()));
        assert_eq!(items[1], Ok(String::new()));
        assert!(matches!(
            &items[2],
            Err(HarnessError::RunFailed(RunFailure::Provider { message, .. })) if message == "overloaded"
        ));
    }

    #[tokio::test]
    async fn provider_not_found_is_start_time_error() {
        let harness = crate::Harness::builder().build().expect("build harness");
        let err = harness
            .session(crate::SessionConfig::named("s"))
            .run(ModelRef::new("missing", "m"))
            .user_text("hello")
            .start_stream()
            .await;
        assert!(matches!(err, Err(HarnessError::ProviderNotFound { .. })));
    }
}
