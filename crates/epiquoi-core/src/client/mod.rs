//! Streaming chat client
//!
//! One call to [`ChatClient::send`] is one exchange:
//!
//! ```text
//! AwaitingHeaders -> Streaming (progress*) -> Resolved | Failed
//! ```
//!
//! Each exchange owns a fresh [`FrameDecoder`], so concurrent sends on clones
//! of the same client share no mutable state.

use crate::config::ClientConfig;
use crate::error::{ChatError, ChatResultOf};
use crate::protocol::{
    ChatRequest, FrameDecoder, Payload, ProgressEvent, SingleShotResponse, frame_stream,
};
use crate::transport::{ChatTransport, HttpTransport};
use crate::types::{ChatMessage, ChatResult};
use futures::StreamExt;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Progress consumer, called synchronously in wire order
pub type ProgressSink<'a> = &'a mut (dyn FnMut(&ProgressEvent) + Send);

/// Client for the EpiQuoi chat backend
#[derive(Clone)]
pub struct ChatClient {
    config: Arc<ClientConfig>,
    transport: Arc<dyn ChatTransport>,
}

impl std::fmt::Debug for ChatClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ChatClient {
    /// Create a client that talks HTTP to the configured backend
    pub fn new(config: ClientConfig) -> ChatResultOf<Self> {
        config.validate()?;
        let transport = HttpTransport::new(&config)?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Create a client over any transport
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn ChatTransport>) -> Self {
        Self {
            config: Arc::new(config),
            transport,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Send `text` with `history` as context.
    ///
    /// With a progress sink the streaming endpoint is used and every
    /// `progress` event is reported before the final answer. Without one a
    /// single-shot request is made.
    pub async fn send(
        &self,
        text: &str,
        history: &[ChatMessage],
        on_progress: Option<ProgressSink<'_>>,
    ) -> ChatResultOf<ChatResult> {
        self.send_with_cancel(text, history, on_progress, CancellationToken::new())
            .await
    }

    /// Like [`send`](Self::send), but abandons the exchange with
    /// [`ChatError::Cancelled`] once `cancel` fires.
    ///
    /// The response body is dropped on cancellation and no progress callback
    /// runs afterwards.
    #[instrument(
        skip_all,
        fields(streaming = on_progress.is_some(), history_len = history.len())
    )]
    pub async fn send_with_cancel(
        &self,
        text: &str,
        history: &[ChatMessage],
        on_progress: Option<ProgressSink<'_>>,
        cancel: CancellationToken,
    ) -> ChatResultOf<ChatResult> {
        self.validate_message(text)?;

        let request = ChatRequest::new(text, history);
        let started = Instant::now();
        info!("Chat exchange started");

        let outcome = match on_progress {
            Some(sink) => self.stream_exchange(&request, sink, &cancel).await,
            None => self.single_shot_exchange(&request, &cancel).await,
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &outcome {
            Ok(result) => info!(
                elapsed_ms,
                response_chars = result.text.chars().count(),
                "Chat exchange resolved"
            ),
            Err(ChatError::Cancelled) => info!(elapsed_ms, "Chat exchange cancelled"),
            Err(e) => warn!(elapsed_ms, code = e.error_code(), "Chat exchange failed: {}", e),
        }
        outcome
    }

    /// Probe the backend's health endpoint
    pub async fn health_check(&self) -> bool {
        let healthy = self.transport.health().await;
        debug!("Backend health: {}", healthy);
        healthy
    }

    fn validate_message(&self, text: &str) -> ChatResultOf<()> {
        if text.trim().is_empty() {
            return Err(ChatError::invalid_input("Message must not be empty"));
        }

        let chars = text.chars().count();
        if chars > self.config.max_message_chars {
            return Err(ChatError::invalid_input(format!(
                "Message is {} characters long, the limit is {}",
                chars, self.config.max_message_chars
            )));
        }
        Ok(())
    }

    async fn stream_exchange(
        &self,
        request: &ChatRequest,
        on_progress: ProgressSink<'_>,
        cancel: &CancellationToken,
    ) -> ChatResultOf<ChatResult> {
        // AwaitingHeaders
        let body = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ChatError::Cancelled),
            opened = self.transport.open_stream(request) => opened?,
        };

        // Streaming
        let decoder = FrameDecoder::with_max_frame_bytes(self.config.max_frame_bytes);
        let mut frames = frame_stream(body, decoder);
        let mut progress_events = 0usize;

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(ChatError::Cancelled),
                next = frames.next() => next,
            };

            let Some(frame) = next else {
                debug!(progress_events, "Stream closed without a terminal event");
                return Err(ChatError::StreamEndedWithoutResult);
            };

            let payload = frame?.payload()?;
            debug!(kind = payload.kind(), "Decoded frame");

            match payload {
                Payload::Progress(event) => {
                    progress_events += 1;
                    on_progress(&event);
                }
                Payload::Final { response } => return Ok(ChatResult::bot(response)),
                Payload::Error { message } => return Err(ChatError::backend(message)),
                Payload::Unknown { kind } => {
                    debug!("Skipping event with unknown type {:?}", kind);
                }
            }
        }
    }

    async fn single_shot_exchange(
        &self,
        request: &ChatRequest,
        cancel: &CancellationToken,
    ) -> ChatResultOf<ChatResult> {
        let body = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ChatError::Cancelled),
            body = self.transport.request(request) => body?,
        };

        let text = SingleShotResponse::from_slice(&body)?.into_text();
        Ok(ChatResult::bot(text))
    }
}
