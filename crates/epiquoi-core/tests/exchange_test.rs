//! Integration tests for chat exchanges
//!
//! Drives `ChatClient` end to end over a scripted transport that replays a
//! fixed sequence of body chunks.

use async_trait::async_trait;
use bytes::Bytes;
use epiquoi_core::{
    ByteStream, CancellationToken, ChatClient, ChatError, ChatMessage, ChatResultOf, ChatTransport,
    ClientConfig, ProgressEvent, Sender, protocol::ChatRequest, protocol::PLACEHOLDER_RESPONSE,
};
use futures::{StreamExt, stream};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Raises its flag when the response body holding it is dropped
struct ReleaseFlag(Arc<AtomicBool>);

impl Drop for ReleaseFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Replays canned chunks and records every request it receives
#[derive(Default)]
struct ScriptedTransport {
    chunks: Vec<ChatResultOf<Bytes>>,
    hang_after_chunks: bool,
    single_shot_body: Option<Bytes>,
    requests: Mutex<Vec<ChatRequest>>,
    calls: AtomicUsize,
    body_released: Arc<AtomicBool>,
}

impl ScriptedTransport {
    fn streaming(parts: &[&'static str]) -> Self {
        Self {
            chunks: parts
                .iter()
                .map(|p| Ok(Bytes::from_static(p.as_bytes())))
                .collect(),
            ..Self::default()
        }
    }

    fn single_shot(body: &'static str) -> Self {
        Self {
            single_shot_body: Some(Bytes::from_static(body.as_bytes())),
            ..Self::default()
        }
    }

    fn then_hang(mut self) -> Self {
        self.hang_after_chunks = true;
        self
    }

    fn with_chunk(mut self, chunk: ChatResultOf<Bytes>) -> Self {
        self.chunks.push(chunk);
        self
    }

    fn record(&self, request: &ChatRequest) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
    }
}

#[async_trait]
impl ChatTransport for ScriptedTransport {
    async fn open_stream(&self, request: &ChatRequest) -> ChatResultOf<ByteStream> {
        self.record(request);
        let flag = ReleaseFlag(self.body_released.clone());
        let replay = stream::iter(self.chunks.clone()).map(move |chunk| {
            let _held = &flag;
            chunk
        });
        let body: ByteStream = if self.hang_after_chunks {
            Box::pin(replay.chain(stream::pending()))
        } else {
            Box::pin(replay)
        };
        Ok(body)
    }

    async fn request(&self, request: &ChatRequest) -> ChatResultOf<Bytes> {
        self.record(request);
        self.single_shot_body
            .clone()
            .ok_or_else(|| ChatError::transport("no single-shot body scripted"))
    }

    async fn health(&self) -> bool {
        true
    }
}

fn client_over(transport: Arc<ScriptedTransport>) -> ChatClient {
    client_with_config(transport, ClientConfig::default())
}

fn client_with_config(transport: Arc<ScriptedTransport>, config: ClientConfig) -> ChatClient {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    ChatClient::with_transport(config, transport)
}

/// Send with a progress sink that collects labels
async fn send_streaming(client: &ChatClient, text: &str) -> (ChatResultOf<String>, Vec<String>) {
    let mut labels = Vec::new();
    let mut on_progress = |e: &ProgressEvent| labels.push(e.label.clone());
    let result = client
        .send(text, &[], Some(&mut on_progress))
        .await
        .map(|r| r.text);
    (result, labels)
}

#[tokio::test]
async fn test_progress_progress_final() {
    let transport = Arc::new(
        ScriptedTransport::streaming(&[
            "data: {\"type\":\"progress\",\"label\":\"Réflexion\"}\n\ndata: {\"type\":\"pro",
            "gress\",\"label\":\"Recherche des campus\"}\n",
            "\ndata: {\"type\":\"final\",\"response\":\"Epitech est à Lyon.\"}\n\n",
            // Anything after the final frame must never be parsed
            "data: {not json at all\n\n",
        ])
        .with_chunk(Err(ChatError::transport("connection reset"))),
    );
    let client = client_over(transport);

    let (result, labels) = send_streaming(&client, "Où est Epitech ?").await;

    assert_eq!(result.unwrap(), "Epitech est à Lyon.");
    assert_eq!(labels, vec!["Réflexion", "Recherche des campus"]);
}

#[tokio::test]
async fn test_error_event_only() {
    let transport = Arc::new(ScriptedTransport::streaming(&[
        "data: {\"type\":\"error\",\"message\":\"Ollama indisponible\"}\n\n",
    ]));
    let client = client_over(transport);

    let (result, labels) = send_streaming(&client, "Bonjour").await;

    assert_eq!(result, Err(ChatError::backend("Ollama indisponible")));
    assert!(labels.is_empty());
}

#[tokio::test]
async fn test_stream_closing_after_progress_fails() {
    let transport = Arc::new(ScriptedTransport::streaming(&[
        "data: {\"type\":\"progress\",\"label\":\"Réflexion\"}\n\n",
    ]));
    let client = client_over(transport);

    let (result, labels) = send_streaming(&client, "Bonjour").await;

    assert_eq!(result, Err(ChatError::StreamEndedWithoutResult));
    assert_eq!(labels.len(), 1);
}

#[tokio::test]
async fn test_stream_closing_mid_frame_fails() {
    let transport = Arc::new(ScriptedTransport::streaming(&[
        "data: {\"type\":\"progress\",\"label\":\"Réflexion\"}\n\n",
        "data: {\"type\":\"final\",\"resp",
    ]));
    let client = client_over(transport);

    let (result, _) = send_streaming(&client, "Bonjour").await;

    assert!(matches!(result, Err(ChatError::IncompleteStream { .. })));
}

#[tokio::test]
async fn test_malformed_data_line_aborts() {
    let transport = Arc::new(ScriptedTransport::streaming(&[
        "data: {\"type\":\"progress\",\"label\":\"un\"}\n\n",
        "data: {\"type\":\"progress\",\"label\":\n\n",
        "data: {\"type\":\"progress\",\"label\":\"trois\"}\n\n",
        "data: {\"type\":\"final\",\"response\":\"jamais\"}\n\n",
    ]));
    let client = client_over(transport);

    let (result, labels) = send_streaming(&client, "Bonjour").await;

    assert!(matches!(result, Err(ChatError::MalformedPayload { .. })));
    assert_eq!(labels, vec!["un"]);
}

#[tokio::test]
async fn test_transport_failure_mid_stream() {
    let transport = Arc::new(
        ScriptedTransport::streaming(&["data: {\"type\":\"progress\",\"label\":\"x\"}\n\n"])
            .with_chunk(Err(ChatError::transport("connection reset by peer"))),
    );
    let client = client_over(transport);

    let (result, labels) = send_streaming(&client, "Bonjour").await;

    let err = result.unwrap_err();
    assert!(err.is_transport());
    assert!(err.is_retryable());
    assert_eq!(labels, vec!["x"]);
}

#[tokio::test]
async fn test_single_shot_response() {
    let transport = Arc::new(ScriptedTransport::single_shot(
        r#"{"response":"Bonjour","backend_source":"ollama"}"#,
    ));
    let client = client_over(transport.clone());

    let result = client.send("Salut", &[], None).await.unwrap();

    assert_eq!(result.text, "Bonjour");
    assert_eq!(result.sender, Sender::Bot);
    assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_single_shot_empty_object_uses_placeholder() {
    let transport = Arc::new(ScriptedTransport::single_shot("{}"));
    let client = client_over(transport);

    let result = client.send("Salut", &[], None).await.unwrap();

    assert_eq!(result.text, PLACEHOLDER_RESPONSE);
}

#[tokio::test]
async fn test_single_shot_non_json_body_fails() {
    let transport = Arc::new(ScriptedTransport::single_shot("Internal Server Error"));
    let client = client_over(transport);

    let result = client.send("Salut", &[], None).await;

    assert!(matches!(result, Err(ChatError::MalformedPayload { .. })));
}

#[tokio::test]
async fn test_whitespace_message_skips_transport() {
    let transport = Arc::new(ScriptedTransport::streaming(&[]));
    let client = client_over(transport.clone());

    let (result, _) = send_streaming(&client, " \t ").await;

    assert!(matches!(result, Err(ChatError::InvalidInput { .. })));
    assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_history_is_sent_in_order() {
    let transport = Arc::new(ScriptedTransport::single_shot(r#"{"response":"ok"}"#));
    let client = client_over(transport.clone());
    let history = vec![
        ChatMessage::user("Bonjour"),
        ChatMessage::bot("Salut !"),
        ChatMessage::user("Les campus ?"),
    ];

    client.send("Et Nice ?", &history, None).await.unwrap();

    let requests = transport.requests.lock().unwrap();
    let sent: Vec<&str> = requests[0].history.iter().map(|m| m.text.as_str()).collect();
    assert_eq!(sent, vec!["Bonjour", "Salut !", "Les campus ?"]);
    assert_eq!(requests[0].message, "Et Nice ?");
}

#[tokio::test]
async fn test_cancel_stops_callbacks() {
    let transport = Arc::new(
        ScriptedTransport::streaming(&[
            "data: {\"type\":\"progress\",\"label\":\"Réflexion\"}\n\n",
            "data: {\"type\":\"progress\",\"label\":\"Recherche\"}\n\n",
        ])
        .then_hang(),
    );
    let client = client_over(transport);
    let cancel = CancellationToken::new();

    let mut labels = Vec::new();
    let trigger = cancel.clone();
    let mut on_progress = |e: &ProgressEvent| {
        labels.push(e.label.clone());
        trigger.cancel();
    };

    let result = client
        .send_with_cancel("Bonjour", &[], Some(&mut on_progress), cancel)
        .await;

    assert_eq!(result, Err(ChatError::Cancelled));
    assert_eq!(labels, vec!["Réflexion"]);
}

#[tokio::test]
async fn test_dropping_send_releases_body() {
    let transport = Arc::new(
        ScriptedTransport::streaming(&[
            "data: {\"type\":\"progress\",\"label\":\"Réflexion\"}\n\n",
        ])
        .then_hang(),
    );
    let client = client_over(transport.clone());

    let mut labels = Vec::new();
    let mut on_progress = |e: &ProgressEvent| labels.push(e.label.clone());
    let outcome = tokio::time::timeout(
        Duration::from_millis(50),
        client.send("Bonjour", &[], Some(&mut on_progress)),
    )
    .await;

    assert!(outcome.is_err());
    assert_eq!(labels, vec!["Réflexion"]);
    assert!(transport.body_released.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_oversized_tail_after_final_is_ignored() {
    let transport = Arc::new(ScriptedTransport::streaming(&[
        "data: {\"type\":\"progress\",\"label\":\"a\"}\n\n\
         data: {\"type\":\"final\",\"response\":\"ok\"}\n\n\
         xxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxx",
    ]));
    let client = client_with_config(
        transport,
        ClientConfig {
            max_frame_bytes: 48,
            ..ClientConfig::default()
        },
    );

    let (result, labels) = send_streaming(&client, "Bonjour").await;

    assert_eq!(result.unwrap(), "ok");
    assert_eq!(labels, vec!["a"]);
}

#[tokio::test]
async fn test_oversized_tail_without_final_fails() {
    let transport = Arc::new(ScriptedTransport::streaming(&[
        "data: {\"type\":\"progress\",\"label\":\"a\"}\n\n\
         xxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxx",
    ]));
    let client = client_with_config(
        transport,
        ClientConfig {
            max_frame_bytes: 48,
            ..ClientConfig::default()
        },
    );

    let (result, labels) = send_streaming(&client, "Bonjour").await;

    assert!(matches!(result, Err(ChatError::MalformedPayload { .. })));
    assert_eq!(labels, vec!["a"]);
}

#[tokio::test]
async fn test_concurrent_sends_are_independent() {
    let first = client_over(Arc::new(ScriptedTransport::streaming(&[
        "data: {\"type\":\"progress\",\"label\":\"a\"}\n\ndata: {\"type\":\"final\",\"response\":\"A\"}\n\n",
    ])));
    let second = client_over(Arc::new(ScriptedTransport::streaming(&[
        "data: {\"type\":\"final\",\"response\":\"B\"}\n\n",
    ])));

    let ((a, a_labels), (b, b_labels)) =
        tokio::join!(send_streaming(&first, "1"), send_streaming(&second, "2"));

    assert_eq!(a.unwrap(), "A");
    assert_eq!(b.unwrap(), "B");
    assert_eq!(a_labels, vec!["a"]);
    assert!(b_labels.is_empty());
}

#[tokio::test]
async fn test_result_becomes_bot_message() {
    let transport = Arc::new(ScriptedTransport::single_shot(r#"{"response":"Bienvenue"}"#));
    let client = client_over(transport);

    let message = client.send("Salut", &[], None).await.unwrap().into_message();

    assert_eq!(message.sender, Sender::Bot);
    assert!(!message.is_error);
}
