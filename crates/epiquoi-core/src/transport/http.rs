//! reqwest-backed transport

use super::excerpt::error_excerpt;
use super::{ByteStream, ChatTransport};
use crate::config::{ClientConfig, timeouts};
use crate::error::{ChatError, ChatResultOf};
use crate::protocol::ChatRequest;
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use reqwest::header::{ACCEPT, HeaderValue};
use reqwest::{Client, Response};
use std::time::Duration;
use tracing::debug;

const EVENT_STREAM: &str = "text/event-stream";

/// HTTP transport for the EpiQuoi backend
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http_client: Client,
    chat_url: String,
    stream_url: String,
    health_url: String,
    request_timeout: Duration,
}

impl HttpTransport {
    /// Build a transport from a validated configuration.
    ///
    /// Only the connect timeout is set on the client itself. Streams have no
    /// total deadline; single-shot requests carry the request timeout.
    pub fn new(config: &ClientConfig) -> ChatResultOf<Self> {
        let http_client = Client::builder()
            .connect_timeout(config.connect_timeout())
            .build()
            .map_err(|e| ChatError::config(format!("Failed to create HTTP client: {}", e)))?;

        debug!(
            "Created HTTP transport for {} with timeouts: connection={}s, request={}s",
            config.base_url, config.connect_timeout_secs, config.request_timeout_secs
        );

        Ok(Self {
            http_client,
            chat_url: config.chat_url(),
            stream_url: config.stream_url(),
            health_url: config.health_url(),
            request_timeout: config.request_timeout(),
        })
    }
}

/// Turn a non-success response into a `Transport` error with a body excerpt
async fn status_error(response: Response, url: &str) -> ChatError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    ChatError::http_status(
        status.as_u16(),
        format!("{} returned {}: {}", url, status, error_excerpt(&body)),
    )
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn open_stream(&self, request: &ChatRequest) -> ChatResultOf<ByteStream> {
        let response = self
            .http_client
            .post(&self.stream_url)
            .header(ACCEPT, HeaderValue::from_static(EVENT_STREAM))
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(status_error(response, &self.stream_url).await);
        }

        debug!("Stream opened with status {}", response.status());
        let body: ByteStream = Box::pin(
            response
                .bytes_stream()
                .map(|chunk| chunk.map_err(ChatError::from)),
        );
        Ok(body)
    }

    async fn request(&self, request: &ChatRequest) -> ChatResultOf<Bytes> {
        let response = self
            .http_client
            .post(&self.chat_url)
            .timeout(self.request_timeout)
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(status_error(response, &self.chat_url).await);
        }

        Ok(response.bytes().await?)
    }

    async fn health(&self) -> bool {
        match self
            .http_client
            .get(&self.health_url)
            .timeout(timeouts::health_timeout())
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!("Health probe failed: {}", e);
                false
            }
        }
    }
}
