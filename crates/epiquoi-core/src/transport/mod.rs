//! Transport seam between the chat client and the network
//!
//! [`ChatClient`](crate::client::ChatClient) only talks to a
//! [`ChatTransport`]. The production implementation is [`HttpTransport`];
//! tests substitute scripted transports.

pub mod excerpt;
mod http;

pub use http::HttpTransport;
pub use excerpt::error_excerpt;

use crate::error::ChatResultOf;
use crate::protocol::ChatRequest;
use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;

/// Response body delivered chunk by chunk, in arrival order
pub type ByteStream = Pin<Box<dyn Stream<Item = ChatResultOf<Bytes>> + Send>>;

/// Carries chat requests to the backend
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Start a streaming exchange and hand back the body once headers arrive.
    ///
    /// A non-success status is a `Transport` error carrying the status code.
    async fn open_stream(&self, request: &ChatRequest) -> ChatResultOf<ByteStream>;

    /// Perform a single-shot exchange and return the complete body
    async fn request(&self, request: &ChatRequest) -> ChatResultOf<Bytes>;

    /// Whether the backend answers its health probe
    async fn health(&self) -> bool;
}
