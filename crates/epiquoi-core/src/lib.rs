//! EpiQuoi Core Library
//!
//! This crate provides the client side of the EpiQuoi chat assistant: an
//! incremental decoder for the backend's event stream, the streaming chat
//! client built on it, and the configuration and transport layers they use.

pub mod client;
pub mod config;
pub mod error;
pub mod protocol;
pub mod transport;
pub mod types;

// Re-export commonly used types
pub use client::{ChatClient, ProgressSink};
pub use config::{ClientConfig, ConfigLoader, ConfigOverrides};
pub use error::{ChatError, ChatResultOf};
pub use protocol::{EventFrame, FrameDecoder, Payload, ProgressEvent};
pub use transport::{ByteStream, ChatTransport, HttpTransport};
pub use types::*;

// CancellationToken is part of the public API of `send_with_cancel`
pub use tokio_util::sync::CancellationToken;
