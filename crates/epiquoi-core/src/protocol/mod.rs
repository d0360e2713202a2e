//! Wire protocol spoken with the EpiQuoi backend
//!
//! Requests are JSON bodies posted to the chat endpoints. Streaming responses
//! are event frames (see [`frame_decoder`]) whose data lines decode into a
//! [`Payload`]. Single-shot responses are one JSON object.

pub mod frame_decoder;
pub mod payload;

pub use frame_decoder::{EventFrame, FrameDecoder, FrameStream, frame_stream};
pub use payload::{PLACEHOLDER_RESPONSE, Payload, ProgressEvent};

use crate::error::{ChatError, ChatResultOf};
use crate::types::{ChatMessage, Sender};
use serde::{Deserialize, Serialize};

/// One history entry as the backend expects it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireMessage {
    pub text: String,
    pub sender: Sender,
    #[serde(rename = "isError", default)]
    pub is_error: bool,
}

impl From<&ChatMessage> for WireMessage {
    fn from(message: &ChatMessage) -> Self {
        Self {
            text: message.text.clone(),
            sender: message.sender,
            is_error: message.is_error,
        }
    }
}

/// Body of both the streaming and the single-shot chat request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub history: Vec<WireMessage>,
}

impl ChatRequest {
    /// Build a request, keeping history in insertion order
    pub fn new(message: impl Into<String>, history: &[ChatMessage]) -> Self {
        Self {
            message: message.into(),
            history: history.iter().map(WireMessage::from).collect(),
        }
    }
}

/// Body of the single-shot response; extra fields are ignored
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SingleShotResponse {
    #[serde(default)]
    pub response: Option<String>,
}

impl SingleShotResponse {
    /// Parse a complete response body
    pub fn from_slice(body: &[u8]) -> ChatResultOf<Self> {
        serde_json::from_slice(body).map_err(|e| {
            ChatError::malformed(format!("Single-shot response is not a JSON object: {}", e))
        })
    }

    /// Answer text, or the placeholder when the backend sent none
    pub fn into_text(self) -> String {
        match self.response {
            Some(text) if !text.is_empty() => text,
            _ => PLACEHOLDER_RESPONSE.to_string(),
        }
    }
}
