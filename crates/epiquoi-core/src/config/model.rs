//! Client configuration model

use super::timeouts;
use crate::error::{ChatError, ChatResultOf};
use crate::protocol::frame_decoder::DEFAULT_MAX_FRAME_BYTES;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default backend address used by the development server
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Longest message the backend accepts
pub const DEFAULT_MAX_MESSAGE_CHARS: usize = 2000;

/// Settings for talking to the EpiQuoi backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Scheme, host and port of the backend, without a trailing slash
    pub base_url: String,
    /// Path of the single-shot chat endpoint
    pub chat_path: String,
    /// Path of the streaming chat endpoint
    pub stream_path: String,
    /// Path of the health probe
    pub health_path: String,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    /// Messages longer than this are rejected before any network call
    pub max_message_chars: usize,
    /// Largest undelimited frame the decoder will buffer
    pub max_frame_bytes: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            chat_path: "/chat".to_string(),
            stream_path: "/chat/stream".to_string(),
            health_path: "/health".to_string(),
            connect_timeout_secs: timeouts::CONNECT_SECS,
            request_timeout_secs: timeouts::REQUEST_SECS,
            max_message_chars: DEFAULT_MAX_MESSAGE_CHARS,
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
        }
    }
}

impl ClientConfig {
    /// Default configuration pointing at `base_url`
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn chat_url(&self) -> String {
        self.join(&self.chat_path)
    }

    pub fn stream_url(&self) -> String {
        self.join(&self.stream_path)
    }

    pub fn health_url(&self) -> String {
        self.join(&self.health_path)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    fn join(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    /// Check the configuration for values the client cannot work with
    pub fn validate(&self) -> ChatResultOf<()> {
        let base = self.base_url.trim();
        if base.is_empty() {
            return Err(ChatError::config("base_url must not be empty"));
        }
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(ChatError::config(format!(
                "base_url must start with http:// or https://, got '{}'",
                base
            )));
        }

        for (name, path) in [
            ("chat_path", &self.chat_path),
            ("stream_path", &self.stream_path),
            ("health_path", &self.health_path),
        ] {
            if !path.starts_with('/') {
                return Err(ChatError::config(format!(
                    "{} must start with '/', got '{}'",
                    name, path
                )));
            }
        }

        for (name, value) in [
            ("connect_timeout_secs", self.connect_timeout_secs as usize),
            ("request_timeout_secs", self.request_timeout_secs as usize),
            ("max_message_chars", self.max_message_chars),
            ("max_frame_bytes", self.max_frame_bytes),
        ] {
            if value == 0 {
                return Err(ChatError::config(format!("{} must be greater than 0", name)));
            }
        }

        Ok(())
    }
}
