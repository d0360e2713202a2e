//! Core error type for chat exchanges

use thiserror::Error;

/// Result type alias for client operations
pub type ChatResultOf<T> = Result<T, ChatError>;

/// Failure of a chat exchange
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChatError {
    /// Non-success HTTP status, or the connection failed, aborted or timed out
    #[error("Transport error: {message}")]
    Transport {
        message: String,
        /// HTTP status when the server answered at all
        status: Option<u16>,
    },

    /// A data line was present but its JSON could not be parsed
    #[error("Malformed payload: {message}")]
    MalformedPayload { message: String },

    /// The stream closed before any `final` or `error` frame was seen
    #[error("Stream ended without a final or error event")]
    StreamEndedWithoutResult,

    /// The stream closed while a partial, undelimited frame was buffered
    #[error("Stream ended with {pending_bytes} bytes of an incomplete frame")]
    IncompleteStream { pending_bytes: usize },

    /// The backend reported a failure through an `error` event
    #[error("Backend error: {message}")]
    Backend { message: String },

    /// The message was rejected before any network call
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    /// Configuration could not be read or is invalid
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// The caller abandoned the exchange
    #[error("Exchange was cancelled")]
    Cancelled,
}

impl ChatError {
    /// Stable code for programmatic handling and structured logs
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Transport { .. } => "EPIQUOI_TRANSPORT",
            Self::MalformedPayload { .. } => "EPIQUOI_MALFORMED_PAYLOAD",
            Self::StreamEndedWithoutResult => "EPIQUOI_STREAM_ENDED",
            Self::IncompleteStream { .. } => "EPIQUOI_INCOMPLETE_STREAM",
            Self::Backend { .. } => "EPIQUOI_BACKEND",
            Self::InvalidInput { .. } => "EPIQUOI_INVALID_INPUT",
            Self::Config { .. } => "EPIQUOI_CONFIG",
            Self::Cancelled => "EPIQUOI_CANCELLED",
        }
    }

    /// Whether the failure happened below the protocol layer
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    /// HTTP status carried by a transport failure
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport { status, .. } => *status,
            _ => None,
        }
    }

    /// Whether a caller-side retry has a chance of succeeding.
    ///
    /// Only transport failures qualify: connection problems (no status),
    /// server errors (5xx) and throttling (429). Protocol violations and
    /// backend-reported errors are final.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { status: None, .. } => true,
            Self::Transport {
                status: Some(code), ..
            } => *code == 429 || (500..600).contains(code),
            _ => false,
        }
    }
}
