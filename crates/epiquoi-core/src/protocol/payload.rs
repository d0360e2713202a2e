//! Typed event payloads carried by frames

use crate::error::{ChatError, ChatResultOf};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Text used when a final answer arrives without a `response` field
pub const PLACEHOLDER_RESPONSE: &str = "Réponse reçue du backend.";

/// Text used when an `error` event carries no message
const UNKNOWN_BACKEND_ERROR: &str = "Erreur inconnue du backend";

/// Intermediate status reported while the backend works
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProgressEvent {
    #[serde(default)]
    pub label: String,
}

#[derive(Deserialize)]
struct FinalBody {
    #[serde(default)]
    response: Option<String>,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

/// Decoded payload, selected by its `type` discriminant
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Progress(ProgressEvent),
    Final { response: String },
    Error { message: String },
    /// Discriminant this client does not know; skipped by the dispatcher
    Unknown { kind: Option<String> },
}

impl Payload {
    /// Parse a data line.
    ///
    /// Invalid JSON, a non-object value or a known discriminant whose fields
    /// have the wrong type is a [`ChatError::MalformedPayload`].
    pub fn from_json(data: &str) -> ChatResultOf<Self> {
        let value: Value = serde_json::from_str(data)
            .map_err(|e| ChatError::malformed(format!("Invalid JSON in data line: {}", e)))?;

        if !value.is_object() {
            return Err(ChatError::malformed(format!(
                "Expected a JSON object, got: {}",
                truncate(data)
            )));
        }

        let kind = value.get("type").and_then(Value::as_str).map(str::to_owned);
        let payload = match kind.as_deref() {
            Some("progress") => Self::Progress(typed(value)?),
            Some("final") => {
                let body: FinalBody = typed(value)?;
                Self::Final {
                    response: body
                        .response
                        .unwrap_or_else(|| PLACEHOLDER_RESPONSE.to_string()),
                }
            }
            Some("error") => {
                let body: ErrorBody = typed(value)?;
                Self::Error {
                    message: body
                        .message
                        .unwrap_or_else(|| UNKNOWN_BACKEND_ERROR.to_string()),
                }
            }
            _ => Self::Unknown { kind },
        };

        Ok(payload)
    }

    /// Whether this payload ends the exchange
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Final { .. } | Self::Error { .. })
    }

    /// Discriminant name, for logging
    pub fn kind(&self) -> &str {
        match self {
            Self::Progress(_) => "progress",
            Self::Final { .. } => "final",
            Self::Error { .. } => "error",
            Self::Unknown { kind } => kind.as_deref().unwrap_or("<missing>"),
        }
    }
}

fn typed<T: serde::de::DeserializeOwned>(value: Value) -> ChatResultOf<T> {
    serde_json::from_value(value)
        .map_err(|e| ChatError::malformed(format!("Unexpected payload shape: {}", e)))
}

fn truncate(data: &str) -> String {
    const MAX: usize = 80;
    if data.chars().count() <= MAX {
        return data.to_string();
    }
    let head: String = data.chars().take(MAX).collect();
    format!("{}...", head)
}
