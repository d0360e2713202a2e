//! Conversation types shared between the client and its front-ends

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Deref;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_MESSAGE_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque, monotonically increasing message identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MessageId(u64);

impl MessageId {
    /// Allocate the next identifier
    pub fn next() -> Self {
        Self(NEXT_MESSAGE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "msg-{}", self.0)
    }
}

/// Who authored a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

/// A single message in the in-memory conversation.
///
/// Messages are immutable once created; a conversation only ever appends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: MessageId,
    pub text: String,
    pub sender: Sender,
    #[serde(default)]
    pub is_error: bool,
}

impl ChatMessage {
    /// Create a message typed by the user
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            id: MessageId::next(),
            text: text.into(),
            sender: Sender::User,
            is_error: false,
        }
    }

    /// Create a regular bot reply
    pub fn bot(text: impl Into<String>) -> Self {
        Self {
            id: MessageId::next(),
            text: text.into(),
            sender: Sender::Bot,
            is_error: false,
        }
    }

    /// Create a bot message that reports a failure to the user
    pub fn bot_error(text: impl Into<String>) -> Self {
        Self {
            is_error: true,
            ..Self::bot(text)
        }
    }
}

/// Successful outcome of one exchange
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResult {
    pub text: String,
    pub sender: Sender,
}

impl ChatResult {
    pub fn bot(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sender: Sender::Bot,
        }
    }

    /// Turn the result into a conversation message with a fresh id
    pub fn into_message(self) -> ChatMessage {
        ChatMessage {
            id: MessageId::next(),
            text: self.text,
            sender: self.sender,
            is_error: false,
        }
    }
}

/// Ordered, append-only sequence of messages sent as request context
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversationHistory {
    messages: Vec<ChatMessage>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    /// Drop every message (conversation reset)
    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }
}

impl Deref for ConversationHistory {
    type Target = [ChatMessage];

    fn deref(&self) -> &Self::Target {
        &self.messages
    }
}

impl From<Vec<ChatMessage>> for ConversationHistory {
    fn from(messages: Vec<ChatMessage>) -> Self {
        Self { messages }
    }
}
