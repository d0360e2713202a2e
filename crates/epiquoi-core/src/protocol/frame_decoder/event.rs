//! Decoded frame type

use crate::error::ChatResultOf;
use crate::protocol::payload::Payload;

/// One complete, delimiter-bounded unit of the event stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventFrame {
    /// Marker-stripped content of the data line(s)
    pub data: String,
}

impl EventFrame {
    pub fn new(data: impl Into<String>) -> Self {
        Self { data: data.into() }
    }

    /// Parse the frame's JSON into a typed payload
    pub fn payload(&self) -> ChatResultOf<Payload> {
        Payload::from_json(&self.data)
    }
}
