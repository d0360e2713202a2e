//! Incremental decoder for the event-stream response body
//!
//! The backend writes one frame per event:
//!
//! ```text
//! data: {"type":"progress","label":"Recherche"}\n
//! \n
//! ```
//!
//! Frames end at a blank line. The network hands us the body in chunks of
//! arbitrary size, so a marker, a JSON body, a delimiter or even a multi-byte
//! UTF-8 character may be split across two reads. The decoder keeps two
//! buffers:
//! - decoded text that does not yet contain a full frame
//! - trailing bytes of an unfinished UTF-8 sequence
//!
//! and only emits a frame once its delimiter has been seen.

mod event;
mod stream;

pub use event::EventFrame;
pub use stream::{FrameStream, frame_stream};

use crate::error::{ChatError, ChatResultOf};

/// Prefix of the line carrying the JSON payload
pub const DATA_MARKER: &str = "data:";

/// Default upper bound for a single undelimited frame (1 MiB)
pub const DEFAULT_MAX_FRAME_BYTES: usize = 1024 * 1024;

/// Buffered frame decoder, one instance per exchange
#[derive(Debug)]
pub struct FrameDecoder {
    /// Decoded text not yet resolved into a complete frame
    buffer: String,
    /// Bytes of a UTF-8 sequence cut at a chunk boundary
    incomplete_utf8: Vec<u8>,
    /// Offset in `buffer` below which no delimiter can start
    scan_pos: usize,
    max_frame_bytes: usize,
    /// Set once the pending frame outgrew `max_frame_bytes`
    overflowed: bool,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDecoder {
    /// Create a decoder with the default frame size limit
    pub fn new() -> Self {
        Self::with_max_frame_bytes(DEFAULT_MAX_FRAME_BYTES)
    }

    /// Create a decoder that rejects frames larger than `max_frame_bytes`
    pub fn with_max_frame_bytes(max_frame_bytes: usize) -> Self {
        Self {
            buffer: String::new(),
            incomplete_utf8: Vec::new(),
            scan_pos: 0,
            max_frame_bytes,
            overflowed: false,
        }
    }

    /// Feed raw bytes into the decoder and extract every completed frame.
    ///
    /// Returns zero, one or many frames. Frames without a data line are
    /// keep-alives and are dropped here.
    ///
    /// When the bytes left after the last delimiter grow past the size limit,
    /// frames completed by this chunk are still returned and the decoder is
    /// marked as overflowed; every later call then fails. With nothing
    /// completed the call fails right away.
    pub fn feed(&mut self, chunk: &[u8]) -> ChatResultOf<Vec<EventFrame>> {
        if self.overflowed {
            return Err(self.overflow_error());
        }
        self.decode_utf8(chunk);

        let mut frames = Vec::new();
        while let Some((frame_end, next_start)) = self.find_frame_boundary() {
            let frame_text = self.buffer[..frame_end].to_string();
            self.buffer.drain(..next_start);
            self.scan_pos = 0;

            match Self::parse_frame(&frame_text) {
                Some(frame) => frames.push(frame),
                None => tracing::trace!("Dropping frame without data line"),
            }
        }

        if self.buffer.len() > self.max_frame_bytes {
            self.clear();
            self.overflowed = true;
            if frames.is_empty() {
                return Err(self.overflow_error());
            }
        }

        Ok(frames)
    }

    /// Whether the pending frame outgrew the size limit
    pub fn is_overflowed(&self) -> bool {
        self.overflowed
    }

    fn overflow_error(&self) -> ChatError {
        ChatError::malformed(format!(
            "Frame exceeds {} bytes without a delimiter",
            self.max_frame_bytes
        ))
    }

    /// Signal end of input.
    ///
    /// Fails with [`ChatError::IncompleteStream`] when a partial frame is still
    /// buffered. Stray blank lines after the last frame are not an error.
    pub fn finish(&mut self) -> ChatResultOf<()> {
        if self.overflowed {
            return Err(self.overflow_error());
        }
        let pending = self.buffer.trim().len() + self.incomplete_utf8.len();
        self.clear();

        if pending > 0 {
            return Err(ChatError::IncompleteStream {
                pending_bytes: pending,
            });
        }
        Ok(())
    }

    /// Append `chunk` to the text buffer, holding back an unfinished UTF-8 tail
    fn decode_utf8(&mut self, chunk: &[u8]) {
        let bytes = if self.incomplete_utf8.is_empty() {
            chunk.to_vec()
        } else {
            let mut combined = std::mem::take(&mut self.incomplete_utf8);
            combined.extend_from_slice(chunk);
            combined
        };

        let mut rest: &[u8] = &bytes;
        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    self.buffer.push_str(valid);
                    break;
                }
                Err(e) => {
                    let (valid, after) = rest.split_at(e.valid_up_to());
                    self.buffer
                        .push_str(std::str::from_utf8(valid).unwrap_or_default());

                    match e.error_len() {
                        // Sequence is cut at the end of the chunk, wait for more
                        None => {
                            self.incomplete_utf8 = after.to_vec();
                            break;
                        }
                        Some(invalid_len) => {
                            tracing::warn!(
                                "Invalid UTF-8 in event stream, replaced {} byte(s)",
                                invalid_len
                            );
                            self.buffer.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[invalid_len..];
                        }
                    }
                }
            }
        }
    }

    /// Locate the next blank-line delimiter.
    ///
    /// Returns the end of the frame text (trailing `\r` excluded) and the
    /// offset right after the delimiter. Accepts `\n\n`, `\r\n\r\n` and mixed
    /// line endings.
    fn find_frame_boundary(&mut self) -> Option<(usize, usize)> {
        let bytes = self.buffer.as_bytes();
        let mut pos = self.scan_pos;

        while let Some(offset) = bytes[pos..].iter().position(|&b| b == b'\n') {
            let newline = pos + offset;
            let mut next = newline + 1;
            if bytes.get(next) == Some(&b'\r') {
                next += 1;
            }
            if bytes.get(next) == Some(&b'\n') {
                let frame_end = if newline > 0 && bytes[newline - 1] == b'\r' {
                    newline - 1
                } else {
                    newline
                };
                return Some((frame_end, next + 1));
            }
            pos = newline + 1;
        }

        // A delimiter may straddle the next chunk: rescan the last line break
        self.scan_pos = bytes
            .iter()
            .rposition(|&b| b == b'\n')
            .unwrap_or(0);
        None
    }

    /// Extract the data line of a frame; other lines are ignored
    fn parse_frame(text: &str) -> Option<EventFrame> {
        let mut data_lines: Vec<&str> = Vec::new();

        for line in text.lines() {
            if let Some(value) = line.strip_prefix(DATA_MARKER) {
                data_lines.push(value.strip_prefix(' ').unwrap_or(value));
            }
            // Comment lines (":"), event/id fields and padding carry nothing
        }

        if data_lines.is_empty() {
            return None;
        }

        Some(EventFrame::new(data_lines.join("\n")))
    }

    /// Drop all buffered state
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.incomplete_utf8.clear();
        self.scan_pos = 0;
    }

    /// Check if there's remaining data in the buffer
    pub fn has_remaining(&self) -> bool {
        !self.buffer.is_empty() || !self.incomplete_utf8.is_empty()
    }

    /// Get remaining buffered text (for debugging)
    pub fn remaining(&self) -> &str {
        &self.buffer
    }

    /// Number of bytes held back from an unfinished UTF-8 sequence
    pub fn incomplete_utf8_len(&self) -> usize {
        self.incomplete_utf8.len()
    }
}
