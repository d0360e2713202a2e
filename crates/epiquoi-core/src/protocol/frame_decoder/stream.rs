//! Lazy frame sequence over a response byte stream

use super::{EventFrame, FrameDecoder};
use crate::error::{ChatError, ChatResultOf};
use bytes::Bytes;
use futures::{Stream, StreamExt, stream};
use std::collections::VecDeque;
use std::pin::Pin;

/// Finite, non-restartable sequence of decoded frames
pub type FrameStream = Pin<Box<dyn Stream<Item = ChatResultOf<EventFrame>> + Send>>;

struct StreamState<S> {
    bytes: S,
    decoder: FrameDecoder,
    ready: VecDeque<EventFrame>,
    /// Size-limit failure to report once `ready` is drained
    overflow: Option<ChatError>,
    done: bool,
}

/// Drive `decoder` over `bytes`, yielding frames in wire order.
///
/// The first error (transport failure, oversized frame, or a partial frame
/// left at end of input) is yielded once and ends the sequence. Frames
/// completed before an oversized tail are yielded ahead of its error. Bytes are
/// only pulled from the transport when no decoded frame is waiting, so
/// dropping the stream after a terminal frame leaves the rest of the body
/// unread.
pub fn frame_stream<S>(bytes: S, decoder: FrameDecoder) -> FrameStream
where
    S: Stream<Item = ChatResultOf<Bytes>> + Send + Unpin + 'static,
{
    let state = StreamState {
        bytes,
        decoder,
        ready: VecDeque::new(),
        overflow: None,
        done: false,
    };

    Box::pin(stream::unfold(state, |mut state| async move {
        loop {
            if let Some(frame) = state.ready.pop_front() {
                return Some((Ok(frame), state));
            }
            if let Some(e) = state.overflow.take() {
                return Some((Err(e), state));
            }
            if state.done {
                return None;
            }

            match state.bytes.next().await {
                Some(Ok(chunk)) => match state.decoder.feed(&chunk) {
                    Ok(frames) => {
                        state.ready.extend(frames);
                        if state.decoder.is_overflowed() {
                            state.overflow = Some(state.decoder.overflow_error());
                            state.done = true;
                        }
                    }
                    Err(e) => {
                        state.done = true;
                        return Some((Err(e), state));
                    }
                },
                Some(Err(e)) => {
                    state.done = true;
                    return Some((Err(e), state));
                }
                None => {
                    state.done = true;
                    if let Err(e) = state.decoder.finish() {
                        return Some((Err(e), state));
                    }
                }
            }
        }
    }))
}
