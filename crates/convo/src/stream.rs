//! Line-framed streaming wire protocol.
//!
//! The streaming chat endpoint responds with one JSON object per line, each
//! prefixed `data: `:
//!
//! ```text
//! data: {"type":"metadata","model":"gpt-x"}
//! data: {"type":"content","chunk":"Hi"}
//! data: {"type":"done","tokens":2}
//! ```
//!
//! The transport delivers arbitrary byte chunks; a frame may be split across
//! deliveries. [`StreamDecoder`] reassembles complete lines before parsing,
//! and [`decode_stream`] adapts a raw byte stream into a finite stream of
//! [`StreamEvent`]s.

use std::collections::VecDeque;

use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const DATA_PREFIX: &str = "data: ";

/// A single wire-level event from the streaming chat endpoint.
///
/// Transient: exists only during an active exchange, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamEvent {
    /// First event of an exchange; names the model answering.
    Metadata { model: String },
    /// A fragment of assistant output.
    Content { chunk: String },
    /// Successful end of the exchange with the final token count.
    Done { tokens: u32 },
    /// Backend-reported failure; ends the exchange.
    Error { message: String },
}

impl StreamEvent {
    /// `done` and `error` both end the exchange.
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Done { .. } | StreamEvent::Error { .. })
    }
}

/// Errors from the stream transport. Malformed frames are not errors; they
/// are logged and skipped.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The transport failed before a terminal event arrived.
    #[error("stream transport error: {0}")]
    Transport(String),
}

/// Incremental frame decoder.
///
/// Feed raw chunks as the transport delivers them; complete `data: <json>`
/// lines are parsed into events, and any trailing partial line is buffered
/// until the rest arrives. A line that fails JSON parsing is discarded with a
/// warning but does not abort the stream. Not restartable: once a terminal
/// event has been produced the decoder ignores further input, and a new
/// exchange requires a new decoder.
#[derive(Debug, Default)]
pub struct StreamDecoder {
    buffer: Vec<u8>,
    finished: bool,
}

impl StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a terminal event has been seen.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Feed one raw byte chunk; returns every event completed by it, in order.
    pub fn feed_bytes(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        if self.finished {
            return events;
        }
        self.buffer.extend_from_slice(chunk);
        while let Some(newline) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline).collect();
            if let Some(event) = parse_frame(&line) {
                let terminal = event.is_terminal();
                events.push(event);
                if terminal {
                    self.finished = true;
                    self.buffer.clear();
                    break;
                }
            }
        }
        events
    }

    /// Feed one raw text chunk. See [`StreamDecoder::feed_bytes`].
    pub fn feed(&mut self, chunk: &str) -> Vec<StreamEvent> {
        self.feed_bytes(chunk.as_bytes())
    }

    /// Flush a trailing unterminated frame once the transport has closed.
    pub fn finish(&mut self) -> Option<StreamEvent> {
        if self.finished {
            return None;
        }
        self.finished = true;
        let rest = std::mem::take(&mut self.buffer);
        parse_frame(&rest)
    }
}

/// Parse one complete line into an event. Returns `None` for blank lines,
/// lines without the `data: ` prefix, and malformed JSON payloads.
fn parse_frame(line: &[u8]) -> Option<StreamEvent> {
    let text = match std::str::from_utf8(line) {
        Ok(text) => text.trim(),
        Err(err) => {
            log::warn!("discarding non-UTF-8 stream frame: {err}");
            return None;
        }
    };
    if text.is_empty() {
        return None;
    }
    let Some(payload) = text.strip_prefix(DATA_PREFIX) else {
        log::warn!("discarding unframed stream line: {text:?}");
        return None;
    };
    let payload = payload.trim();
    if payload.is_empty() {
        return None;
    }
    match serde_json::from_str(payload) {
        Ok(event) => Some(event),
        Err(err) => {
            log::warn!("discarding malformed stream frame ({err}): {payload:?}");
            None
        }
    }
}

struct DecodeState<S> {
    transport: S,
    decoder: StreamDecoder,
    ready: VecDeque<StreamEvent>,
    closed: bool,
}

/// Adapt a raw byte stream into a finite, lazy stream of decoded events.
///
/// Terminates when the transport closes or after the first `done`/`error`
/// event; bytes arriving after a terminal event are not read. A transport
/// error is yielded once as `Err` and ends the stream. Not restartable.
pub fn decode_stream<S, B, E>(transport: S) -> impl Stream<Item = Result<StreamEvent, DecodeError>>
where
    S: Stream<Item = Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    E: std::fmt::Display,
{
    let state = DecodeState {
        transport,
        decoder: StreamDecoder::new(),
        ready: VecDeque::new(),
        closed: false,
    };
    futures::stream::unfold(state, |mut state| async move {
        loop {
            if let Some(event) = state.ready.pop_front() {
                return Some((Ok(event), state));
            }
            if state.closed || state.decoder.is_finished() {
                return None;
            }
            match state.transport.next().await {
                Some(Ok(chunk)) => {
                    state.ready.extend(state.decoder.feed_bytes(chunk.as_ref()));
                }
                Some(Err(err)) => {
                    state.closed = true;
                    return Some((Err(DecodeError::Transport(err.to_string())), state));
                }
                None => {
                    state.closed = true;
                    if let Some(event) = state.decoder.finish() {
                        state.ready.push_back(event);
                    }
                }
            }
        }
    })
}
