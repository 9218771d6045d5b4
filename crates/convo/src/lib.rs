//! Core building blocks for the convo chat client.
//!
//! # Overview
//! This crate holds everything about a conversation that does not require a
//! network connection:
//!
//! - Session and message data model
//! - The line-framed streaming wire protocol and its incremental decoder
//! - The per-exchange accumulator that folds stream events into a transcript
//! - The closed failure taxonomy surfaced to users
//!
//! The HTTP client, session controller and search live in `convo-client`.

/// Per-exchange state machine folding stream events into one assistant message
pub mod accumulator;

/// Failure taxonomy and classification
pub mod error;

/// Transcript messages and file attachments
pub mod message;

/// Sessions and session identity
pub mod session;

/// Streaming wire protocol: events and the incremental frame decoder
pub mod stream;

pub use accumulator::{ExchangePhase, MessageAccumulator};
pub use error::{ChatFailure, ErrorKind, classify_status};
pub use message::{FileAttachment, Message, Role};
pub use session::{Session, SessionId};
pub use stream::{DecodeError, StreamDecoder, StreamEvent, decode_stream};
