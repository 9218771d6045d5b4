//! Networked half of the convo chat engine.
//!
//! Wraps the remote session store and inference backend behind the
//! [`api::SessionApi`] and [`api::ChatApi`] traits, and drives them from a
//! [`controller::SessionController`] that owns the transcript and the
//! send/receive lifecycle. Rendering stays decoupled: the controller and the
//! debounced [`search::SessionSearch`] publish their state changes over
//! broadcast channels.

/// Backend API traits and request/response bodies
pub mod api;

/// Session controller: transcript ownership and exchange lifecycle
pub mod controller;

/// Client-side error types
pub mod error;

/// reqwest-backed implementation of the backend APIs
pub mod http;

/// Debounced session-list search
pub mod search;

/// Persisted client state (active session id)
pub mod state;

pub use api::{ChatApi, ChatReply, ChatRequest, EventStream, SessionApi};
pub use controller::{
    ChatProfile, ControllerEvent, SendOptions, SendOutcome, SessionController,
};
pub use error::{ChatError, StoreError};
pub use http::BackendClient;
pub use search::{SEARCH_DEBOUNCE, SearchUpdate, SessionSearch};
pub use state::ActiveSessionCache;
