use std::pin::Pin;

use async_trait::async_trait;
use convo::{DecodeError, FileAttachment, Message, Session, SessionId, StreamEvent};
use futures::Stream;
use serde::{Deserialize, Serialize};

use crate::error::{ChatError, StoreError};

/// A finite stream of decoded chat events for one exchange.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent, DecodeError>> + Send>>;

/// Request body shared by `/chat` and `/chat/stream`.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub prompt: String,
    pub task_type: String,
    /// 1..=10, forwarded to the backend's model router.
    pub complexity: u8,
    pub budget: f64,
    /// `null` when the user disabled conversation context.
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment: Option<FileAttachment>,
}

/// Body of a non-streaming `/chat` response.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatReply {
    pub response: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub cost: Option<f64>,
    #[serde(default)]
    pub tokens: Option<u32>,
    #[serde(default)]
    pub cached: Option<bool>,
}

impl ChatReply {
    /// The complete assistant message this reply represents.
    pub fn into_message(self) -> Message {
        let mut message = Message::assistant(self.response);
        message.model = self.model;
        message.tokens = self.tokens;
        message.cost_estimate = self.cost;
        message.cached = self.cached;
        message
    }
}

/// CRUD over remote chat sessions.
///
/// No caching: callers must not assume two `list_sessions` calls agree.
#[async_trait]
pub trait SessionApi: Send + Sync {
    /// Creates a fresh session; every call yields a new id.
    async fn create_session(&self) -> Result<Session, StoreError>;

    /// Sessions ordered by `updated_at` descending, optionally filtered by a
    /// case-insensitive substring over the first-message preview.
    async fn list_sessions(&self, query: Option<&str>) -> Result<Vec<Session>, StoreError>;

    /// Full transcript for a session; [`StoreError::NotFound`] when it no
    /// longer exists.
    async fn load_messages(&self, id: &SessionId) -> Result<Vec<Message>, StoreError>;

    /// Idempotent: deleting a nonexistent session succeeds.
    async fn delete_session(&self, id: &SessionId) -> Result<(), StoreError>;
}

/// The inference backend's two chat endpoints.
#[async_trait]
pub trait ChatApi: Send + Sync {
    /// Single request/response exchange.
    async fn chat(&self, request: &ChatRequest) -> Result<ChatReply, ChatError>;

    /// Streaming exchange. An error return means the backend rejected the
    /// exchange before any data; failures mid-stream arrive on the stream.
    async fn chat_stream(&self, request: &ChatRequest) -> Result<EventStream, ChatError>;
}
