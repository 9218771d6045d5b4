use std::time::Duration;

use async_trait::async_trait;
use convo::{Message, Session, SessionId, decode_stream};
use futures::StreamExt;
use serde::Deserialize;
use url::Url;

use crate::api::{ChatApi, ChatReply, ChatRequest, EventStream, SessionApi};
use crate::error::{ChatError, StoreError};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct CreateSessionBody {
    session_id: String,
}

#[derive(Debug, Deserialize)]
struct SessionListBody {
    sessions: Vec<Session>,
}

#[derive(Debug, Deserialize)]
struct MessageListBody {
    messages: Vec<Message>,
}

/// reqwest-backed client for the session store and chat endpoints.
#[derive(Debug, Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base: String,
    request_timeout: Duration,
}

impl BackendClient {
    pub fn new(base: Url) -> Self {
        Self {
            http: reqwest::Client::new(),
            base: base.as_str().trim_end_matches('/').to_string(),
            request_timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Deadline for session CRUD and non-streaming chat. Streaming responses
    /// are exempt so long answers are not cut off mid-stream.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }
}

#[async_trait]
impl SessionApi for BackendClient {
    async fn create_session(&self) -> Result<Session, StoreError> {
        let response = self
            .http
            .post(self.endpoint("/sessions/create"))
            .timeout(self.request_timeout)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(StoreError::Status {
                status: status.as_u16(),
            });
        }
        let body: CreateSessionBody = response.json().await?;
        Ok(Session::empty(SessionId::from(body.session_id)))
    }

    async fn list_sessions(&self, query: Option<&str>) -> Result<Vec<Session>, StoreError> {
        let mut request = self
            .http
            .get(self.endpoint("/sessions"))
            .timeout(self.request_timeout);
        if let Some(query) = query {
            request = request.query(&[("q", query)]);
        }
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(StoreError::Status {
                status: status.as_u16(),
            });
        }
        let body: SessionListBody = response.json().await?;
        let mut sessions = body.sessions;
        // The server is expected to filter and order; re-check both so the
        // contract holds even against a lax backend.
        if let Some(query) = query {
            sessions.retain(|session| session.matches_query(query));
        }
        sessions.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(sessions)
    }

    async fn load_messages(&self, id: &SessionId) -> Result<Vec<Message>, StoreError> {
        let response = self
            .http
            .get(self.endpoint(&format!("/sessions/{}/messages", id)))
            .timeout(self.request_timeout)
            .send()
            .await?;
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound(id.clone()));
        }
        if !status.is_success() {
            return Err(StoreError::Status {
                status: status.as_u16(),
            });
        }
        let body: MessageListBody = response.json().await?;
        Ok(body.messages)
    }

    async fn delete_session(&self, id: &SessionId) -> Result<(), StoreError> {
        let response = self
            .http
            .delete(self.endpoint(&format!("/sessions/{}", id)))
            .timeout(self.request_timeout)
            .send()
            .await?;
        let status = response.status();
        // Idempotent: a session that is already gone counts as deleted.
        if status.is_success() || status == reqwest::StatusCode::NOT_FOUND {
            Ok(())
        } else {
            Err(StoreError::Status {
                status: status.as_u16(),
            })
        }
    }
}

#[async_trait]
impl ChatApi for BackendClient {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatReply, ChatError> {
        let response = self
            .http
            .post(self.endpoint("/chat"))
            .timeout(self.request_timeout)
            .json(request)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChatError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json().await?)
    }

    async fn chat_stream(&self, request: &ChatRequest) -> Result<EventStream, ChatError> {
        let response = self
            .http
            .post(self.endpoint("/chat/stream"))
            .json(request)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChatError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(Box::pin(decode_stream(response.bytes_stream().boxed())))
    }
}
