use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A unique identifier for a session.
///
/// Opaque to the client; the backend mints ids on session creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    /// Mint a random id. Fixtures only; real ids are assigned by the store.
    pub fn new() -> Self {
        SessionId(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        SessionId(s.to_string())
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        SessionId(s)
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A conversation session as reported by the session store.
///
/// The listing endpoint orders sessions by `updated_at` descending;
/// `updated_at` advances on every new message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub message_count: u32,
    /// Opening words of the first user message, used for list display and
    /// search.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_message_preview: Option<String>,
}

impl Session {
    /// A fresh, empty session with the given id and current timestamps.
    pub fn empty(id: SessionId) -> Self {
        let now = Utc::now();
        Self {
            id,
            created_at: now,
            updated_at: now,
            message_count: 0,
            first_message_preview: None,
        }
    }

    /// Case-insensitive substring match against the first-message preview.
    /// A session without a preview matches only the empty query.
    pub fn matches_query(&self, query: &str) -> bool {
        if query.is_empty() {
            return true;
        }
        match &self.first_message_preview {
            Some(preview) => preview.to_lowercase().contains(&query.to_lowercase()),
            None => false,
        }
    }
}
