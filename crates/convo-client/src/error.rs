use convo::{ChatFailure, SessionId};
use thiserror::Error;

/// Errors from the remote session store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The session no longer exists. Callers treat this as "start over with a
    /// fresh session".
    #[error("session not found: {0}")]
    NotFound(SessionId),

    /// The store answered with a non-success status.
    #[error("session store returned HTTP {status}")]
    Status { status: u16 },

    /// The request never completed.
    #[error("session store unreachable: {0}")]
    Network(String),

    /// The response body did not match the contract.
    #[error("malformed session store response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            StoreError::Decode(err.to_string())
        } else {
            StoreError::Network(err.to_string())
        }
    }
}

/// Errors from a chat exchange against the inference backend.
///
/// These never propagate out of the controller; [`ChatError::classify`] turns
/// each one into a [`ChatFailure`] surfaced in the transcript.
#[derive(Debug, Error)]
pub enum ChatError {
    /// No response before the client-side deadline.
    #[error("chat request timed out")]
    Timeout,

    /// The backend rejected the exchange before any stream data.
    #[error("chat backend returned HTTP {status}")]
    Status { status: u16, body: String },

    /// Connection refused, DNS failure, or the transport threw.
    #[error("chat backend unreachable: {0}")]
    Network(String),
}

impl ChatError {
    /// Map onto the closed failure taxonomy. Pure and total.
    pub fn classify(&self) -> ChatFailure {
        match self {
            ChatError::Timeout => ChatFailure::timeout("no response before the deadline"),
            ChatError::Status { status, body } => ChatFailure::from_status(*status, body.clone()),
            ChatError::Network(detail) => ChatFailure::network(detail.clone()),
        }
    }
}

impl From<reqwest::Error> for ChatError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ChatError::Timeout
        } else {
            ChatError::Network(err.to_string())
        }
    }
}
