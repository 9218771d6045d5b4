use serde::{Deserialize, Serialize};

/// Closed taxonomy of user-visible failure kinds.
///
/// Every failure an exchange can hit maps to exactly one of these; the UI
/// renders each kind distinctly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    /// The backend or transport did not answer within the deadline.
    Timeout,
    /// The backend is shedding load (HTTP 429).
    RateLimit,
    /// The request itself was rejected (other 4xx).
    Validation,
    /// The connection could not be established or dropped mid-flight.
    Network,
    /// Anything else, including 5xx responses.
    Server,
}

impl ErrorKind {
    /// Short label used when rendering the error message.
    pub fn label(&self) -> &'static str {
        match self {
            ErrorKind::Timeout => "Request timed out",
            ErrorKind::RateLimit => "Rate limited",
            ErrorKind::Validation => "Request rejected",
            ErrorKind::Network => "Connection problem",
            ErrorKind::Server => "Server error",
        }
    }

    /// A retry hint for the transient kinds; `None` where retrying is unlikely
    /// to help on its own.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            ErrorKind::Timeout | ErrorKind::RateLimit => Some("try again in a moment"),
            ErrorKind::Network => Some("check your connection and try again"),
            ErrorKind::Validation | ErrorKind::Server => None,
        }
    }
}

/// Map an HTTP status code onto the taxonomy.
///
/// Total: any status yields a kind. 2xx never reaches classification in
/// practice but falls through to [`ErrorKind::Server`] rather than panicking.
pub fn classify_status(status: u16) -> ErrorKind {
    match status {
        408 | 504 => ErrorKind::Timeout,
        429 => ErrorKind::RateLimit,
        400..=499 => ErrorKind::Validation,
        _ => ErrorKind::Server,
    }
}

/// A classified failure, ready to be surfaced in the transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatFailure {
    pub kind: ErrorKind,
    /// Raw detail from the transport or backend, kept for logs and display.
    pub detail: String,
}

impl ChatFailure {
    pub fn new(kind: ErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }

    /// Classify an HTTP error response.
    pub fn from_status(status: u16, body: impl Into<String>) -> Self {
        Self::new(classify_status(status), body)
    }

    pub fn network(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::Network, detail)
    }

    pub fn timeout(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, detail)
    }

    /// User-facing description: label, detail and retry hint where one applies.
    pub fn describe(&self) -> String {
        let mut text = self.kind.label().to_string();
        if !self.detail.trim().is_empty() {
            text.push_str(": ");
            text.push_str(self.detail.trim());
        }
        if let Some(hint) = self.kind.hint() {
            text.push_str(" (");
            text.push_str(hint);
            text.push(')');
        }
        text
    }
}

impl std::fmt::Display for ChatFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.describe())
    }
}
