use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};

use crate::error::{ChatFailure, ErrorKind};

/// Role of a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The human participant
    User,
    /// The model's response
    Assistant,
    /// A classified failure rendered in place of a response
    Error,
}

/// A file the user attached to an outbound message.
///
/// Built client-side on file selection and never mutated after send. Binary
/// content is carried base64-encoded; text content is carried as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileAttachment {
    pub name: String,
    pub mime_type: String,
    pub content: String,
    pub size_bytes: u64,
}

impl FileAttachment {
    /// Attachment from text content (e.g. a pasted source file).
    pub fn from_text(name: impl Into<String>, mime_type: impl Into<String>, text: &str) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            content: text.to_string(),
            size_bytes: text.len() as u64,
        }
    }

    /// Attachment from binary content, base64-encoded for transport.
    pub fn from_bytes(name: impl Into<String>, mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            content: BASE64.encode(bytes),
            size_bytes: bytes.len() as u64,
        }
    }
}

/// A single entry in a conversation transcript.
///
/// Append-only once closed. The one currently-streaming assistant message is
/// the only message that mutates, and only by growing `content`; see
/// [`crate::accumulator::MessageAccumulator`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_estimate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cached: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment: Option<FileAttachment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
}

impl Message {
    fn bare(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            model: None,
            tokens: None,
            cost_estimate: None,
            cached: None,
            attachment: None,
            error_kind: None,
        }
    }

    /// An outbound user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::bare(Role::User, content)
    }

    /// An assistant message; starts empty while streaming.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::bare(Role::Assistant, content)
    }

    /// An error-role message carrying a classified failure description.
    pub fn failure(failure: &ChatFailure) -> Self {
        let mut message = Self::bare(Role::Error, failure.describe());
        message.error_kind = Some(failure.kind);
        message
    }

    pub fn with_attachment(mut self, attachment: FileAttachment) -> Self {
        self.attachment = Some(attachment);
        self
    }

    /// Whether this message renders as a failure (error role or annotated with
    /// an error kind after a mid-stream failure).
    pub fn is_error(&self) -> bool {
        self.role == Role::Error || self.error_kind.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_attachment_is_base64_encoded() {
        let attachment = FileAttachment::from_bytes("img.png", "image/png", &[0x89, 0x50, 0x4e]);
        assert_eq!(attachment.size_bytes, 3);
        assert_eq!(attachment.content, "iVBO");
    }

    #[test]
    fn failure_message_carries_kind_and_description() {
        let failure = ChatFailure::from_status(429, "slow down");
        let message = Message::failure(&failure);
        assert_eq!(message.role, Role::Error);
        assert_eq!(message.error_kind, Some(ErrorKind::RateLimit));
        assert!(message.content.contains("slow down"));
        assert!(message.is_error());
    }

    #[test]
    fn wire_roles_are_lowercase() {
        let json = serde_json::to_string(&Message::user("hi")).unwrap();
        assert!(json.contains("\"role\":\"user\""));
        let parsed: Message = serde_json::from_str(r#"{"role":"assistant","content":"ok"}"#).unwrap();
        assert_eq!(parsed.role, Role::Assistant);
        assert_eq!(parsed.tokens, None);
    }
}
