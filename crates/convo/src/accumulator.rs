use crate::error::{ChatFailure, ErrorKind};
use crate::message::{Message, Role};
use crate::stream::StreamEvent;

/// Lifecycle of a single prompt/response exchange.
///
/// `Closed` and `ClosedError` are terminal: no transition leaves them, and a
/// new send always starts a fresh accumulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangePhase {
    /// No stream event seen yet.
    Idle,
    /// The assistant message is open and growing.
    Streaming,
    /// Ended by a `done` event; the message is immutable.
    Closed,
    /// Ended by an `error` event or a transport failure.
    ClosedError,
}

/// Folds decoded stream events into the transcript's single open assistant
/// message.
///
/// The draft message is the only mutable message in a transcript, and only
/// its content grows; everything else is set at most once. Events arriving
/// after a terminal phase are ignored.
#[derive(Debug)]
pub struct MessageAccumulator {
    phase: ExchangePhase,
    draft: Message,
}

impl Default for MessageAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageAccumulator {
    pub fn new() -> Self {
        Self {
            phase: ExchangePhase::Idle,
            draft: Message::assistant(""),
        }
    }

    pub fn phase(&self) -> ExchangePhase {
        self.phase
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self.phase,
            ExchangePhase::Closed | ExchangePhase::ClosedError
        )
    }

    /// Current view of the in-flight assistant message.
    pub fn draft(&self) -> &Message {
        &self.draft
    }

    /// Apply one decoded event.
    pub fn apply(&mut self, event: StreamEvent) {
        if self.is_terminal() {
            log::debug!("ignoring stream event after terminal phase");
            return;
        }
        match event {
            StreamEvent::Metadata { model } => {
                if self.draft.model.is_none() {
                    self.draft.model = Some(model);
                }
                self.phase = ExchangePhase::Streaming;
            }
            StreamEvent::Content { chunk } => {
                // Tolerate a missing (or discarded) metadata frame: content
                // opens the message too.
                self.draft.content.push_str(&chunk);
                self.phase = ExchangePhase::Streaming;
            }
            StreamEvent::Done { tokens } => {
                self.draft.tokens = Some(tokens);
                self.phase = ExchangePhase::Closed;
            }
            StreamEvent::Error { message } => {
                self.fail(ChatFailure::new(ErrorKind::Server, message));
            }
        }
    }

    /// Close the exchange with a classified failure.
    ///
    /// Content streamed before the failure is preserved: the message keeps its
    /// partial text and gains the error annotation. When nothing has streamed
    /// yet the message becomes a plain error-role message carrying the
    /// classified description.
    pub fn fail(&mut self, failure: ChatFailure) {
        if self.is_terminal() {
            return;
        }
        if self.draft.content.is_empty() {
            self.draft.role = Role::Error;
            self.draft.content = failure.describe();
        }
        self.draft.error_kind = Some(failure.kind);
        self.phase = ExchangePhase::ClosedError;
    }

    /// Consume the accumulator, yielding the final immutable message.
    pub fn into_message(self) -> Message {
        self.draft
    }
}
