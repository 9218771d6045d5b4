use std::sync::Arc;

use convo::{
    ChatFailure, DecodeError, ExchangePhase, FileAttachment, Message, MessageAccumulator,
    SessionId,
};
use futures::StreamExt;
use tokio::sync::{Mutex, broadcast};

use crate::api::{ChatApi, ChatRequest, SessionApi};
use crate::error::StoreError;
use crate::state::ActiveSessionCache;

/// Per-send switches exposed to the UI.
#[derive(Debug, Clone, Copy)]
pub struct SendOptions {
    pub streaming: bool,
    /// When off, the exchange is sent without a session id and the backend
    /// answers without conversation context.
    pub context_enabled: bool,
}

impl Default for SendOptions {
    fn default() -> Self {
        Self {
            streaming: true,
            context_enabled: true,
        }
    }
}

/// Routing parameters forwarded with every chat request.
#[derive(Debug, Clone)]
pub struct ChatProfile {
    pub task_type: String,
    pub complexity: u8,
    pub budget: f64,
}

impl Default for ChatProfile {
    fn default() -> Self {
        Self {
            task_type: "chat".to_string(),
            complexity: 5,
            budget: 1.0,
        }
    }
}

/// Result of a [`SessionController::send`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// The exchange ran to a terminal state (including classified failures).
    Completed,
    /// Nothing happened: empty prompt, or an exchange was already in flight.
    Rejected,
}

/// Notifications for render subscribers. Carry no data; subscribers pull a
/// consistent snapshot via [`SessionController::transcript`].
#[derive(Debug, Clone)]
pub enum ControllerEvent {
    TranscriptChanged,
    SessionChanged(SessionId),
    ExchangeStarted,
    ExchangeFinished,
}

struct ControllerState {
    active: SessionId,
    transcript: Vec<Message>,
    in_flight: bool,
    /// Bumped by every send and every session switch. Stream events carry the
    /// generation they started under and are dropped once it is stale.
    generation: u64,
}

/// Owns the active session, the transcript and the send/receive lifecycle.
///
/// The controller (with its accumulator) is the transcript's single writer;
/// at most one exchange is in flight at a time. Both a session switch and an
/// explicit [`SessionController::cancel`] detach rather than abort an
/// outstanding exchange: its late events are dropped, never merged into the
/// transcript.
pub struct SessionController {
    sessions: Arc<dyn SessionApi>,
    chat: Arc<dyn ChatApi>,
    profile: ChatProfile,
    cache: Option<ActiveSessionCache>,
    state: Arc<Mutex<ControllerState>>,
    events: broadcast::Sender<ControllerEvent>,
}

impl SessionController {
    /// Resume the cached session when it still exists, otherwise create a
    /// fresh one.
    pub async fn connect(
        sessions: Arc<dyn SessionApi>,
        chat: Arc<dyn ChatApi>,
        cache: Option<ActiveSessionCache>,
    ) -> Result<Self, StoreError> {
        let resumed = match cache.as_ref().and_then(ActiveSessionCache::load) {
            Some(id) => match sessions.load_messages(&id).await {
                Ok(messages) => Some((id, messages)),
                Err(StoreError::NotFound(id)) => {
                    log::debug!("cached session {id} is gone, starting fresh");
                    None
                }
                Err(err) => return Err(err),
            },
            None => None,
        };
        let (active, transcript) = match resumed {
            Some(resumed) => resumed,
            None => (sessions.create_session().await?.id, Vec::new()),
        };
        if let Some(cache) = cache.as_ref() {
            cache.store(&active);
        }
        let (events, _) = broadcast::channel(64);
        Ok(Self {
            sessions,
            chat,
            profile: ChatProfile::default(),
            cache,
            state: Arc::new(Mutex::new(ControllerState {
                active,
                transcript,
                in_flight: false,
                generation: 0,
            })),
            events,
        })
    }

    pub fn with_profile(mut self, profile: ChatProfile) -> Self {
        self.profile = profile;
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ControllerEvent> {
        self.events.subscribe()
    }

    pub async fn transcript(&self) -> Vec<Message> {
        self.state.lock().await.transcript.clone()
    }

    pub async fn active_session(&self) -> SessionId {
        self.state.lock().await.active.clone()
    }

    pub async fn is_busy(&self) -> bool {
        self.state.lock().await.in_flight
    }

    /// Send a prompt on the active session.
    ///
    /// Rejected when the prompt is blank with no attachment, or while another
    /// exchange is in flight. Backend and transport failures never propagate:
    /// they become terminal error messages in the transcript, and the
    /// controller is idle again once `send` returns.
    pub async fn send(
        &self,
        prompt: &str,
        attachment: Option<FileAttachment>,
        options: SendOptions,
    ) -> SendOutcome {
        if prompt.trim().is_empty() && attachment.is_none() {
            log::debug!("rejecting send: empty prompt and no attachment");
            return SendOutcome::Rejected;
        }
        let (generation, session_id) = {
            let mut state = self.state.lock().await;
            if state.in_flight {
                log::debug!("rejecting send: an exchange is already in flight");
                return SendOutcome::Rejected;
            }
            state.in_flight = true;
            state.generation += 1;
            let mut user = Message::user(prompt);
            if let Some(attachment) = attachment.clone() {
                user = user.with_attachment(attachment);
            }
            state.transcript.push(user);
            (state.generation, state.active.clone())
        };
        self.emit(ControllerEvent::ExchangeStarted);
        self.emit(ControllerEvent::TranscriptChanged);

        let request = ChatRequest {
            prompt: prompt.to_string(),
            task_type: self.profile.task_type.clone(),
            complexity: self.profile.complexity,
            budget: self.profile.budget,
            session_id: options
                .context_enabled
                .then(|| session_id.as_str().to_string()),
            attachment,
        };
        if options.streaming {
            self.run_streaming(generation, &request).await;
        } else {
            self.run_blocking(generation, &request).await;
        }
        SendOutcome::Completed
    }

    /// Detach the in-flight exchange, if any. The controller is idle again
    /// immediately; output already streamed stays in the transcript, and late
    /// events from the detached stream are dropped. Returns `false` when
    /// nothing was in flight.
    pub async fn cancel(&self) -> bool {
        {
            let mut state = self.state.lock().await;
            if !state.in_flight {
                return false;
            }
            state.generation += 1;
            state.in_flight = false;
        }
        self.emit(ControllerEvent::ExchangeFinished);
        true
    }

    /// Replace the transcript with another session's messages.
    ///
    /// A session that has vanished is treated as "start over": a fresh
    /// session is created instead.
    pub async fn switch_session(&self, id: &SessionId) -> Result<(), StoreError> {
        match self.sessions.load_messages(id).await {
            Ok(messages) => {
                self.activate(id.clone(), messages).await;
                Ok(())
            }
            Err(StoreError::NotFound(_)) => self.new_session().await,
            Err(err) => Err(err),
        }
    }

    /// Create and activate a fresh, empty session.
    pub async fn new_session(&self) -> Result<(), StoreError> {
        let session = self.sessions.create_session().await?;
        self.activate(session.id, Vec::new()).await;
        Ok(())
    }

    /// Delete a session; deleting the active one immediately activates a
    /// fresh session, so the controller never points at a dangling id.
    pub async fn delete_session(&self, id: &SessionId) -> Result<(), StoreError> {
        self.sessions.delete_session(id).await?;
        let was_active = self.state.lock().await.active == *id;
        if was_active {
            self.new_session().await?;
        }
        Ok(())
    }

    async fn run_streaming(&self, generation: u64, request: &ChatRequest) {
        let mut stream = match self.chat.chat_stream(request).await {
            Ok(stream) => stream,
            Err(err) => {
                self.append_if_current(generation, Message::failure(&err.classify()))
                    .await;
                self.finish_exchange(generation).await;
                return;
            }
        };
        let mut accumulator = MessageAccumulator::new();
        let mut draft_index = None;
        loop {
            match stream.next().await {
                Some(Ok(event)) => {
                    accumulator.apply(event);
                    if accumulator.phase() == ExchangePhase::Idle {
                        continue;
                    }
                    if !self
                        .publish_draft(generation, &mut draft_index, &accumulator)
                        .await
                    {
                        // Stale exchange: the session changed under us.
                        return;
                    }
                    if accumulator.is_terminal() {
                        break;
                    }
                }
                Some(Err(DecodeError::Transport(detail))) => {
                    accumulator.fail(ChatFailure::network(detail));
                    self.publish_draft(generation, &mut draft_index, &accumulator)
                        .await;
                    break;
                }
                None => {
                    if !accumulator.is_terminal() {
                        accumulator.fail(ChatFailure::network("stream ended before completion"));
                        self.publish_draft(generation, &mut draft_index, &accumulator)
                            .await;
                    }
                    break;
                }
            }
        }
        self.finish_exchange(generation).await;
    }

    async fn run_blocking(&self, generation: u64, request: &ChatRequest) {
        match self.chat.chat(request).await {
            Ok(reply) => {
                self.append_if_current(generation, reply.into_message())
                    .await;
            }
            Err(err) => {
                self.append_if_current(generation, Message::failure(&err.classify()))
                    .await;
            }
        }
        self.finish_exchange(generation).await;
    }

    /// Mirror the accumulator's draft into the transcript, appending it on
    /// first publish and rewriting it in place afterwards. Returns `false`
    /// without touching anything when the exchange has gone stale.
    async fn publish_draft(
        &self,
        generation: u64,
        draft_index: &mut Option<usize>,
        accumulator: &MessageAccumulator,
    ) -> bool {
        {
            let mut state = self.state.lock().await;
            if state.generation != generation {
                log::debug!("dropping stream update for a stale exchange");
                return false;
            }
            match *draft_index {
                Some(index) => state.transcript[index] = accumulator.draft().clone(),
                None => {
                    state.transcript.push(accumulator.draft().clone());
                    *draft_index = Some(state.transcript.len() - 1);
                }
            }
        }
        self.emit(ControllerEvent::TranscriptChanged);
        true
    }

    async fn append_if_current(&self, generation: u64, message: Message) -> bool {
        {
            let mut state = self.state.lock().await;
            if state.generation != generation {
                log::debug!("dropping result for a stale exchange");
                return false;
            }
            state.transcript.push(message);
        }
        self.emit(ControllerEvent::TranscriptChanged);
        true
    }

    async fn finish_exchange(&self, generation: u64) {
        {
            let mut state = self.state.lock().await;
            if state.generation != generation {
                return;
            }
            state.in_flight = false;
        }
        self.emit(ControllerEvent::ExchangeFinished);
    }

    async fn activate(&self, id: SessionId, transcript: Vec<Message>) {
        {
            let mut state = self.state.lock().await;
            // Detach any in-flight exchange: bumping the generation turns its
            // remaining events into no-ops.
            state.generation += 1;
            state.in_flight = false;
            state.active = id.clone();
            state.transcript = transcript;
        }
        if let Some(cache) = self.cache.as_ref() {
            cache.store(&id);
        }
        self.emit(ControllerEvent::SessionChanged(id));
        self.emit(ControllerEvent::TranscriptChanged);
    }

    fn emit(&self, event: ControllerEvent) {
        // No subscribers is fine; rendering is optional.
        let _ = self.events.send(event);
    }
}
