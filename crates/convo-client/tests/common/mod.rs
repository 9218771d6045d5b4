#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use convo::{DecodeError, Message, Session, SessionId, StreamEvent};
use convo_client::api::{ChatApi, ChatReply, ChatRequest, EventStream, SessionApi};
use convo_client::error::{ChatError, StoreError};
use futures::channel::mpsc;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// In-memory session store double with call accounting.
#[derive(Default)]
pub struct FakeStore {
    sessions: Mutex<Vec<Session>>,
    messages: Mutex<HashMap<String, Vec<Message>>>,
    created: AtomicUsize,
    pub list_calls: AtomicUsize,
    pub last_query: Mutex<Option<String>>,
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_session(&self, id: &str, preview: Option<&str>, messages: Vec<Message>) {
        let mut session = Session::empty(SessionId::from(id));
        session.first_message_preview = preview.map(str::to_string);
        self.sessions.lock().unwrap().push(session);
        self.messages
            .lock()
            .unwrap()
            .insert(id.to_string(), messages);
    }

    pub fn list_call_count(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionApi for FakeStore {
    async fn create_session(&self) -> Result<Session, StoreError> {
        let n = self.created.fetch_add(1, Ordering::SeqCst);
        let id = format!("fake-session-{n}");
        let session = Session::empty(SessionId::from(id.as_str()));
        self.sessions.lock().unwrap().push(session.clone());
        self.messages.lock().unwrap().insert(id, Vec::new());
        Ok(session)
    }

    async fn list_sessions(&self, query: Option<&str>) -> Result<Vec<Session>, StoreError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_query.lock().unwrap() = query.map(str::to_string);
        let sessions = self.sessions.lock().unwrap();
        Ok(sessions
            .iter()
            .filter(|session| session.matches_query(query.unwrap_or_default()))
            .cloned()
            .collect())
    }

    async fn load_messages(&self, id: &SessionId) -> Result<Vec<Message>, StoreError> {
        self.messages
            .lock()
            .unwrap()
            .get(id.as_str())
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }

    async fn delete_session(&self, id: &SessionId) -> Result<(), StoreError> {
        self.sessions
            .lock()
            .unwrap()
            .retain(|session| session.id != *id);
        self.messages.lock().unwrap().remove(id.as_str());
        Ok(())
    }
}

/// Chat backend double: each `chat_stream` call consumes the next scripted
/// stream, which yields whatever the test pushes into its sender.
#[derive(Default)]
pub struct ScriptedChat {
    streams: Mutex<VecDeque<mpsc::UnboundedReceiver<Result<StreamEvent, DecodeError>>>>,
    reply: Mutex<Option<ChatReply>>,
}

impl ScriptedChat {
    pub fn streaming() -> (
        Self,
        mpsc::UnboundedSender<Result<StreamEvent, DecodeError>>,
    ) {
        let scripted = Self::default();
        let tx = scripted.push_stream();
        (scripted, tx)
    }

    /// Script one more stream; dropping the sender closes it.
    pub fn push_stream(&self) -> mpsc::UnboundedSender<Result<StreamEvent, DecodeError>> {
        let (tx, rx) = mpsc::unbounded();
        self.streams.lock().unwrap().push_back(rx);
        tx
    }

    pub fn replying(reply: ChatReply) -> Self {
        Self {
            streams: Mutex::new(VecDeque::new()),
            reply: Mutex::new(Some(reply)),
        }
    }
}

#[async_trait]
impl ChatApi for ScriptedChat {
    async fn chat(&self, _request: &ChatRequest) -> Result<ChatReply, ChatError> {
        self.reply
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| ChatError::Network("no scripted reply".to_string()))
    }

    async fn chat_stream(&self, _request: &ChatRequest) -> Result<EventStream, ChatError> {
        let rx = self
            .streams
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| ChatError::Network("no scripted stream".to_string()))?;
        Ok(Box::pin(rx))
    }
}

pub fn metadata(model: &str) -> Result<StreamEvent, DecodeError> {
    Ok(StreamEvent::Metadata {
        model: model.to_string(),
    })
}

pub fn content(chunk: &str) -> Result<StreamEvent, DecodeError> {
    Ok(StreamEvent::Content {
        chunk: chunk.to_string(),
    })
}

pub fn done(tokens: u32) -> Result<StreamEvent, DecodeError> {
    Ok(StreamEvent::Done { tokens })
}
