use std::sync::{Arc, Mutex};
use std::time::Duration;

use convo::Session;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::api::SessionApi;

/// How long a query must sit unchanged before the list request fires.
pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

/// Search state pushed to subscribers. `Results` with an empty list is a
/// valid final state, distinct from `Loading`.
#[derive(Debug, Clone)]
pub enum SearchUpdate {
    Loading,
    Results {
        query: String,
        sessions: Vec<Session>,
    },
    Failed {
        query: String,
        detail: String,
    },
}

/// Debounced filter over the session list.
///
/// Each [`SessionSearch::set_query`] call supersedes the previous one: the
/// pending timer task is aborted, so rapid typing issues exactly one list
/// request, for the latest query. Last write wins; pending searches never
/// stack.
pub struct SessionSearch {
    sessions: Arc<dyn SessionApi>,
    pending: Mutex<Option<JoinHandle<()>>>,
    updates: broadcast::Sender<SearchUpdate>,
}

impl SessionSearch {
    pub fn new(sessions: Arc<dyn SessionApi>) -> Self {
        let (updates, _) = broadcast::channel(16);
        Self {
            sessions,
            pending: Mutex::new(None),
            updates,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SearchUpdate> {
        self.updates.subscribe()
    }

    /// Schedule a query, superseding any pending one.
    pub fn set_query(&self, query: &str) {
        let mut pending = match self.pending.lock() {
            Ok(pending) => pending,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(handle) = pending.take() {
            handle.abort();
        }
        let _ = self.updates.send(SearchUpdate::Loading);

        let sessions = self.sessions.clone();
        let updates = self.updates.clone();
        let query = query.trim().to_string();
        *pending = Some(tokio::spawn(async move {
            tokio::time::sleep(SEARCH_DEBOUNCE).await;
            let filter = (!query.is_empty()).then_some(query.as_str());
            let update = match sessions.list_sessions(filter).await {
                Ok(sessions) => SearchUpdate::Results {
                    query: query.clone(),
                    sessions,
                },
                Err(err) => SearchUpdate::Failed {
                    query: query.clone(),
                    detail: err.to_string(),
                },
            };
            let _ = updates.send(update);
        }));
    }
}

impl Drop for SessionSearch {
    fn drop(&mut self) {
        if let Ok(mut pending) = self.pending.lock()
            && let Some(handle) = pending.take()
        {
            handle.abort();
        }
    }
}
