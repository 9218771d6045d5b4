use std::fs;
use std::path::PathBuf;

use convo::SessionId;

/// Remembers the active session across restarts.
///
/// One id, one small file; a returning user resumes their last conversation.
/// Writes are best-effort: a failed write is logged and the session simply
/// starts fresh next time.
#[derive(Debug, Clone)]
pub struct ActiveSessionCache {
    path: PathBuf,
}

impl ActiveSessionCache {
    /// Cache under the platform data directory, or `None` when the platform
    /// has no such directory.
    pub fn in_default_dir() -> Option<Self> {
        dirs::data_dir().map(|dir| Self::at(dir.join("convo").join("active_session")))
    }

    /// Cache at an explicit path. Used by tests and embedders.
    pub fn at(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn load(&self) -> Option<SessionId> {
        let raw = fs::read_to_string(&self.path).ok()?;
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(SessionId::from(trimmed))
        }
    }

    pub fn store(&self, id: &SessionId) {
        if let Some(parent) = self.path.parent() {
            if let Err(err) = fs::create_dir_all(parent) {
                log::warn!("could not create state directory {parent:?}: {err}");
                return;
            }
        }
        if let Err(err) = fs::write(&self.path, id.as_str()) {
            log::warn!("could not persist active session id: {err}");
        }
    }

    pub fn clear(&self) {
        if let Err(err) = fs::remove_file(&self.path) {
            if err.kind() != std::io::ErrorKind::NotFound {
                log::warn!("could not clear active session id: {err}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_the_active_session_id() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ActiveSessionCache::at(dir.path().join("state").join("active_session"));
        assert!(cache.load().is_none());

        let id = SessionId::from("sess-42");
        cache.store(&id);
        assert_eq!(cache.load(), Some(id));

        cache.clear();
        assert!(cache.load().is_none());
        // Clearing twice stays quiet.
        cache.clear();
    }
}
