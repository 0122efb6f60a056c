//! Session persistence for storyfeed.
//!
//! The session (`email`, `name`, `token`) is written by the login flow, cleared
//! on logout, and read before every authenticated request. Components that need
//! a token receive a [`SessionStore`] explicitly; nothing reads it as ambient
//! global state.
//!
//! - [`MemorySessionStore`] keeps the session in process memory.
//! - [`FileSessionStore`] keeps it in `session.json` under a namespace directory,
//!   written with a temp file + rename so a crash never leaves a torn file.

mod atomic_write;
mod file;

use std::sync::{Mutex, PoisonError};

use thiserror::Error;

pub use file::FileSessionStore;
pub use storyfeed_types::{AuthToken, Session};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to access session file {path}: {source}")]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("session file {path} is corrupt: {source}")]
    Corrupt {
        path: std::path::PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Persisted key/value store for the current session.
pub trait SessionStore: Send + Sync {
    fn save(&self, session: &Session) -> Result<(), SessionError>;

    /// Loads the current session. A store that has never been written yields
    /// an unauthenticated [`Session::default`].
    fn load(&self) -> Result<Session, SessionError>;

    fn clear(&self) -> Result<(), SessionError>;

    /// Convenience for callers that only need the bearer credential.
    fn token(&self) -> Result<Option<AuthToken>, SessionError> {
        Ok(self.load()?.token)
    }
}

impl<T: SessionStore + ?Sized> SessionStore for std::sync::Arc<T> {
    fn save(&self, session: &Session) -> Result<(), SessionError> {
        (**self).save(session)
    }

    fn load(&self) -> Result<Session, SessionError> {
        (**self).load()
    }

    fn clear(&self) -> Result<(), SessionError> {
        (**self).clear()
    }
}

/// In-process session store.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    session: Mutex<Session>,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_session(session: Session) -> Self {
        Self {
            session: Mutex::new(session),
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn save(&self, session: &Session) -> Result<(), SessionError> {
        *self.session.lock().unwrap_or_else(PoisonError::into_inner) = session.clone();
        Ok(())
    }

    fn load(&self) -> Result<Session, SessionError> {
        Ok(self
            .session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn clear(&self) -> Result<(), SessionError> {
        *self.session.lock().unwrap_or_else(PoisonError::into_inner) = Session::default();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_round_trip_and_clear() {
        let store = MemorySessionStore::new();
        assert!(!store.load().unwrap().is_authenticated());

        let token = AuthToken::new("tok").unwrap();
        store
            .save(&Session::authenticated("a@b.co", "Ann", token.clone()))
            .unwrap();
        assert_eq!(store.token().unwrap(), Some(token));
        assert_eq!(store.load().unwrap().name, "Ann");

        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), Session::default());
    }

    #[test]
    fn arc_store_delegates() {
        let store = std::sync::Arc::new(MemorySessionStore::new());
        let token = AuthToken::new("tok").unwrap();
        store
            .save(&Session::authenticated("a@b.co", "Ann", token))
            .unwrap();
        let dyn_store: std::sync::Arc<dyn SessionStore> = store.clone();
        assert!(dyn_store.load().unwrap().is_authenticated());
    }
}
