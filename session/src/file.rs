use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use storyfeed_types::Session;

use crate::atomic_write::{recover_bak_file, write_owner_only};
use crate::{SessionError, SessionStore};

/// JSON-file backed session store.
///
/// The file lives at `<namespace dir>/session.json` and holds the `email`,
/// `name` and `token` keys.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub const FILENAME: &'static str = "session.json";

    /// Store rooted at an explicit namespace directory.
    #[must_use]
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(Self::FILENAME),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> SessionError {
        SessionError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl SessionStore for FileSessionStore {
    fn save(&self, session: &Session) -> Result<(), SessionError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }
        let bytes = serde_json::to_vec_pretty(session).map_err(|source| SessionError::Corrupt {
            path: self.path.clone(),
            source,
        })?;
        write_owner_only(&self.path, &bytes).map_err(|e| self.io_error(e))?;
        tracing::debug!(path = %self.path.display(), "Session saved");
        Ok(())
    }

    fn load(&self) -> Result<Session, SessionError> {
        recover_bak_file(&self.path);
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Session::default()),
            Err(e) => return Err(self.io_error(e)),
        };
        serde_json::from_slice(&bytes).map_err(|source| SessionError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    /// Removes the session file and any `.bak` left by an interrupted write,
    /// so a later `load` cannot resurrect the cleared session.
    fn clear(&self) -> Result<(), SessionError> {
        for path in [self.path.with_extension("bak"), self.path.clone()] {
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(source) => return Err(SessionError::Io { path, source }),
            }
        }
        tracing::debug!(path = %self.path.display(), "Session cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storyfeed_types::AuthToken;

    #[test]
    fn missing_file_loads_unauthenticated() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileSessionStore::in_dir(dir.path());
        assert_eq!(store.load().unwrap(), Session::default());
    }

    #[test]
    fn save_load_clear() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileSessionStore::in_dir(dir.path().join("nested"));
        let session =
            Session::authenticated("a@b.co", "Ann", AuthToken::new("tok-123").unwrap());

        store.save(&session).unwrap();
        assert!(store.path().exists());
        assert_eq!(store.load().unwrap(), session);

        store.clear().unwrap();
        assert!(!store.path().exists());
        assert!(!store.load().unwrap().is_authenticated());
        // Clearing twice is fine.
        store.clear().unwrap();
    }

    #[test]
    fn file_uses_flat_keys() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileSessionStore::in_dir(dir.path());
        store
            .save(&Session::authenticated(
                "a@b.co",
                "Ann",
                AuthToken::new("tok").unwrap(),
            ))
            .unwrap();

        let raw: serde_json::Value =
            serde_json::from_slice(&fs::read(store.path()).unwrap()).unwrap();
        assert_eq!(raw["email"], "a@b.co");
        assert_eq!(raw["name"], "Ann");
        assert_eq!(raw["token"], "tok");
    }

    #[test]
    fn blank_stored_token_loads_unauthenticated() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileSessionStore::in_dir(dir.path());
        fs::write(
            store.path(),
            br#"{"email":"a@b.co","name":"Ann","token":"  "}"#,
        )
        .unwrap();

        let session = store.load().unwrap();
        assert_eq!(session.email, "a@b.co");
        assert!(!session.is_authenticated());
        assert_eq!(store.token().unwrap(), None);
    }

    #[test]
    fn clear_removes_leftover_backup() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileSessionStore::in_dir(dir.path());
        let session = Session::authenticated("a@b.co", "Ann", AuthToken::new("tok").unwrap());
        store.save(&session).unwrap();
        // Backup left behind by an interrupted overwrite.
        let backup = store.path().with_extension("bak");
        fs::copy(store.path(), &backup).unwrap();

        store.clear().unwrap();

        assert!(!backup.exists());
        assert!(!store.path().exists());
        assert!(!store.load().unwrap().is_authenticated());
    }

    #[test]
    fn corrupt_file_is_reported() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileSessionStore::in_dir(dir.path());
        fs::write(store.path(), b"{not json").unwrap();
        assert!(matches!(store.load(), Err(SessionError::Corrupt { .. })));
    }
}
