use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::ConsoleResult;
use crate::session::token::Session;

/// File name of the serialized session document
const SESSION_FILE: &str = "arena_session.json";
/// File name of the redundant raw refresh token copy
const REFRESH_TOKEN_FILE: &str = "arena_refresh_token";

/// Durable client-side session storage.
///
/// Two files live under the data directory: the serialized session and a
/// raw copy of the refresh token, kept redundantly so a refresh can still
/// be attempted after the session document is lost or corrupted. Every
/// write is a full replace; nothing here ever patches a stored record.
///
/// The store is a cache of server-issued state. Unreadable contents are
/// treated as absent and cleared rather than surfaced as errors.
pub struct SessionStore {
    data_dir: PathBuf,
}

impl SessionStore {
    /// Create a store rooted at the given data directory
    pub fn new(data_dir: impl AsRef<Path>) -> ConsoleResult<Self> {
        let data_dir = data_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&data_dir)?;
        Ok(Self { data_dir })
    }

    fn session_path(&self) -> PathBuf {
        self.data_dir.join(SESSION_FILE)
    }

    fn refresh_token_path(&self) -> PathBuf {
        self.data_dir.join(REFRESH_TOKEN_FILE)
    }

    /// Persist a session, replacing any previous one wholesale
    pub fn save(&self, session: &Session) -> ConsoleResult<()> {
        let session_json = serde_json::to_string(session)?;
        std::fs::write(self.session_path(), session_json)?;
        std::fs::write(self.refresh_token_path(), &session.refresh_token)?;
        debug!("Session persisted");
        Ok(())
    }

    /// Load the persisted session, if a readable one exists
    pub fn load(&self) -> Option<Session> {
        let path = self.session_path();
        if !path.exists() {
            return None;
        }

        let session_json = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) => {
                warn!(error = %e, "Failed to read persisted session");
                return None;
            }
        };

        match serde_json::from_str::<Session>(&session_json) {
            Ok(session) => Some(session),
            Err(e) => {
                // Corrupt cache; drop it and fall back to the refresh token
                warn!(error = %e, "Persisted session is unreadable, discarding");
                let _ = std::fs::remove_file(&path);
                None
            }
        }
    }

    /// Read the redundantly stored refresh token
    pub fn refresh_token(&self) -> Option<String> {
        let path = self.refresh_token_path();
        if !path.exists() {
            return None;
        }

        std::fs::read_to_string(&path)
            .ok()
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty())
    }

    /// Remove all persisted session state
    pub fn clear(&self) {
        for path in [self.session_path(), self.refresh_token_path()] {
            if path.exists() {
                if let Err(e) = std::fs::remove_file(&path) {
                    warn!(error = %e, path = %path.display(), "Failed to remove stored file");
                }
            }
        }
        debug!("Persisted session cleared");
    }

    /// Whether a persisted session document exists on disk
    pub fn has_session(&self) -> bool {
        self.session_path().exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::token::test_tokens::token_expiring_in;
    use crate::session::token::{decode_expiry, Session};
    use crate::users::model::{Gender, User, UserStatus};
    use chrono::Utc;

    fn sample_session() -> Session {
        let access_token = token_expiring_in(3600);
        Session {
            expires_at: decode_expiry(&access_token).unwrap(),
            access_token,
            refresh_token: "refresh-1".to_string(),
            user: User {
                id: "u-1".to_string(),
                national_id: "1234567890".to_string(),
                phone_number: "+15550100".to_string(),
                email: None,
                first_name: "Dana".to_string(),
                last_name: "Reyes".to_string(),
                profile_image_url: None,
                birth_date: None,
                address: None,
                adult: true,
                gender: Gender::Female,
                status: UserStatus::Active,
                email_verified: false,
                phone_verified: true,
                metadata: serde_json::json!({}),
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            permissions: None,
        }
    }

    #[test]
    fn round_trips_a_session() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path()).unwrap();

        assert!(store.load().is_none());
        assert!(store.refresh_token().is_none());

        let session = sample_session();
        store.save(&session).unwrap();

        let loaded = store.load().expect("session should round-trip");
        assert_eq!(loaded.access_token, session.access_token);
        assert_eq!(loaded.user.id, "u-1");
        assert_eq!(loaded.expires_at, session.expires_at);
        assert_eq!(store.refresh_token().as_deref(), Some("refresh-1"));
    }

    #[test]
    fn clear_removes_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path()).unwrap();

        store.save(&sample_session()).unwrap();
        store.clear();

        assert!(!store.has_session());
        assert!(store.load().is_none());
        assert!(store.refresh_token().is_none());
    }

    #[test]
    fn corrupt_session_is_discarded_but_refresh_token_survives() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path()).unwrap();

        store.save(&sample_session()).unwrap();
        std::fs::write(dir.path().join(SESSION_FILE), "{not json").unwrap();

        assert!(store.load().is_none());
        assert!(!store.has_session());
        assert_eq!(store.refresh_token().as_deref(), Some("refresh-1"));
    }

    #[test]
    fn save_replaces_wholesale() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path()).unwrap();

        store.save(&sample_session()).unwrap();

        let mut replacement = sample_session();
        replacement.refresh_token = "refresh-2".to_string();
        store.save(&replacement).unwrap();

        assert_eq!(store.refresh_token().as_deref(), Some("refresh-2"));
        assert_eq!(store.load().unwrap().refresh_token, "refresh-2");
    }
}
