//! Persisted login session.
//!
//! The profile is stored as JSON under one key of a key/value `config` table,
//! so it survives restarts. A stored profile that no longer parses is dropped
//! and the user is treated as logged out.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::{params, Connection};

use crate::error::ClientError;
use crate::models::UserProfile;

const PROFILE_KEY: &str = "user_profile";

pub trait SessionStore: Send {
    /// `Err(ClientError::Json)` means something is stored but it is not a profile.
    fn load(&self) -> Result<Option<UserProfile>, ClientError>;
    fn save(&self, profile: &UserProfile) -> Result<(), ClientError>;
    fn clear(&self) -> Result<(), ClientError>;
}

pub struct SqliteSessionStore {
    conn: Connection,
}

impl SqliteSessionStore {
    /// Opens (or creates) `campus_connect.db` inside `dir`.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, ClientError> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        let db_path = dir.join("campus_connect.db");
        log::debug!("Opening session store at {:?}", db_path);
        Self::with_connection(Connection::open(db_path)?)
    }

    pub fn open_in_memory() -> Result<Self, ClientError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, ClientError> {
        conn.execute_batch("CREATE TABLE IF NOT EXISTS config (key TEXT PRIMARY KEY, value TEXT);")?;
        Ok(Self { conn })
    }

    fn config_get(&self, key: &str) -> Result<Option<String>, ClientError> {
        let mut stmt = self.conn.prepare("SELECT value FROM config WHERE key = ?1")?;
        let mut rows = stmt.query(params![key])?;
        if let Some(row) = rows.next()? {
            return Ok(row.get(0)?);
        }
        Ok(None)
    }

    pub(crate) fn config_set(&self, key: &str, value: &str) -> Result<(), ClientError> {
        self.conn.execute(
            "INSERT INTO config (key, value) VALUES (?1, ?2) ON CONFLICT(key) DO UPDATE SET value = ?2",
            params![key, value],
        )?;
        Ok(())
    }
}

impl SessionStore for SqliteSessionStore {
    fn load(&self) -> Result<Option<UserProfile>, ClientError> {
        match self.config_get(PROFILE_KEY)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    fn save(&self, profile: &UserProfile) -> Result<(), ClientError> {
        self.config_set(PROFILE_KEY, &serde_json::to_string(profile)?)
    }

    fn clear(&self) -> Result<(), ClientError> {
        self.conn
            .execute("DELETE FROM config WHERE key = ?1", params![PROFILE_KEY])?;
        Ok(())
    }
}

/// Keeps the serialized profile in memory. Nothing survives the process.
#[derive(Default)]
pub struct MemorySessionStore {
    raw: Mutex<Option<String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with arbitrary stored text.
    pub fn with_raw(raw: impl Into<String>) -> Self {
        Self {
            raw: Mutex::new(Some(raw.into())),
        }
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        self.raw.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<Option<UserProfile>, ClientError> {
        match self.slot().as_deref() {
            Some(raw) => Ok(Some(serde_json::from_str(raw)?)),
            None => Ok(None),
        }
    }

    fn save(&self, profile: &UserProfile) -> Result<(), ClientError> {
        *self.slot() = Some(serde_json::to_string(profile)?);
        Ok(())
    }

    fn clear(&self) -> Result<(), ClientError> {
        *self.slot() = None;
        Ok(())
    }
}

pub struct Session<S: SessionStore> {
    store: S,
    user: Option<UserProfile>,
}

impl<S: SessionStore> Session<S> {
    /// Loads whatever profile the store holds.
    pub fn restore(store: S) -> Result<Self, ClientError> {
        let user = match store.load() {
            Ok(user) => user,
            Err(ClientError::Json(e)) => {
                log::warn!("Stored user profile is unreadable, clearing it: {}", e);
                store.clear()?;
                None
            }
            Err(e) => return Err(e),
        };
        Ok(Self { store, user })
    }

    pub fn login(&mut self, profile: UserProfile) -> Result<(), ClientError> {
        self.store.save(&profile)?;
        log::info!("Signed in as {}", profile.email);
        self.user = Some(profile);
        Ok(())
    }

    pub fn logout(&mut self) -> Result<(), ClientError> {
        self.store.clear()?;
        self.user = None;
        Ok(())
    }

    pub fn user(&self) -> Option<&UserProfile> {
        self.user.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;

    fn ada() -> UserProfile {
        UserProfile {
            name: "Ada Lovelace".into(),
            email: "ada@uni.edu".into(),
            year: Some("2024".into()),
            major: Some("Mathematics".into()),
            role: Role::Student,
        }
    }

    #[test]
    fn fresh_store_means_logged_out() {
        let session = Session::restore(MemorySessionStore::new()).unwrap();
        assert!(!session.is_authenticated());
        assert!(session.user().is_none());
    }

    #[test]
    fn login_then_logout() {
        let mut session = Session::restore(MemorySessionStore::new()).unwrap();
        session.login(ada()).unwrap();
        assert_eq!(session.user(), Some(&ada()));
        assert_eq!(session.store().load().unwrap(), Some(ada()));

        session.logout().unwrap();
        assert!(!session.is_authenticated());
        assert_eq!(session.store().load().unwrap(), None);
    }

    #[test]
    fn corrupt_profile_is_dropped() {
        let session = Session::restore(MemorySessionStore::with_raw("{not json")).unwrap();
        assert!(!session.is_authenticated());
        assert_eq!(session.store().load().unwrap(), None);
    }

    #[test]
    fn sqlite_corrupt_profile_is_dropped() {
        let store = SqliteSessionStore::open_in_memory().unwrap();
        store.config_set(PROFILE_KEY, "42").unwrap();
        let session = Session::restore(store).unwrap();
        assert!(!session.is_authenticated());
        assert_eq!(session.store().load().unwrap(), None);
    }
}
