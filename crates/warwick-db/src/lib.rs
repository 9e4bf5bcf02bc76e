pub mod migrations;
pub mod models;
pub mod queries;

pub use models::{Column, FieldValue, SqlType};
pub use warwick_types::models::{
    AuthenticationBundle, DEFAULT_REACTION_OBSERVING_TIMEOUT_SECS, ServerConfig,
};

use anyhow::{Result, anyhow};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{info, warn};

/// Per-server configuration store on top of a single SQLite connection.
///
/// The connection is released exactly once: by [`ConfigStore::close`], or by
/// `Drop` if `close` was never reached. Calls made after `close` fail with an
/// error instead of reopening anything.
pub struct ConfigStore {
    path: PathBuf,
    conn: Mutex<Option<Connection>>,
}

impl ConfigStore {
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!("Requested database '{}' doesn't exist, creating...", path.display());
        }

        let conn = Connection::open(path)?;

        // WAL mode for concurrent reads
        conn.pragma_update(None, "journal_mode", "WAL")?;

        migrations::run(&conn)?;

        info!("Config store opened at {}", path.display());
        Ok(Self {
            path: path.to_path_buf(),
            conn: Mutex::new(Some(conn)),
        })
    }

    /// Store that lives only as long as this value. Nothing touches disk.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        migrations::run(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn: Mutex::new(Some(conn)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_closed(&self) -> bool {
        self.conn.lock().map(|conn| conn.is_none()).unwrap_or(true)
    }

    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let guard = self
            .conn
            .lock()
            .map_err(|e| anyhow!("DB lock poisoned: {}", e))?;
        let conn = guard
            .as_ref()
            .ok_or_else(|| anyhow!("Config store at {} is closed", self.path.display()))?;
        f(conn)
    }

    /// Release the underlying connection. Closing an already closed store is a no-op.
    ///
    /// If SQLite refuses to close, the connection is kept so the store stays usable
    /// and the error is returned.
    pub fn close(&self) -> Result<()> {
        let mut guard = self
            .conn
            .lock()
            .map_err(|e| anyhow!("DB lock poisoned: {}", e))?;

        let Some(conn) = guard.take() else {
            return Ok(());
        };

        match conn.close() {
            Ok(()) => {
                info!("Config store at {} closed", self.path.display());
                Ok(())
            }
            Err((conn, e)) => {
                *guard = Some(conn);
                Err(anyhow!("Failed to close config store at {}: {}", self.path.display(), e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tracing_test::traced_test;

    fn temp_store() -> (TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("warwick.db");
        (dir, path)
    }

    #[test]
    fn open_creates_missing_file() {
        let (_dir, path) = temp_store();
        assert!(!path.exists());

        let store = ConfigStore::open(&path).unwrap();
        assert!(path.exists());
        assert_eq!(store.path(), path.as_path());
    }

    #[test]
    #[traced_test]
    fn warns_when_creating_a_new_file() {
        let (_dir, path) = temp_store();

        ConfigStore::open(&path).unwrap();
        assert!(logs_contain("doesn't exist, creating"));
    }

    #[test]
    fn original_schema_keeps_credentials_after_open() {
        let (_dir, path) = temp_store();
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch(
                "
                CREATE TABLE server_configs (
                    id TEXT PRIMARY KEY,
                    trigger_emoji TEXT,
                    emoji_reaction_threshhold INTEGER,
                    x_bearer_token TEXT,
                    x_api_key TEXT,
                    x_api_key_secret TEXT,
                    x_access_token TEXT,
                    x_access_token_secret TEXT
                );
                INSERT INTO server_configs VALUES
                    ('guild-2', '🔥', 3, 'bearer', 'key', 'key-secret', 'token', 'token-secret');
                ",
            )
            .unwrap();
        }

        let store = ConfigStore::open(&path).unwrap();
        assert_eq!(store.get_emoji_reaction_threshold("guild-2").unwrap(), Some(3));
        let bundle = store.get_authentication_bundle("guild-2").unwrap().unwrap();
        assert_eq!(bundle.api_key, "key");
        assert_eq!(bundle.access_token_secret, "token-secret");
    }

    #[test]
    fn close_twice_is_noop() {
        let store = ConfigStore::open_in_memory().unwrap();
        assert!(!store.is_closed());

        store.close().unwrap();
        assert!(store.is_closed());
        store.close().unwrap();
        assert!(store.is_closed());
    }

    #[test]
    fn operations_after_close_fail() {
        let store = ConfigStore::open_in_memory().unwrap();
        store.close().unwrap();

        let err = store.get_trigger_emoji("guild-1").unwrap_err();
        assert!(err.to_string().contains("closed"));
        assert!(store.set_trigger_emoji("guild-1", "🔥").is_err());
    }

    #[test]
    fn reopen_preserves_rows() {
        let (_dir, path) = temp_store();

        {
            let store = ConfigStore::open(&path).unwrap();
            store.set_trigger_emoji("guild-1", "🔥").unwrap();
            store.set_emoji_reaction_threshold("guild-1", 3).unwrap();
            store.set_reaction_observing_timeout_secs("guild-1", 120).unwrap();
            store.set_api_key("guild-2", "key").unwrap();
            store.close().unwrap();
        }

        let store = ConfigStore::open(&path).unwrap();
        assert_eq!(store.get_trigger_emoji("guild-1").unwrap().as_deref(), Some("🔥"));
        assert_eq!(store.get_emoji_reaction_threshold("guild-1").unwrap(), Some(3));
        assert_eq!(store.get_reaction_observing_timeout_secs("guild-1").unwrap(), 120);
        assert_eq!(
            store.get_field("guild-2", Column::ApiKey).unwrap(),
            Some(FieldValue::Text("key".into()))
        );
    }

    #[test]
    fn drop_without_close_releases_connection() {
        let (_dir, path) = temp_store();

        {
            let store = ConfigStore::open(&path).unwrap();
            store.set_trigger_emoji("guild-1", "👀").unwrap();
        }

        let store = ConfigStore::open(&path).unwrap();
        assert_eq!(store.get_trigger_emoji("guild-1").unwrap().as_deref(), Some("👀"));
    }
}
