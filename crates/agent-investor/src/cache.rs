//! Disk-backed cache for the built investor directory
//!
//! One SQLite database under the OS temp directory, shared by every run.
//! Writers use `INSERT OR REPLACE` (last writer wins) with WAL journaling and
//! a busy timeout; expiry is checked when reading, nothing is swept.

use crate::error::{InvestorError, Result};
use crate::models::InvestorDirectory;
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, warn};

/// Key the directory is stored under
pub const DIRECTORY_KEY: &str = "structured_data";

const CACHE_TABLE_DDL: &str = "CREATE TABLE IF NOT EXISTS cache_entries (
    key TEXT PRIMARY KEY NOT NULL,
    value_json TEXT NOT NULL,
    expires_at INTEGER NOT NULL,
    updated_at TEXT NOT NULL
);";

/// Time-expiring store for the last built [`InvestorDirectory`]
pub struct DirectoryCache {
    conn: Mutex<Connection>,
}

impl DirectoryCache {
    /// Open (creating if needed) the cache database at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch(CACHE_TABLE_DDL)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        debug!(path = %path.display(), "Opened directory cache");

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory cache for testing
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(CACHE_TABLE_DDL)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// The cached directory, if present and not expired
    ///
    /// A stored value that no longer parses is logged and treated as absent.
    pub fn get(&self) -> Result<Option<InvestorDirectory>> {
        let now = Utc::now().timestamp_millis();
        let value: Option<String> = self
            .conn
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .query_row(
                "SELECT value_json FROM cache_entries WHERE key = ?1 AND expires_at > ?2",
                params![DIRECTORY_KEY, now],
                |row| row.get(0),
            )
            .optional()?;

        let Some(value) = value else {
            debug!("Directory cache miss");
            return Ok(None);
        };

        match serde_json::from_str(&value) {
            Ok(directory) => {
                debug!("Directory cache hit");
                Ok(Some(directory))
            }
            Err(e) => {
                warn!(error = %e, "Ignoring unreadable cached directory");
                Ok(None)
            }
        }
    }

    /// Store `directory`, replacing any entry and resetting its expiry
    pub fn put(&self, directory: &InvestorDirectory, ttl: Duration) -> Result<()> {
        let value = serde_json::to_string(directory)?;
        let now = Utc::now();
        let ttl_ms = i64::try_from(ttl.as_millis())
            .map_err(|_| InvestorError::Cache(format!("TTL {ttl:?} is too large")))?;

        self.conn
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .execute(
                "INSERT OR REPLACE INTO cache_entries (key, value_json, expires_at, updated_at) \
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    DIRECTORY_KEY,
                    value,
                    now.timestamp_millis().saturating_add(ttl_ms),
                    now.to_rfc3339(),
                ],
            )?;
        debug!(ttl_secs = ttl.as_secs(), "Stored directory in cache");
        Ok(())
    }

    #[cfg(test)]
    fn put_raw(&self, value: &str, ttl: Duration) {
        let expires = Utc::now().timestamp_millis() + i64::try_from(ttl.as_millis()).unwrap();
        self.conn
            .lock()
            .unwrap()
            .execute(
                "INSERT OR REPLACE INTO cache_entries (key, value_json, expires_at, updated_at) \
                 VALUES (?1, ?2, ?3, '')",
                params![DIRECTORY_KEY, value, expires],
            )
            .unwrap();
    }
}
