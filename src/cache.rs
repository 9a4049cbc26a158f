//! Persistent source cache: fetch key (usually a URL) to response body

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

#[cfg(test)]
use mockall::automock;
use rusqlite::{Connection, OptionalExtension};
use tracing::{debug, info};

use crate::error::CacheError;

/// Key-value store for previously retrieved upstream responses
#[cfg_attr(test, automock)]
pub trait SourceCache: Send + Sync {
    /// Get the cached body for a key
    fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Store a body, overwriting any previous entry for the key
    fn put(&self, key: &str, body: &str) -> Result<(), CacheError>;
}

/// Schema migrations
/// Each version contains a list of SQL statements to execute
const MIGRATIONS: &[&[&str]] = &[
    // v1: sources table
    &[r#"
        CREATE TABLE IF NOT EXISTS sources (
            key TEXT PRIMARY KEY NOT NULL,
            body TEXT NOT NULL,
            updated_at INTEGER NOT NULL
        )
        "#],
];

/// SQLite-backed source cache
pub struct SqliteCache {
    conn: Mutex<Connection>,
}

impl SqliteCache {
    pub fn new(db_path: &Path) -> Result<Self, CacheError> {
        info!("Initializing source cache at {:?}", db_path);

        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| CacheError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let conn = Connection::open(db_path)?;

        // Enable WAL mode for better concurrency
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;

        Self::apply_migrations(&conn)?;
        debug!("Source cache ready");

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Acquire database connection lock with proper error handling
    fn lock_conn(&self) -> Result<MutexGuard<'_, Connection>, CacheError> {
        self.conn.lock().map_err(|_| CacheError::LockPoisoned)
    }

    /// Apply pending migrations based on user_version pragma
    fn apply_migrations(conn: &Connection) -> Result<(), CacheError> {
        let current_version: i32 =
            conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

        for (i, statements) in MIGRATIONS.iter().enumerate() {
            let version = (i + 1) as i32;
            if version > current_version {
                for sql in *statements {
                    conn.execute(sql, [])?;
                }
                debug!("Applied migration v{}", version);
            }
        }

        let target_version = MIGRATIONS.len() as i32;
        if target_version > current_version {
            conn.pragma_update(None, "user_version", target_version)?;
        }

        Ok(())
    }
}

impl SourceCache for SqliteCache {
    fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let conn = self.lock_conn()?;
        let body = conn
            .query_row("SELECT body FROM sources WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(body)
    }

    fn put(&self, key: &str, body: &str) -> Result<(), CacheError> {
        let now = chrono::Utc::now().timestamp_millis();
        let conn = self.lock_conn()?;
        conn.execute(
            r#"
            INSERT INTO sources (key, body, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET body = excluded.body, updated_at = excluded.updated_at
            "#,
            (key, body, now),
        )?;
        debug!("Cached {} bytes for {}", body.len(), key);
        Ok(())
    }
}

/// In-memory source cache, used when persistence is not wanted
#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SourceCache for MemoryCache {
    fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let entries = self.entries.lock().map_err(|_| CacheError::LockPoisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn put(&self, key: &str, body: &str) -> Result<(), CacheError> {
        let mut entries = self.entries.lock().map_err(|_| CacheError::LockPoisoned)?;
        entries.insert(key.to_string(), body.to_string());
        Ok(())
    }
}
