//! Durable key-value substrate.
//!
//! Values are JSON documents addressed by string keys. Two backends:
//! - [`SqliteKv`]: a single `kv` table in a local SQLite file
//! - [`MemoryKv`]: an in-process map for tests and throwaway runs

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Failures of the backing store itself.
#[derive(Debug, Error)]
pub enum KvError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Get/set of JSON values by key.
pub trait KeyValueStore: Send + Sync {
    /// Read the raw value stored under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<Value>, KvError>;

    /// Replace the value stored under `key`.
    fn set(&self, key: &str, value: &Value) -> Result<(), KvError>;
}

/// Read a typed value, falling back to `default` when the key is missing or
/// its content no longer decodes.
pub fn get_or<T: DeserializeOwned>(
    kv: &dyn KeyValueStore,
    key: &str,
    default: T,
) -> Result<T, KvError> {
    let Some(raw) = kv.get(key)? else {
        return Ok(default);
    };
    match serde_json::from_value(raw) {
        Ok(value) => Ok(value),
        Err(e) => {
            tracing::warn!(key, "Discarding undecodable stored value: {e}");
            Ok(default)
        }
    }
}

// ── SQLite backend ──────────────────────────────────────────────

/// SQLite-backed key-value store.
pub struct SqliteKv {
    conn: Mutex<rusqlite::Connection>,
}

impl SqliteKv {
    /// Open (or create) the database at the given path.
    pub fn open(db_path: &Path) -> Result<Self, KvError> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = rusqlite::Connection::open(db_path)?;

        // WAL mode for crash safety
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            );",
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Number of stored keys.
    pub fn key_count(&self) -> Result<u64, KvError> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM kv", [], |row| row.get(0))?;
        Ok(u64::try_from(count).unwrap_or_default())
    }
}

impl KeyValueStore for SqliteKv {
    fn get(&self, key: &str) -> Result<Option<Value>, KvError> {
        let conn = self.conn.lock();
        let row: Result<String, _> = conn.query_row(
            "SELECT value FROM kv WHERE key = ?1",
            rusqlite::params![key],
            |row| row.get(0),
        );

        match row {
            Ok(text) => match serde_json::from_str(&text) {
                Ok(value) => Ok(Some(value)),
                Err(e) => {
                    tracing::warn!(key, "Stored value is not valid JSON: {e}");
                    Ok(None)
                }
            },
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &Value) -> Result<(), KvError> {
        let text = serde_json::to_string(value)?;
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at",
            rusqlite::params![key, text, epoch_secs()],
        )?;
        tracing::debug!(key, bytes = text.len(), "Persisted key");
        Ok(())
    }
}

// ── In-memory backend ───────────────────────────────────────────

/// In-process key-value store.
#[derive(Default)]
pub struct MemoryKv {
    entries: Mutex<HashMap<String, Value>>,
    fail_writes: AtomicBool,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `set` fail (or succeed again).
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Store a raw value, bypassing write-failure injection.
    pub fn insert_raw(&self, key: &str, value: Value) {
        self.entries.lock().insert(key.to_string(), value);
    }
}

impl KeyValueStore for MemoryKv {
    fn get(&self, key: &str) -> Result<Option<Value>, KvError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &Value) -> Result<(), KvError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(KvError::Unavailable(format!("write to '{key}' rejected")));
        }
        self.entries.lock().insert(key.to_string(), value.clone());
        Ok(())
    }
}

/// Current Unix epoch in seconds.
fn epoch_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
        .unwrap_or_default()
}
