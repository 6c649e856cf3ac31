use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use rusqlite::Connection;
use tracing::info;

use herd_core::{Error, MemoryEntry, Result};

use crate::store::MemoryStore;

/// SQLite-backed memory store.
///
/// A single `agent_memory` table holds every namespace; the composite
/// primary key keeps one row per `(namespace, key)`.
pub struct SqliteStore {
    db: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open or create the memory database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!(?path, "opening sqlite memory store");

        let conn = Connection::open(path).map_err(|e| Error::Memory(e.to_string()))?;

        // Enable WAL mode for concurrent reads
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")
            .map_err(|e| Error::Memory(e.to_string()))?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS agent_memory (
                namespace TEXT NOT NULL,
                key TEXT NOT NULL,
                value TEXT NOT NULL,
                metadata TEXT,
                created_at TEXT NOT NULL,
                expires_at INTEGER,
                PRIMARY KEY (namespace, key)
            );

            CREATE INDEX IF NOT EXISTS idx_agent_memory_expiry
                ON agent_memory(expires_at) WHERE expires_at IS NOT NULL;
            ",
        )
        .map_err(|e| Error::Memory(e.to_string()))?;

        Ok(Self {
            db: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory database (for tests).
    pub fn open_in_memory() -> Result<Self> {
        Self::open(":memory:")
    }

    /// Delete rows whose expiry has passed. Returns the number purged.
    fn purge_expired(&self) -> Result<usize> {
        let db = self.db.lock();
        db.execute(
            "DELETE FROM agent_memory WHERE expires_at IS NOT NULL AND expires_at <= ?1",
            rusqlite::params![Utc::now().timestamp()],
        )
        .map_err(|e| Error::Memory(e.to_string()))
    }
}

fn row_to_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<(String, Option<String>, String, Option<i64>)> {
    Ok((
        row.get::<_, String>(0)?,
        row.get::<_, Option<String>>(1)?,
        row.get::<_, String>(2)?,
        row.get::<_, Option<i64>>(3)?,
    ))
}

fn decode_entry(
    value: String,
    metadata: Option<String>,
    created_at: String,
    expires_at: Option<i64>,
) -> Result<MemoryEntry> {
    Ok(MemoryEntry {
        value: serde_json::from_str(&value)?,
        metadata: metadata.as_deref().map(serde_json::from_str).transpose()?,
        created_at: created_at
            .parse::<DateTime<Utc>>()
            .map_err(|e| Error::Memory(format!("bad created_at: {e}")))?,
        expires_at: expires_at.and_then(|ts| Utc.timestamp_opt(ts, 0).single()),
    })
}

#[async_trait]
impl MemoryStore for SqliteStore {
    fn backend(&self) -> &'static str {
        "sqlite"
    }

    async fn set(&self, namespace: &str, key: &str, entry: MemoryEntry) -> Result<()> {
        let value = serde_json::to_string(&entry.value)?;
        let metadata = entry
            .metadata
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let db = self.db.lock();
        db.execute(
            "INSERT INTO agent_memory (namespace, key, value, metadata, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(namespace, key) DO UPDATE SET
                value = excluded.value,
                metadata = excluded.metadata,
                created_at = excluded.created_at,
                expires_at = excluded.expires_at",
            rusqlite::params![
                namespace,
                key,
                value,
                metadata,
                entry.created_at.to_rfc3339(),
                entry.expires_at.map(|at| at.timestamp()),
            ],
        )
        .map_err(|e| Error::Memory(e.to_string()))?;
        Ok(())
    }

    async fn get(&self, namespace: &str, key: &str) -> Result<Option<MemoryEntry>> {
        let row = {
            let db = self.db.lock();
            let mut stmt = db
                .prepare(
                    "SELECT value, metadata, created_at, expires_at FROM agent_memory
                     WHERE namespace = ?1 AND key = ?2",
                )
                .map_err(|e| Error::Memory(e.to_string()))?;
            stmt.query_row(rusqlite::params![namespace, key], row_to_entry)
                .map(Some)
                .or_else(|e| match e {
                    rusqlite::Error::QueryReturnedNoRows => Ok(None),
                    other => Err(Error::Memory(other.to_string())),
                })?
        };

        let Some((value, metadata, created_at, expires_at)) = row else {
            return Ok(None);
        };
        let entry = decode_entry(value, metadata, created_at, expires_at)?;
        if entry.is_expired() {
            self.purge_expired()?;
            return Ok(None);
        }
        Ok(Some(entry))
    }

    async fn delete(&self, namespace: &str, key: &str) -> Result<bool> {
        self.purge_expired()?;
        let db = self.db.lock();
        let rows = db
            .execute(
                "DELETE FROM agent_memory WHERE namespace = ?1 AND key = ?2",
                rusqlite::params![namespace, key],
            )
            .map_err(|e| Error::Memory(e.to_string()))?;
        Ok(rows > 0)
    }

    async fn keys(&self, namespace: &str) -> Result<Vec<String>> {
        self.purge_expired()?;
        let db = self.db.lock();
        let mut stmt = db
            .prepare("SELECT key FROM agent_memory WHERE namespace = ?1 ORDER BY key")
            .map_err(|e| Error::Memory(e.to_string()))?;
        let keys = stmt
            .query_map(rusqlite::params![namespace], |row| row.get::<_, String>(0))
            .map_err(|e| Error::Memory(e.to_string()))?
            .filter_map(|r| r.ok())
            .collect();
        Ok(keys)
    }

    async fn clear(&self, namespace: &str) -> Result<usize> {
        let db = self.db.lock();
        db.execute(
            "DELETE FROM agent_memory WHERE namespace = ?1",
            rusqlite::params![namespace],
        )
        .map_err(|e| Error::Memory(e.to_string()))
    }
}
