use async_trait::async_trait;
use redis::aio::ConnectionManager;
use tracing::info;

use herd_core::{Error, MemoryEntry, Result};

use crate::store::MemoryStore;

const KEY_PREFIX: &str = "herd";

/// Redis-backed memory store.
///
/// Each entry is one JSON-serialized value under `herd:{namespace}:{key}`.
/// Entry TTLs map to native Redis expiry, so the server evicts on its own;
/// the stored `expires_at` is kept as well so reads stay consistent with
/// the other backends.
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    /// Connect to a Redis server, e.g. `redis://127.0.0.1:6379/0`.
    pub async fn connect(url: &str) -> Result<Self> {
        info!(url, "connecting redis memory store");
        let client = redis::Client::open(url)
            .map_err(|e| Error::MemoryBackend {
                backend: "redis".into(),
                reason: e.to_string(),
            })?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| Error::MemoryBackend {
                backend: "redis".into(),
                reason: e.to_string(),
            })?;
        Ok(Self { conn })
    }

    fn storage_key(namespace: &str, key: &str) -> String {
        format!("{KEY_PREFIX}:{namespace}:{key}")
    }

    fn scan_pattern(namespace: &str) -> String {
        format!("{KEY_PREFIX}:{namespace}:*")
    }

    /// Collect all storage keys in a namespace via cursor-based SCAN.
    async fn scan_namespace(&self, namespace: &str) -> Result<Vec<String>> {
        let mut conn = self.conn.clone();
        let pattern = Self::scan_pattern(namespace);
        let mut cursor: u64 = 0;
        let mut found = Vec::new();
        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(100)
                .query_async(&mut conn)
                .await
                .map_err(|e| Error::Memory(e.to_string()))?;
            found.extend(batch);
            cursor = next;
            if cursor == 0 {
                break;
            }
        }
        Ok(found)
    }
}

#[async_trait]
impl MemoryStore for RedisStore {
    fn backend(&self) -> &'static str {
        "redis"
    }

    async fn set(&self, namespace: &str, key: &str, entry: MemoryEntry) -> Result<()> {
        let mut conn = self.conn.clone();
        let storage_key = Self::storage_key(namespace, key);
        let payload = serde_json::to_string(&entry)?;

        let mut cmd = redis::cmd("SET");
        cmd.arg(&storage_key).arg(payload);
        if let Some(ttl) = entry.ttl_secs() {
            cmd.arg("EX").arg(ttl);
        } else if entry.is_expired() {
            // Already past its expiry; don't store anything live
            redis::cmd("DEL")
                .arg(&storage_key)
                .query_async::<_, ()>(&mut conn)
                .await
                .map_err(|e| Error::Memory(e.to_string()))?;
            return Ok(());
        }
        cmd.query_async::<_, ()>(&mut conn)
            .await
            .map_err(|e| Error::Memory(e.to_string()))
    }

    async fn get(&self, namespace: &str, key: &str) -> Result<Option<MemoryEntry>> {
        let mut conn = self.conn.clone();
        let payload: Option<String> = redis::cmd("GET")
            .arg(Self::storage_key(namespace, key))
            .query_async(&mut conn)
            .await
            .map_err(|e| Error::Memory(e.to_string()))?;
        let Some(payload) = payload else {
            return Ok(None);
        };
        let entry: MemoryEntry = serde_json::from_str(&payload)?;
        // Server-side TTL usually handles this; guard against clock skew
        if entry.is_expired() {
            return Ok(None);
        }
        Ok(Some(entry))
    }

    async fn delete(&self, namespace: &str, key: &str) -> Result<bool> {
        let mut conn = self.conn.clone();
        let removed: u64 = redis::cmd("DEL")
            .arg(Self::storage_key(namespace, key))
            .query_async(&mut conn)
            .await
            .map_err(|e| Error::Memory(e.to_string()))?;
        Ok(removed > 0)
    }

    async fn keys(&self, namespace: &str) -> Result<Vec<String>> {
        let prefix = format!("{KEY_PREFIX}:{namespace}:");
        let mut keys: Vec<String> = self
            .scan_namespace(namespace)
            .await?
            .into_iter()
            .filter_map(|k| k.strip_prefix(&prefix).map(String::from))
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn clear(&self, namespace: &str) -> Result<usize> {
        let storage_keys = self.scan_namespace(namespace).await?;
        if storage_keys.is_empty() {
            return Ok(0);
        }
        let mut conn = self.conn.clone();
        let removed: u64 = redis::cmd("DEL")
            .arg(&storage_keys)
            .query_async(&mut conn)
            .await
            .map_err(|e| Error::Memory(e.to_string()))?;
        Ok(removed as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_key_shape() {
        assert_eq!(
            RedisStore::storage_key("assistant", "user_name"),
            "herd:assistant:user_name"
        );
    }

    #[test]
    fn test_scan_pattern_scopes_namespace() {
        assert_eq!(RedisStore::scan_pattern("sales"), "herd:sales:*");
    }
}
