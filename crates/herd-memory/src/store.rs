use async_trait::async_trait;
use herd_core::{MemoryEntry, Result};

/// A pluggable key/value memory backend.
///
/// Keys live inside a namespace (the owning agent's name), so multiple
/// agents can share one physical store without seeing each other's entries.
#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// Short backend name for logging, e.g. "sqlite", "redis".
    fn backend(&self) -> &'static str;

    /// Store an entry, replacing any existing entry under the same key.
    async fn set(&self, namespace: &str, key: &str, entry: MemoryEntry) -> Result<()>;

    /// Fetch an entry. Expired entries are reported as absent.
    async fn get(&self, namespace: &str, key: &str) -> Result<Option<MemoryEntry>>;

    /// Remove an entry. Returns whether a live entry existed.
    async fn delete(&self, namespace: &str, key: &str) -> Result<bool>;

    /// List live keys in a namespace, sorted for stable output.
    async fn keys(&self, namespace: &str) -> Result<Vec<String>>;

    /// Remove every entry in a namespace. Returns the number removed.
    async fn clear(&self, namespace: &str) -> Result<usize>;
}
