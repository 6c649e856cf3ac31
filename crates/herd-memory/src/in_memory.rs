use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::HashMap;

use herd_core::{MemoryEntry, Result};

use crate::store::MemoryStore;

/// Process-local memory store. Contents are lost when the store is dropped.
///
/// This is the default backend when an agent enables memory without
/// supplying a store explicitly.
#[derive(Default)]
pub struct InMemoryStore {
    namespaces: DashMap<String, HashMap<String, MemoryEntry>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MemoryStore for InMemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn set(&self, namespace: &str, key: &str, entry: MemoryEntry) -> Result<()> {
        self.namespaces
            .entry(namespace.to_string())
            .or_default()
            .insert(key.to_string(), entry);
        Ok(())
    }

    async fn get(&self, namespace: &str, key: &str) -> Result<Option<MemoryEntry>> {
        let Some(mut ns) = self.namespaces.get_mut(namespace) else {
            return Ok(None);
        };
        // Evict lazily so expired entries don't linger
        if ns.get(key).is_some_and(|e| e.is_expired()) {
            ns.remove(key);
            return Ok(None);
        }
        Ok(ns.get(key).cloned())
    }

    async fn delete(&self, namespace: &str, key: &str) -> Result<bool> {
        let Some(mut ns) = self.namespaces.get_mut(namespace) else {
            return Ok(false);
        };
        Ok(ns.remove(key).is_some_and(|e| !e.is_expired()))
    }

    async fn keys(&self, namespace: &str) -> Result<Vec<String>> {
        let Some(mut ns) = self.namespaces.get_mut(namespace) else {
            return Ok(vec![]);
        };
        ns.retain(|_, e| !e.is_expired());
        let mut keys: Vec<String> = ns.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }

    async fn clear(&self, namespace: &str) -> Result<usize> {
        Ok(self
            .namespaces
            .remove(namespace)
            .map(|(_, ns)| ns.len())
            .unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_set_get_round_trip() {
        let store = InMemoryStore::new();
        store
            .set("a", "name", MemoryEntry::new(json!("Alice")))
            .await
            .unwrap();
        let entry = store.get("a", "name").await.unwrap().unwrap();
        assert_eq!(entry.value, json!("Alice"));
    }

    #[tokio::test]
    async fn test_namespace_isolation() {
        let store = InMemoryStore::new();
        store
            .set("sales", "customer", MemoryEntry::new(json!("John")))
            .await
            .unwrap();
        assert!(store.get("support", "customer").await.unwrap().is_none());
        assert_eq!(store.keys("support").await.unwrap(), Vec::<String>::new());
    }

    #[tokio::test]
    async fn test_expired_entry_invisible() {
        let store = InMemoryStore::new();
        let mut entry = MemoryEntry::new(json!("temp"));
        entry.expires_at = Some(chrono::Utc::now() - chrono::Duration::seconds(1));
        store.set("a", "temp", entry).await.unwrap();
        assert!(store.get("a", "temp").await.unwrap().is_none());
        assert!(store.keys("a").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_reports_existence() {
        let store = InMemoryStore::new();
        store.set("a", "k", MemoryEntry::new(json!(1))).await.unwrap();
        assert!(store.delete("a", "k").await.unwrap());
        assert!(!store.delete("a", "k").await.unwrap());
    }

    #[tokio::test]
    async fn test_clear_counts_and_scopes() {
        let store = InMemoryStore::new();
        store.set("a", "k1", MemoryEntry::new(json!(1))).await.unwrap();
        store.set("a", "k2", MemoryEntry::new(json!(2))).await.unwrap();
        store.set("b", "k1", MemoryEntry::new(json!(3))).await.unwrap();
        assert_eq!(store.clear("a").await.unwrap(), 2);
        assert!(store.get("b", "k1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_keys_sorted() {
        let store = InMemoryStore::new();
        for k in ["zeta", "alpha", "mid"] {
            store.set("a", k, MemoryEntry::new(json!(0))).await.unwrap();
        }
        assert_eq!(store.keys("a").await.unwrap(), vec!["alpha", "mid", "zeta"]);
    }
}
