//! # herd-memory
//!
//! Pluggable key/value memory backends for agents.
//!
//! Every backend implements [`MemoryStore`] and persists [`MemoryEntry`]
//! records keyed by `(namespace, key)`, where the namespace is the owning
//! agent's name. Expired entries are invisible to reads and purged
//! opportunistically.

pub mod in_memory;
pub mod postgres;
pub mod redis;
pub mod sqlite;
pub mod store;

pub use herd_core::MemoryEntry;
pub use in_memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use redis::RedisStore;
pub use sqlite::SqliteStore;
pub use store::MemoryStore;
