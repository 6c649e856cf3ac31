//! Exercise each memory backend with the same agent code.
//!
//! SQLite and the in-process store always run. Redis and Postgres run only
//! when their URLs are set:
//!   REDIS_URL=redis://127.0.0.1/ POSTGRES_URL=postgres://localhost/herd \
//!     cargo run -p herd-runtime --example backends

use std::sync::Arc;

use serde_json::json;

use herd_llm::MockProvider;
use herd_memory::{InMemoryStore, MemoryStore, PostgresStore, RedisStore, SqliteStore};
use herd_runtime::Agent;

async fn exercise(store: Arc<dyn MemoryStore>) -> herd_core::Result<()> {
    println!("── backend: {} ──", store.backend());

    let agent = Agent::builder("backend_demo")
        .provider(Arc::new(MockProvider::new("mock")))
        .memory(store)
        .build();

    agent.remember("city", json!("Oslo")).await?;
    agent.remember("population", json!(709_037)).await?;

    println!("  keys: {:?}", agent.memory_keys().await?);
    println!("  city: {:?}", agent.recall("city").await?);

    agent.forget("population").await?;
    println!("  after forget: {:?}", agent.memory_keys().await?);

    agent.clear_memory().await?;
    Ok(())
}

#[tokio::main]
async fn main() -> herd_core::Result<()> {
    exercise(Arc::new(InMemoryStore::new())).await?;
    exercise(Arc::new(SqliteStore::open("backends_demo.db")?)).await?;

    if let Ok(url) = std::env::var("REDIS_URL") {
        exercise(Arc::new(RedisStore::connect(&url).await?)).await?;
    }
    if let Ok(url) = std::env::var("POSTGRES_URL") {
        exercise(Arc::new(PostgresStore::connect(&url).await?)).await?;
    }

    Ok(())
}
