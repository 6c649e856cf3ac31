//! Persistent memory walkthrough.
//!
//! Run a local Ollama first, then:
//!   cargo run -p herd-runtime --example memory

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, json};

use herd_memory::SqliteStore;
use herd_runtime::Agent;

#[tokio::main]
async fn main() -> herd_core::Result<()> {
    let store = Arc::new(SqliteStore::open("memory_demo.db")?);

    let agent = Agent::builder("assistant")
        .instructions("You are a helpful assistant. Use what you remember about the user.")
        .memory(store)
        .build();

    // Plain key/value
    agent.remember("user_name", json!("Sam")).await?;
    agent.remember("favorite_language", json!("Rust")).await?;

    // With metadata and a one-hour expiry
    let mut meta = Map::new();
    meta.insert("source".into(), json!("onboarding"));
    agent
        .remember_with(
            "current_task",
            json!("write the quarterly report"),
            Some(meta),
            Some(Duration::from_secs(3600)),
        )
        .await?;

    println!("keys: {:?}", agent.memory_keys().await?);
    println!("recall user_name: {:?}", agent.recall("user_name").await?);
    println!(
        "metadata for current_task: {:?}",
        agent.memory_metadata("current_task").await?
    );

    // Memory is injected into the system prompt, so the model can use it
    let response = agent.chat("What language do I like?").await?;
    println!("\nagent: {}", response.content);

    agent.forget("current_task").await?;
    let removed = agent.clear_memory().await?;
    println!("\ncleared {removed} entries");

    Ok(())
}
