//! # herd-config
//!
//! TOML configuration for Herd: schema with per-section defaults, a loader
//! with env-var overrides, and validation.

pub mod loader;
pub mod schema;

pub use loader::ConfigLoader;
pub use schema::{AgentConfig, HerdConfig, LoggingConfig, MemoryConfig, OllamaConfig};
