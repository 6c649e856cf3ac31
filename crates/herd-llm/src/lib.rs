//! # herd-llm
//!
//! LLM provider abstraction for Herd. [`OllamaProvider`] speaks the native
//! Ollama chat API including tool calling; [`MockProvider`] returns canned
//! responses for deterministic tests.

pub mod mock;
pub mod ollama;
pub mod provider;

pub use mock::{MockProvider, MockResponse};
pub use ollama::OllamaProvider;
pub use provider::{LlmProvider, LlmRequest, LlmResponse, StopReason, StreamChunk, Usage};
