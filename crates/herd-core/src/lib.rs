//! # herd-core
//!
//! Core types, traits, and primitives for the Herd agent library.
//! This crate defines the shared vocabulary used by every other crate in the workspace.

pub mod error;
pub mod memory;
pub mod message;
pub mod tool;

pub use error::{Error, Result};
pub use memory::MemoryEntry;
pub use message::{Message, Role};
pub use tool::{Tool, ToolCall, ToolExecutor, ToolResult};
