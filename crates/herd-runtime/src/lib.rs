//! # herd-runtime
//!
//! The agent runtime: build an [`Agent`] with instructions, a model, tools,
//! and optional persistent memory, then `chat` with it. Tool calls requested
//! by the model are dispatched through the [`ToolRegistry`] and their results
//! fed back until the model settles on a final answer.
//!
//! ```no_run
//! use herd_runtime::Agent;
//!
//! # async fn run() -> herd_core::Result<()> {
//! let agent = Agent::builder("assistant")
//!     .instructions("You are a concise assistant.")
//!     .model("qwen2.5-coder:3b-instruct-q8_0")
//!     .build();
//!
//! let response = agent.chat("What is Rust?").await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod handoff;
pub mod stats;
pub mod tools;

pub use agent::{Agent, AgentBuilder, AgentSettings, ChatResponse, DEFAULT_MODEL};
pub use handoff::{handoff_tool, route_tool_name};
pub use stats::AgentStats;
pub use tools::{FunctionTool, ToolFuture, ToolRegistry};
