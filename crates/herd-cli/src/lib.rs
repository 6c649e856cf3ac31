//! # herd-cli
//!
//! Command-line interface for Herd agents.
//!
//! ## Commands
//!
//! - `herd chat` — Interactive chat in the terminal
//! - `herd memory` — Inspect and edit the agent's persistent memory
//! - `herd health` — Check that the Ollama server is reachable
//! - `herd config` — Show the resolved configuration

pub mod commands;

pub use commands::Cli;
