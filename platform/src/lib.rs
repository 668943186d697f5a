//! Agent orchestration core with Ollama, OpenAI, Anthropic and MCP backends
//!
//! Versioned prompts, MCP tool connections, workflow execution and an
//! optional HTTP API.

pub mod config;
#[cfg(feature = "persistence")]
pub mod db;
pub mod error;
pub mod llm;
pub mod logging;
pub mod mcp;
pub mod orchestrator;
pub mod prompts;
#[cfg(feature = "web")]
pub mod web;

pub use error::{PlatformError, Result};
