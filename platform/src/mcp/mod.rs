//! MCP (Model Context Protocol) tool connections
//!
//! Named connections to external MCP servers, discovered tools and tool
//! execution. Live sessions need the `mcp` feature; without it the registry
//! still answers but never connects.

mod metrics;
mod registry;
#[cfg(feature = "mcp")]
mod session;
mod types;

pub use metrics::{ConnectionMetrics, FailureKind};
pub use registry::ToolRegistry;
pub use types::{McpTool, ToolCallOutcome, ToolConnection, Transport};
