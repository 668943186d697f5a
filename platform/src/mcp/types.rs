//! MCP type definitions
//!
//! Connection records, discovered tools and tool call outcomes shared by the
//! registry and the HTTP layer.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How the registry reaches an MCP server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    /// Child process speaking MCP over stdin/stdout
    #[default]
    Stdio,
    /// Streamable HTTP (not supported yet)
    Http,
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transport::Stdio => write!(f, "stdio"),
            Transport::Http => write!(f, "http"),
        }
    }
}

/// A named connection definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolConnection {
    pub name: String,
    pub server_name: String,
    /// Command line for stdio servers, endpoint URL for http
    pub uri: String,
    #[serde(default)]
    pub transport: Transport,
    #[serde(default)]
    pub is_connected: bool,
}

impl ToolConnection {
    pub fn stdio(name: impl Into<String>, uri: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            server_name: name.clone(),
            name,
            uri: uri.into(),
            transport: Transport::Stdio,
            is_connected: false,
        }
    }
}

/// A tool advertised by a connected MCP server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpTool {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
    /// Name of the connection that advertised the tool
    pub server_name: String,
}

/// Result of a tool execution. Failures are values, never errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolCallOutcome {
    Success {
        tool_name: String,
        arguments: Value,
        result: String,
        connection: String,
    },
    Failure {
        error: String,
    },
}

impl ToolCallOutcome {
    pub fn failure(error: impl Into<String>) -> Self {
        Self::Failure {
            error: error.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_serializes_flat() {
        let ok = ToolCallOutcome::Success {
            tool_name: "echo".into(),
            arguments: serde_json::json!({"prompt": "hi"}),
            result: "hi".into(),
            connection: "local".into(),
        };
        let json = serde_json::to_value(&ok).unwrap();
        assert_eq!(json["tool_name"], "echo");
        assert_eq!(json["connection"], "local");
        assert!(json.get("error").is_none());

        let err = serde_json::to_value(ToolCallOutcome::failure("Tool x not found")).unwrap();
        assert_eq!(err, serde_json::json!({"error": "Tool x not found"}));
    }

    #[test]
    fn test_connection_defaults() {
        let conn: ToolConnection =
            serde_json::from_str(r#"{"name": "fs", "server_name": "files", "uri": "mcp-fs"}"#)
                .unwrap();
        assert_eq!(conn.transport, Transport::Stdio);
        assert!(!conn.is_connected);

        let conn: ToolConnection = serde_json::from_str(
            r#"{"name": "r", "server_name": "r", "uri": "http://h/mcp", "transport": "http"}"#,
        )
        .unwrap();
        assert_eq!(conn.transport, Transport::Http);
        assert_eq!(conn.transport.to_string(), "http");
    }
}
