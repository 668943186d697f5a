//! Live MCP client sessions over `rmcp`

use anyhow::{bail, Context, Result};
use rmcp::{
    model::{CallToolRequestParam, RawContent},
    service::{Peer, RoleClient, RunningService},
    transport::TokioChildProcess,
    ServiceExt,
};
use serde_json::Value;
use tokio::process::Command;

use super::types::McpTool;

pub(crate) type McpSession = RunningService<RoleClient, ()>;

/// Spawn the server named by `uri` and complete the MCP handshake.
///
/// `uri` is a command line; environment variables are expanded before it is
/// split on whitespace.
pub(crate) async fn open_stdio(uri: &str) -> Result<McpSession> {
    let expanded = shellexpand::env(uri)
        .with_context(|| format!("Failed to expand command line: {}", uri))?;
    let mut words = expanded.split_whitespace();
    let program = words.next().context("Empty server command")?;

    let mut cmd = Command::new(program);
    cmd.args(words);

    let transport = TokioChildProcess::new(cmd)
        .with_context(|| format!("Failed to spawn MCP server: {}", program))?;
    let service = ()
        .serve(transport)
        .await
        .context("MCP handshake failed")?;

    Ok(service)
}

/// List the tools a server advertises
pub(crate) async fn discover(peer: &Peer<RoleClient>, server_name: &str) -> Result<Vec<McpTool>> {
    let response = peer
        .list_tools(Default::default())
        .await
        .context("Failed to list tools")?;

    Ok(response
        .tools
        .into_iter()
        .map(|t| McpTool {
            name: t.name.to_string(),
            description: t.description.map(|d| d.to_string()).unwrap_or_default(),
            input_schema: serde_json::to_value(&t.input_schema).unwrap_or_default(),
            server_name: server_name.to_string(),
        })
        .collect())
}

/// Call a tool and flatten its content into text
pub(crate) async fn call(peer: &Peer<RoleClient>, tool_name: &str, arguments: &Value) -> Result<String> {
    let result = peer
        .call_tool(CallToolRequestParam {
            name: tool_name.to_string().into(),
            arguments: arguments.as_object().cloned(),
            task: None,
        })
        .await
        .with_context(|| format!("Failed to call tool: {}", tool_name))?;

    let mut output = String::new();
    for content in &result.content {
        if !output.is_empty() {
            output.push('\n');
        }
        match &content.raw {
            RawContent::Text(text) => output.push_str(&text.text),
            other => output.push_str(&format!("{:?}", other)),
        }
    }

    if result.is_error.unwrap_or(false) {
        bail!("Tool {} returned an error: {}", tool_name, output);
    }

    Ok(output)
}
