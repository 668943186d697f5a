//! Tool connection registry
//!
//! Owns every named connection definition, the tools discovered on connected
//! servers and the live client sessions. All state sits behind one async
//! `RwLock`; peers are cloned out of the lock before a call is awaited so
//! calls on different connections run in parallel.

use std::collections::BTreeMap;
#[cfg(feature = "mcp")]
use std::collections::HashMap;
#[cfg(feature = "mcp")]
use std::time::Instant;

use serde_json::Value;
use tokio::sync::RwLock;

#[cfg(feature = "mcp")]
use super::session::{self, McpSession};
use super::metrics::{ConnectionMetrics, ToolMetrics};
use super::types::{McpTool, ToolCallOutcome, ToolConnection, Transport};
use crate::config::ConnectionSettings;

#[derive(Default)]
struct RegistryState {
    connections: BTreeMap<String, ToolConnection>,
    /// Keyed by tool name; a later discovery of the same name wins
    tools: BTreeMap<String, McpTool>,
    #[cfg(feature = "mcp")]
    sessions: HashMap<String, McpSession>,
    metrics: ToolMetrics,
}

impl RegistryState {
    fn is_connected(&self, name: &str) -> bool {
        self.connections
            .get(name)
            .is_some_and(|c| c.is_connected)
    }

    /// Whether `name` is still defined as `uri` over `transport` and not yet
    /// connected. A handshake only commits against the definition it started
    /// from.
    #[cfg(feature = "mcp")]
    fn awaits_connection(&self, name: &str, uri: &str, transport: Transport) -> bool {
        self.connections.get(name).is_some_and(|c| {
            !c.is_connected && c.uri == uri && c.transport == transport
        })
    }

    fn drop_tools_of(&mut self, name: &str) {
        self.tools.retain(|_, tool| tool.server_name != name);
    }
}

#[derive(Default)]
pub struct ToolRegistry {
    state: RwLock<RegistryState>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether live connections are possible in this build
    pub fn runtime_available() -> bool {
        cfg!(feature = "mcp")
    }

    /// Add a connection definition. No network activity.
    pub async fn register(&self, mut connection: ToolConnection) -> bool {
        if !Self::runtime_available() {
            tracing::warn!(
                connection = %connection.name,
                "MCP runtime not compiled in, cannot register connection"
            );
            return false;
        }

        let mut state = self.state.write().await;
        if state.is_connected(&connection.name) {
            tracing::warn!(
                connection = %connection.name,
                "Connection is live, disconnect it before redefining"
            );
            return false;
        }

        connection.is_connected = false;
        tracing::info!(
            connection = %connection.name,
            transport = %connection.transport,
            "Registered MCP connection"
        );
        state.connections.insert(connection.name.clone(), connection);
        true
    }

    /// Register every configured connection and connect the ones marked
    /// `connect_on_start`. Returns how many ended up connected.
    pub async fn bootstrap(&self, settings: &[ConnectionSettings]) -> usize {
        let mut connected = 0;
        for entry in settings {
            if !self.register(entry.to_connection()).await {
                continue;
            }
            if entry.connect_on_start && self.connect(&entry.name).await {
                connected += 1;
            }
        }
        connected
    }

    /// Open the connection and discover its tools.
    ///
    /// Every failure is logged and reported as `false`.
    pub async fn connect(&self, name: &str) -> bool {
        let connection = match self.state.read().await.connections.get(name) {
            Some(c) => c.clone(),
            None => {
                tracing::error!(connection = %name, "Connection not found");
                return false;
            }
        };

        if connection.is_connected {
            return true;
        }

        match connection.transport {
            Transport::Http => {
                tracing::warn!(connection = %name, "HTTP transport not implemented yet");
                false
            }
            Transport::Stdio => self.connect_stdio(connection).await,
        }
    }

    #[cfg(feature = "mcp")]
    async fn connect_stdio(&self, connection: ToolConnection) -> bool {
        let ToolConnection {
            name,
            uri,
            transport,
            ..
        } = connection;

        let client = match session::open_stdio(&uri).await {
            Ok(client) => client,
            Err(e) => {
                tracing::error!(connection = %name, "Failed to connect to MCP server: {:#}", e);
                return false;
            }
        };

        let tools = match session::discover(client.peer(), &name).await {
            Ok(tools) => tools,
            Err(e) => {
                tracing::warn!(connection = %name, "Tool discovery failed: {:#}", e);
                Vec::new()
            }
        };
        let tool_count = tools.len();

        let (to_cancel, connected) = {
            let mut guard = self.state.write().await;
            let state = &mut *guard;
            if state.awaits_connection(&name, &uri, transport) {
                if let Some(entry) = state.connections.get_mut(&name) {
                    entry.is_connected = true;
                }
                state.drop_tools_of(&name);
                for tool in tools {
                    state.tools.insert(tool.name.clone(), tool);
                }
                (state.sessions.insert(name.clone(), client), true)
            } else {
                // Removed, redefined or connected by another caller while the
                // handshake was in flight
                tracing::warn!(
                    connection = %name,
                    "Connection changed during handshake, discarding session"
                );
                (Some(client), false)
            }
        };

        if let Some(stale) = to_cancel {
            let _ = stale.cancel().await;
        }

        if connected {
            tracing::info!(connection = %name, tools = tool_count, "Connected to MCP server");
        }
        connected
    }

    #[cfg(not(feature = "mcp"))]
    async fn connect_stdio(&self, connection: ToolConnection) -> bool {
        tracing::warn!(
            connection = %connection.name,
            "MCP runtime not compiled in, cannot connect"
        );
        false
    }

    /// Close the live session but keep the definition
    pub async fn disconnect(&self, name: &str) -> bool {
        let mut state = self.state.write().await;
        if !state.is_connected(name) {
            return false;
        }

        if let Some(entry) = state.connections.get_mut(name) {
            entry.is_connected = false;
        }
        state.drop_tools_of(name);

        #[cfg(feature = "mcp")]
        {
            let client = state.sessions.remove(name);
            drop(state);
            if let Some(client) = client {
                let _ = client.cancel().await;
            }
        }

        tracing::info!(connection = %name, "Disconnected MCP server");
        true
    }

    /// Delete the definition, its tools and any live session
    pub async fn remove(&self, name: &str) -> bool {
        let mut state = self.state.write().await;
        if state.connections.remove(name).is_none() {
            return false;
        }
        state.drop_tools_of(name);
        state.metrics.forget(name);

        #[cfg(feature = "mcp")]
        {
            let client = state.sessions.remove(name);
            drop(state);
            if let Some(client) = client {
                let _ = client.cancel().await;
            }
        }

        tracing::info!(connection = %name, "Removed MCP connection");
        true
    }

    /// Cancel every live session
    pub async fn close_all(&self) {
        let names: Vec<String> = {
            let state = self.state.read().await;
            state
                .connections
                .values()
                .filter(|c| c.is_connected)
                .map(|c| c.name.clone())
                .collect()
        };
        for name in names {
            self.disconnect(&name).await;
        }
    }

    pub async fn get_connection(&self, name: &str) -> Option<ToolConnection> {
        self.state.read().await.connections.get(name).cloned()
    }

    pub async fn list_connections(&self) -> Vec<ToolConnection> {
        self.state.read().await.connections.values().cloned().collect()
    }

    pub async fn list_tools(&self) -> Vec<McpTool> {
        self.state.read().await.tools.values().cloned().collect()
    }

    pub async fn metrics(&self) -> Vec<ConnectionMetrics> {
        self.state.read().await.metrics.snapshot()
    }

    /// Execute a discovered tool.
    ///
    /// Without `connection_name` the connection that advertised the tool is
    /// used when it is connected, else the first connected one by name.
    /// Exactly one connection is tried.
    #[cfg(feature = "mcp")]
    pub async fn execute_tool(
        &self,
        tool_name: &str,
        arguments: Value,
        connection_name: Option<&str>,
    ) -> ToolCallOutcome {
        let (connection, peer) = {
            let state = self.state.read().await;

            let Some(tool) = state.tools.get(tool_name) else {
                return ToolCallOutcome::failure(format!("Tool {} not found", tool_name));
            };

            let connection = match connection_name {
                Some(name) => name.to_string(),
                None if state.is_connected(&tool.server_name) => tool.server_name.clone(),
                None => match state.connections.values().find(|c| c.is_connected) {
                    Some(c) => c.name.clone(),
                    None => return ToolCallOutcome::failure("No connected MCP servers"),
                },
            };

            match state.sessions.get(&connection) {
                Some(client) => (connection, client.peer().clone()),
                None => {
                    return ToolCallOutcome::failure(format!(
                        "Connection {} not found or not connected",
                        connection
                    ))
                }
            }
        };

        let started = Instant::now();
        let result = session::call(&peer, tool_name, &arguments).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        let mut state = self.state.write().await;
        match result {
            Ok(text) => {
                state.metrics.record_success(&connection, tool_name, duration_ms);
                ToolCallOutcome::Success {
                    tool_name: tool_name.to_string(),
                    arguments,
                    result: text,
                    connection,
                }
            }
            Err(e) => {
                let message = format!("{:#}", e);
                state
                    .metrics
                    .record_error(&connection, tool_name, duration_ms, &message);
                ToolCallOutcome::failure(message)
            }
        }
    }

    #[cfg(not(feature = "mcp"))]
    pub async fn execute_tool(
        &self,
        tool_name: &str,
        _arguments: Value,
        _connection_name: Option<&str>,
    ) -> ToolCallOutcome {
        ToolCallOutcome::failure(format!(
            "Tool {} not found: MCP runtime not compiled in",
            tool_name
        ))
    }
}

#[cfg(all(test, feature = "mcp"))]
mod tests {
    use super::*;

    fn http_connection(name: &str) -> ToolConnection {
        ToolConnection {
            name: name.to_string(),
            server_name: name.to_string(),
            uri: "http://localhost:9000/mcp".to_string(),
            transport: Transport::Http,
            is_connected: false,
        }
    }

    #[test]
    fn test_handshake_commits_only_against_same_definition() {
        let mut state = RegistryState::default();
        state
            .connections
            .insert("fs".into(), ToolConnection::stdio("fs", "mcp-fs --root /tmp"));

        assert!(state.awaits_connection("fs", "mcp-fs --root /tmp", Transport::Stdio));
        assert!(!state.awaits_connection("fs", "mcp-fs --root /var", Transport::Stdio));
        assert!(!state.awaits_connection("fs", "mcp-fs --root /tmp", Transport::Http));
        assert!(!state.awaits_connection("gone", "mcp-fs --root /tmp", Transport::Stdio));

        if let Some(entry) = state.connections.get_mut("fs") {
            entry.is_connected = true;
        }
        assert!(!state.awaits_connection("fs", "mcp-fs --root /tmp", Transport::Stdio));
    }

    #[tokio::test]
    async fn test_connect_missing_connection() {
        let registry = ToolRegistry::new();
        assert!(!registry.connect("missing-connection").await);
        assert!(registry.list_connections().await.is_empty());
    }

    #[tokio::test]
    async fn test_register_is_offline_and_replaces() {
        let registry = ToolRegistry::new();
        assert!(registry.register(ToolConnection::stdio("fs", "mcp-fs --root /tmp")).await);
        assert!(registry.register(ToolConnection::stdio("fs", "mcp-fs --root /var")).await);

        let connections = registry.list_connections().await;
        assert_eq!(connections.len(), 1);
        assert_eq!(connections[0].uri, "mcp-fs --root /var");
        assert!(!connections[0].is_connected);
        assert!(registry.list_tools().await.is_empty());
    }

    #[tokio::test]
    async fn test_http_transport_not_connected() {
        let registry = ToolRegistry::new();
        registry.register(http_connection("remote")).await;

        assert!(!registry.connect("remote").await);
        assert!(!registry.get_connection("remote").await.unwrap().is_connected);
    }

    #[tokio::test]
    async fn test_spawn_failure_not_connected() {
        let registry = ToolRegistry::new();
        registry
            .register(ToolConnection::stdio("bogus", "/nonexistent/mcp-server-binary"))
            .await;

        assert!(!registry.connect("bogus").await);
        assert!(!registry.get_connection("bogus").await.unwrap().is_connected);
    }

    #[tokio::test]
    async fn test_remove_is_repeatable() {
        let registry = ToolRegistry::new();
        registry.register(ToolConnection::stdio("fs", "mcp-fs")).await;

        assert!(registry.remove("fs").await);
        assert!(!registry.remove("fs").await);
        assert!(!registry.remove("fs").await);
        assert!(registry.get_connection("fs").await.is_none());
    }

    #[tokio::test]
    async fn test_execute_unknown_tool() {
        let registry = ToolRegistry::new();
        let outcome = registry
            .execute_tool("nope", serde_json::json!({}), None)
            .await;
        assert_eq!(outcome, ToolCallOutcome::failure("Tool nope not found"));
    }

    #[tokio::test]
    async fn test_disconnect_requires_live_connection() {
        let registry = ToolRegistry::new();
        registry.register(ToolConnection::stdio("fs", "mcp-fs")).await;
        assert!(!registry.disconnect("fs").await);
        assert!(!registry.disconnect("other").await);
    }

    #[tokio::test]
    async fn test_bootstrap_registers_all() {
        let registry = ToolRegistry::new();
        let settings = vec![
            ConnectionSettings {
                name: "a".into(),
                server_name: None,
                uri: "/nonexistent/a".into(),
                transport: Transport::Stdio,
                connect_on_start: true,
            },
            ConnectionSettings {
                name: "b".into(),
                server_name: Some("beta".into()),
                uri: "http://localhost/mcp".into(),
                transport: Transport::Http,
                connect_on_start: false,
            },
        ];

        assert_eq!(registry.bootstrap(&settings).await, 0);
        let connections = registry.list_connections().await;
        assert_eq!(connections.len(), 2);
        assert_eq!(connections[1].server_name, "beta");
    }
}
