//! Per-connection tool call metrics
//!
//! In-memory only; counters reset with the process.

use std::collections::BTreeMap;

use serde::Serialize;

/// Coarse classification of a failed tool call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Server process could not be reached or went away mid-call
    ConnectionLost,
    /// Protocol or serialization problem
    Transport,
    /// The server answered with an error result
    Tool,
}

impl FailureKind {
    pub fn classify(error: &str) -> Self {
        let lower = error.to_lowercase();
        if lower.contains("broken pipe")
            || lower.contains("connection reset")
            || lower.contains("connection closed")
            || lower.contains("transport closed")
            || lower.contains("process exited")
        {
            Self::ConnectionLost
        } else if lower.contains("failed to parse")
            || lower.contains("serialization")
            || lower.contains("protocol")
        {
            Self::Transport
        } else {
            Self::Tool
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::ConnectionLost => "connection_lost",
            Self::Transport => "transport_error",
            Self::Tool => "tool_error",
        }
    }
}

/// Counters for one connection
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConnectionMetrics {
    pub connection: String,
    pub total_calls: u64,
    pub success_count: u64,
    pub error_count: u64,
    pub total_duration_ms: u64,
    pub avg_duration_ms: u64,
    /// Fraction in 0.0..=1.0; 1.0 before any call
    pub success_rate: f64,
    pub last_error: Option<String>,
    pub last_error_kind: Option<FailureKind>,
}

impl ConnectionMetrics {
    fn new(connection: &str) -> Self {
        Self {
            connection: connection.to_string(),
            success_rate: 1.0,
            ..Default::default()
        }
    }

    fn record(&mut self, duration_ms: u64, error: Option<&str>) {
        self.total_calls += 1;
        self.total_duration_ms += duration_ms;
        match error {
            None => self.success_count += 1,
            Some(message) => {
                self.error_count += 1;
                self.last_error = Some(message.to_string());
                self.last_error_kind = Some(FailureKind::classify(message));
            }
        }
        self.avg_duration_ms = self.total_duration_ms / self.total_calls;
        self.success_rate = self.success_count as f64 / self.total_calls as f64;
    }
}

#[derive(Debug, Clone, Default)]
pub struct ToolMetrics {
    connections: BTreeMap<String, ConnectionMetrics>,
}

impl ToolMetrics {
    pub fn record_success(&mut self, connection: &str, tool: &str, duration_ms: u64) {
        tracing::debug!(
            mcp.connection = connection,
            mcp.tool = tool,
            mcp.duration_ms = duration_ms,
            "Tool call succeeded"
        );
        self.entry(connection).record(duration_ms, None);
    }

    pub fn record_error(&mut self, connection: &str, tool: &str, duration_ms: u64, error: &str) {
        tracing::warn!(
            mcp.connection = connection,
            mcp.tool = tool,
            mcp.duration_ms = duration_ms,
            mcp.error_type = FailureKind::classify(error).label(),
            "Tool call failed: {}",
            error
        );
        self.entry(connection).record(duration_ms, Some(error));
    }

    /// Drop counters for a removed connection
    pub fn forget(&mut self, connection: &str) {
        self.connections.remove(connection);
    }

    /// Cloned view ordered by connection name
    pub fn snapshot(&self) -> Vec<ConnectionMetrics> {
        self.connections.values().cloned().collect()
    }

    fn entry(&mut self, connection: &str) -> &mut ConnectionMetrics {
        self.connections
            .entry(connection.to_string())
            .or_insert_with(|| ConnectionMetrics::new(connection))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(
            FailureKind::classify("write failed: Broken pipe"),
            FailureKind::ConnectionLost
        );
        assert_eq!(
            FailureKind::classify("Failed to parse tool result"),
            FailureKind::Transport
        );
        assert_eq!(FailureKind::classify("division by zero"), FailureKind::Tool);
    }

    #[test]
    fn test_record_and_snapshot() {
        let mut metrics = ToolMetrics::default();
        metrics.record_success("b", "echo", 100);
        metrics.record_success("b", "echo", 300);
        metrics.record_error("b", "echo", 50, "division by zero");
        metrics.record_success("a", "ls", 10);

        let snapshot = metrics.snapshot();
        let names: Vec<_> = snapshot.iter().map(|m| m.connection.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);

        let b = &snapshot[1];
        assert_eq!(b.total_calls, 3);
        assert_eq!(b.error_count, 1);
        assert_eq!(b.avg_duration_ms, 150);
        assert_eq!(b.last_error_kind, Some(FailureKind::Tool));
        assert!((b.success_rate - 0.666).abs() < 0.01);
        assert_eq!(snapshot[0].success_rate, 1.0);

        let json = serde_json::to_value(b).unwrap();
        assert!(json["success_rate"].is_number());

        metrics.forget("b");
        assert_eq!(metrics.snapshot().len(), 1);
    }
}
