//! Agent execution metrics
//!
//! Per-agent counters are also folded into each agent's persisted
//! `performance_metrics`; the aggregate view is process-local.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Counters stored under an agent's `performance_metrics`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentMetrics {
    #[serde(default)]
    pub executions: u64,
    #[serde(default)]
    pub failures: u64,
    #[serde(default)]
    pub last_duration_ms: u64,
    #[serde(default)]
    pub avg_duration_ms: u64,
    #[serde(default)]
    pub total_duration_ms: u64,
}

impl AgentMetrics {
    /// Read counters back from a stored JSON object; unknown shapes start fresh
    pub fn from_value(value: &Value) -> Self {
        serde_json::from_value(value.clone()).unwrap_or_default()
    }

    pub fn record(&mut self, success: bool, duration_ms: u64) {
        self.executions += 1;
        if !success {
            self.failures += 1;
        }
        self.last_duration_ms = duration_ms;
        self.total_duration_ms += duration_ms;
        self.avg_duration_ms = self.total_duration_ms / self.executions;
    }

    /// Merge the counters into `target`, keeping unrelated keys
    pub fn write_into(&self, target: &mut Value) {
        let Ok(Value::Object(counters)) = serde_json::to_value(self) else {
            return;
        };
        match target {
            Value::Object(map) => map.extend(counters),
            other => *other = Value::Object(counters),
        }
    }
}

/// Aggregate view across every agent run by this process
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceSnapshot {
    pub total_executions: u64,
    pub average_response_ms: f64,
    /// Fraction in 0.0..=1.0; 1.0 before any execution
    pub success_rate: f64,
    /// Agents whose latest execution succeeded
    pub active_agents: usize,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct PerformanceTracker {
    agents: HashMap<String, (AgentMetrics, bool)>,
}

impl PerformanceTracker {
    pub fn record(&mut self, agent_id: &str, success: bool, duration_ms: u64) {
        let (metrics, last_ok) = self.agents.entry(agent_id.to_string()).or_default();
        metrics.record(success, duration_ms);
        *last_ok = success;
    }

    pub fn snapshot(&self) -> PerformanceSnapshot {
        let total_executions: u64 = self.agents.values().map(|(m, _)| m.executions).sum();
        let failures: u64 = self.agents.values().map(|(m, _)| m.failures).sum();
        let total_ms: u64 = self.agents.values().map(|(m, _)| m.total_duration_ms).sum();

        let (average_response_ms, success_rate) = if total_executions == 0 {
            (0.0, 1.0)
        } else {
            (
                total_ms as f64 / total_executions as f64,
                (total_executions - failures) as f64 / total_executions as f64,
            )
        };

        PerformanceSnapshot {
            total_executions,
            average_response_ms,
            success_rate,
            active_agents: self.agents.values().filter(|(_, ok)| *ok).count(),
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_snapshot() {
        let snapshot = PerformanceTracker::default().snapshot();
        assert_eq!(snapshot.total_executions, 0);
        assert_eq!(snapshot.success_rate, 1.0);
        assert_eq!(snapshot.active_agents, 0);
    }

    #[test]
    fn test_tracker_aggregates() {
        let mut tracker = PerformanceTracker::default();
        tracker.record("a", true, 100);
        tracker.record("a", true, 300);
        tracker.record("b", false, 200);

        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.total_executions, 3);
        assert!((snapshot.average_response_ms - 200.0).abs() < f64::EPSILON);
        assert!((snapshot.success_rate - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(snapshot.active_agents, 1);
        assert_eq!(tracker.agents["a"].0.avg_duration_ms, 200);
    }

    #[test]
    fn test_write_into_keeps_other_keys() {
        let mut stored = json!({"owner_note": "keep me", "executions": 4, "failures": 1});
        let mut metrics = AgentMetrics::from_value(&stored);
        assert_eq!(metrics.executions, 4);

        metrics.record(false, 50);
        metrics.write_into(&mut stored);

        assert_eq!(stored["owner_note"], "keep me");
        assert_eq!(stored["executions"], 5);
        assert_eq!(stored["failures"], 2);
        assert_eq!(stored["last_duration_ms"], 50);

        let mut not_an_object = Value::Null;
        metrics.write_into(&mut not_an_object);
        assert_eq!(not_an_object["executions"], 5);
    }
}
