//! Workflow executor
//!
//! Runs a prompt through a set of agents:
//! - resolves each agent's backend kind and model name
//! - dispatches through [`ModelBackends`]
//! - writes `executing` then `active`/`error` through the [`AgentStore`]
//! - collects one outcome per agent; a failing agent never stops the others

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use super::agent::{AgentDescriptor, AgentStatus, AgentStore};
use super::metrics::{AgentMetrics, PerformanceSnapshot, PerformanceTracker};
use crate::error::{PlatformError, Result};
use crate::llm::{BackendKind, ModelBackends, ModelResponse};

/// How agents of one workflow are scheduled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// One after another, in the order given
    #[default]
    Sequential,
    /// All at once
    Concurrent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowStatus {
    Success,
}

/// Result for a single agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AgentOutcome {
    Success {
        response: ModelResponse,
        timestamp: DateTime<Utc>,
    },
    Failure {
        error: String,
        /// Machine-readable error label
        kind: String,
        timestamp: DateTime<Utc>,
    },
}

impl AgentOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, AgentOutcome::Success { .. })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowResult {
    pub status: WorkflowStatus,
    /// Keyed by agent id; a repeated id keeps its last outcome
    pub results: BTreeMap<String, AgentOutcome>,
    pub timestamp: DateTime<Utc>,
}

pub struct WorkflowExecutor {
    backends: Arc<ModelBackends>,
    store: Option<Arc<dyn AgentStore>>,
    mode: ExecutionMode,
    performance: Mutex<PerformanceTracker>,
}

impl WorkflowExecutor {
    pub fn new(backends: Arc<ModelBackends>) -> Self {
        Self {
            backends,
            store: None,
            mode: ExecutionMode::default(),
            performance: Mutex::new(PerformanceTracker::default()),
        }
    }

    /// Persist status transitions through `store`
    pub fn with_store(mut self, store: Arc<dyn AgentStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn backends(&self) -> &Arc<ModelBackends> {
        &self.backends
    }

    /// Look up stored agents and turn them into descriptors
    pub async fn descriptors_for(&self, ids: &[String]) -> Result<Vec<AgentDescriptor>> {
        let store = self
            .store
            .as_ref()
            .ok_or_else(|| PlatformError::InvalidRequest("No agent store attached".into()))?;

        let mut descriptors = Vec::with_capacity(ids.len());
        for id in ids {
            let agent = store
                .get_agent(id)
                .await?
                .ok_or_else(|| PlatformError::not_found("Agent", id))?;
            descriptors.push(agent.descriptor());
        }
        Ok(descriptors)
    }

    /// Run `prompt` through every agent.
    ///
    /// Only malformed input fails the call; backend failures are reported
    /// per agent.
    pub async fn run_workflow(
        &self,
        agents: &[AgentDescriptor],
        prompt: &str,
    ) -> Result<WorkflowResult> {
        if agents.iter().any(|a| a.id.trim().is_empty()) {
            return Err(PlatformError::InvalidRequest(
                "Agent id must not be empty".into(),
            ));
        }

        tracing::info!(agents = agents.len(), mode = ?self.mode, "Running workflow");

        let outcomes: Vec<(String, AgentOutcome)> = match self.mode {
            ExecutionMode::Sequential => {
                let mut outcomes = Vec::with_capacity(agents.len());
                for agent in agents {
                    outcomes.push((agent.id.clone(), self.execute_agent(agent, prompt).await));
                }
                outcomes
            }
            ExecutionMode::Concurrent => {
                let runs = agents.iter().map(|agent| async move {
                    (agent.id.clone(), self.execute_agent(agent, prompt).await)
                });
                join_all(runs).await
            }
        };

        let succeeded = outcomes.iter().filter(|(_, o)| o.is_success()).count();
        tracing::info!(
            agents = outcomes.len(),
            succeeded,
            "Workflow finished"
        );

        Ok(WorkflowResult {
            status: WorkflowStatus::Success,
            results: outcomes.into_iter().collect(),
            timestamp: Utc::now(),
        })
    }

    pub async fn performance(&self) -> PerformanceSnapshot {
        self.performance.lock().await.snapshot()
    }

    async fn execute_agent(&self, agent: &AgentDescriptor, prompt: &str) -> AgentOutcome {
        let started = Instant::now();
        self.mark_executing(&agent.id).await;

        let result = match agent.llm_type().parse::<BackendKind>() {
            Ok(kind) => {
                let model = agent.model_name(&self.backends.settings().default_model);
                self.backends.invoke(kind, model, prompt).await
            }
            Err(e) => Err(e),
        };

        let duration_ms = started.elapsed().as_millis() as u64;
        let success = result.is_ok();
        self.performance
            .lock()
            .await
            .record(&agent.id, success, duration_ms);

        let status = if success {
            AgentStatus::Active
        } else {
            AgentStatus::Error
        };
        self.mark_finished(&agent.id, status, duration_ms).await;

        let timestamp = Utc::now();
        match result {
            Ok(response) => {
                tracing::info!(
                    agent_id = %agent.id,
                    backend = %response.backend,
                    duration_ms,
                    "Agent execution succeeded"
                );
                AgentOutcome::Success {
                    response,
                    timestamp,
                }
            }
            Err(e) => {
                tracing::error!(agent_id = %agent.id, error_type = e.label(), "Agent execution failed: {}", e);
                AgentOutcome::Failure {
                    error: e.to_string(),
                    kind: e.label().to_string(),
                    timestamp,
                }
            }
        }
    }

    async fn mark_executing(&self, agent_id: &str) {
        let Some(store) = &self.store else { return };

        match store.get_agent(agent_id).await {
            Ok(Some(mut agent)) => {
                let now = Utc::now();
                agent.status = AgentStatus::Executing;
                agent.last_executed = Some(now);
                agent.updated_at = now;
                if let Err(e) = store.save(&agent).await {
                    tracing::warn!(agent_id = %agent_id, "Could not update agent status: {:#}", e);
                }
            }
            Ok(None) => tracing::debug!(agent_id = %agent_id, "Agent not stored, status not tracked"),
            Err(e) => tracing::warn!(agent_id = %agent_id, "Could not load agent: {:#}", e),
        }
    }

    async fn mark_finished(&self, agent_id: &str, status: AgentStatus, duration_ms: u64) {
        let Some(store) = &self.store else { return };

        match store.get_agent(agent_id).await {
            Ok(Some(mut agent)) => {
                let mut metrics = AgentMetrics::from_value(&agent.performance_metrics);
                metrics.record(status == AgentStatus::Active, duration_ms);
                metrics.write_into(&mut agent.performance_metrics);
                agent.status = status;
                agent.updated_at = Utc::now();
                if let Err(e) = store.save(&agent).await {
                    tracing::warn!(agent_id = %agent_id, "Could not update agent status: {:#}", e);
                }
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(agent_id = %agent_id, "Could not load agent: {:#}", e),
        }
    }
}
