//! Agent records and the persistence seam the executor writes status through

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

pub const DEFAULT_LLM_TYPE: &str = "ollama";
pub const DEFAULT_MODEL_NAME: &str = "llama3";

/// Lifecycle status of an agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    #[default]
    Inactive,
    Executing,
    Active,
    Error,
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentStatus::Inactive => write!(f, "inactive"),
            AgentStatus::Executing => write!(f, "executing"),
            AgentStatus::Active => write!(f, "active"),
            AgentStatus::Error => write!(f, "error"),
        }
    }
}

impl FromStr for AgentStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "inactive" => Ok(AgentStatus::Inactive),
            "executing" => Ok(AgentStatus::Executing),
            "active" => Ok(AgentStatus::Active),
            "error" => Ok(AgentStatus::Error),
            _ => Err(anyhow::anyhow!("Unknown agent status: {}", s)),
        }
    }
}

/// A persisted agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    /// Free-form JSON; `llm_type` and `model_name` drive execution
    pub config: Value,
    pub status: AgentStatus,
    pub last_executed: Option<DateTime<Utc>>,
    pub performance_metrics: Value,
    pub mcp_tools: Vec<String>,
    pub owner_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Agent {
    pub fn new(name: impl Into<String>, config: Value) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            description: None,
            config,
            status: AgentStatus::Inactive,
            last_executed: None,
            performance_metrics: Value::Object(Default::default()),
            mcp_tools: Vec::new(),
            owner_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn descriptor(&self) -> AgentDescriptor {
        AgentDescriptor {
            id: self.id.clone(),
            config: self.config.clone(),
        }
    }
}

/// What the executor needs to run one agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentDescriptor {
    pub id: String,
    #[serde(default = "empty_object")]
    pub config: Value,
}

fn empty_object() -> Value {
    Value::Object(Default::default())
}

impl AgentDescriptor {
    pub fn new(id: impl Into<String>, config: Value) -> Self {
        Self {
            id: id.into(),
            config,
        }
    }

    pub fn llm_type(&self) -> &str {
        self.config_str("llm_type").unwrap_or(DEFAULT_LLM_TYPE)
    }

    /// Configured model, else `fallback` (the platform's default model)
    pub fn model_name<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.config_str("model_name").unwrap_or(fallback)
    }

    fn config_str(&self, key: &str) -> Option<&str> {
        self.config.get(key).and_then(Value::as_str)
    }
}

/// Where the executor reads and writes agent status
#[async_trait]
pub trait AgentStore: Send + Sync {
    async fn get_agent(&self, id: &str) -> Result<Option<Agent>>;

    async fn save(&self, agent: &Agent) -> Result<()>;
}

/// Process-local agent store
#[derive(Default)]
pub struct InMemoryAgentStore {
    agents: RwLock<BTreeMap<String, Agent>>,
}

impl InMemoryAgentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, agent: Agent) {
        self.agents.write().await.insert(agent.id.clone(), agent);
    }
}

#[async_trait]
impl AgentStore for InMemoryAgentStore {
    async fn get_agent(&self, id: &str) -> Result<Option<Agent>> {
        Ok(self.agents.read().await.get(id).cloned())
    }

    async fn save(&self, agent: &Agent) -> Result<()> {
        self.insert(agent.clone()).await;
        Ok(())
    }
}
