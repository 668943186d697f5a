//! Agent CRUD operations

use super::Database;
use crate::orchestrator::{Agent, AgentStatus, AgentStore};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Parameters for creating a new agent
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateAgent {
    pub name: String,
    pub description: Option<String>,
    pub config: Option<Value>,
    pub mcp_tools: Option<Vec<String>>,
    pub owner_id: Option<String>,
}

/// Parameters for updating an agent
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateAgent {
    pub name: Option<String>,
    pub description: Option<String>,
    pub config: Option<Value>,
    pub status: Option<AgentStatus>,
    pub mcp_tools: Option<Vec<String>>,
}

const AGENT_COLUMNS: &str = "id, name, description, config, status, last_executed, \
     performance_metrics, mcp_tools, owner_id, created_at, updated_at";

pub(super) fn conversion_error(idx: usize, err: impl std::error::Error + Send + Sync + 'static) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

pub(super) fn parse_time(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, e))
}

pub(super) fn parse_json<T: serde::de::DeserializeOwned>(idx: usize, raw: &str) -> rusqlite::Result<T> {
    serde_json::from_str(raw).map_err(|e| conversion_error(idx, e))
}

fn agent_from_row(row: &Row<'_>) -> rusqlite::Result<Agent> {
    let config: String = row.get(3)?;
    let status: String = row.get(4)?;
    let last_executed: Option<String> = row.get(5)?;
    let metrics: String = row.get(6)?;
    let tools: String = row.get(7)?;
    let created_at: String = row.get(9)?;
    let updated_at: String = row.get(10)?;

    Ok(Agent {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        config: parse_json(3, &config)?,
        status: status
            .parse()
            .map_err(|e: anyhow::Error| conversion_error(4, std::io::Error::other(e.to_string())))?,
        last_executed: last_executed.as_deref().map(|t| parse_time(5, t)).transpose()?,
        performance_metrics: parse_json(6, &metrics)?,
        mcp_tools: parse_json(7, &tools)?,
        owner_id: row.get(8)?,
        created_at: parse_time(9, &created_at)?,
        updated_at: parse_time(10, &updated_at)?,
    })
}

impl Database {
    /// Create a new agent in `inactive` status
    pub fn create_agent(&self, params: CreateAgent) -> Result<Agent> {
        let mut agent = Agent::new(
            params.name,
            params.config.unwrap_or_else(|| Value::Object(Default::default())),
        );
        agent.description = params.description;
        agent.mcp_tools = params.mcp_tools.unwrap_or_default();
        agent.owner_id = params.owner_id;

        self.insert_agent(&agent)
            .context("Failed to create agent")?;
        tracing::info!(agent_id = %agent.id, name = %agent.name, "Created agent");
        Ok(agent)
    }

    /// Get an agent by ID
    pub fn get_agent(&self, id: &str) -> Result<Option<Agent>> {
        let conn = self.conn()?;
        let agent = conn
            .query_row(
                &format!("SELECT {} FROM agents WHERE id = ?1", AGENT_COLUMNS),
                [id],
                agent_from_row,
            )
            .optional()
            .with_context(|| format!("Failed to load agent {}", id))?;
        Ok(agent)
    }

    /// List agents, oldest first
    pub fn list_agents(&self, limit: Option<u32>, offset: Option<u32>) -> Result<Vec<Agent>> {
        let conn = self.conn()?;
        let limit = limit.unwrap_or(100);
        let offset = offset.unwrap_or(0);

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM agents ORDER BY created_at ASC, id ASC LIMIT ?1 OFFSET ?2",
            AGENT_COLUMNS
        ))?;

        let agents = stmt
            .query_map([limit, offset], agent_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to list agents")?;

        Ok(agents)
    }

    /// Apply a partial update; `None` when the agent doesn't exist
    pub fn update_agent(&self, id: &str, params: UpdateAgent) -> Result<Option<Agent>> {
        let Some(mut agent) = self.get_agent(id)? else {
            return Ok(None);
        };

        if let Some(name) = params.name {
            agent.name = name;
        }
        if let Some(description) = params.description {
            agent.description = Some(description);
        }
        if let Some(config) = params.config {
            agent.config = config;
        }
        if let Some(status) = params.status {
            agent.status = status;
        }
        if let Some(tools) = params.mcp_tools {
            agent.mcp_tools = tools;
        }
        agent.updated_at = Utc::now();

        self.save_agent(&agent)?;
        Ok(Some(agent))
    }

    /// Delete an agent
    pub fn delete_agent(&self, id: &str) -> Result<bool> {
        let conn = self.conn()?;
        let rows = conn
            .execute("DELETE FROM agents WHERE id = ?1", [id])
            .context("Failed to delete agent")?;
        Ok(rows > 0)
    }

    /// Insert or fully replace an agent record
    pub fn save_agent(&self, agent: &Agent) -> Result<()> {
        self.insert_agent(agent)
            .with_context(|| format!("Failed to save agent {}", agent.id))
    }

    fn insert_agent(&self, agent: &Agent) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO agents (id, name, description, config, status, last_executed,
                                performance_metrics, mcp_tools, owner_id, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                description = excluded.description,
                config = excluded.config,
                status = excluded.status,
                last_executed = excluded.last_executed,
                performance_metrics = excluded.performance_metrics,
                mcp_tools = excluded.mcp_tools,
                owner_id = excluded.owner_id,
                updated_at = excluded.updated_at
            "#,
            rusqlite::params![
                agent.id,
                agent.name,
                agent.description,
                serde_json::to_string(&agent.config)?,
                agent.status.to_string(),
                agent.last_executed.map(|t| t.to_rfc3339()),
                serde_json::to_string(&agent.performance_metrics)?,
                serde_json::to_string(&agent.mcp_tools)?,
                agent.owner_id,
                agent.created_at.to_rfc3339(),
                agent.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }
}

#[async_trait]
impl AgentStore for Database {
    async fn get_agent(&self, id: &str) -> Result<Option<Agent>> {
        Database::get_agent(self, id)
    }

    async fn save(&self, agent: &Agent) -> Result<()> {
        self.save_agent(agent)
    }
}
