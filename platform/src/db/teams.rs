//! Team CRUD operations
//!
//! A team groups agent ids under shared orchestration rules and records the
//! state of its last workflow run.

use super::agents::{parse_json, parse_time};
use super::Database;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    /// Agent ids
    pub members: Vec<String>,
    pub owner_id: Option<String>,
    pub orchestration_rules: Value,
    pub last_workflow_execution: Option<DateTime<Utc>>,
    pub workflow_status: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Parameters for creating a new team
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateTeam {
    pub name: String,
    pub description: Option<String>,
    pub members: Option<Vec<String>>,
    pub orchestration_rules: Option<Value>,
    pub last_workflow_execution: Option<DateTime<Utc>>,
    pub workflow_status: Option<String>,
    pub owner_id: Option<String>,
}

/// Parameters for updating a team; absent fields are left alone
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTeam {
    pub name: Option<String>,
    pub description: Option<String>,
    pub members: Option<Vec<String>>,
    pub orchestration_rules: Option<Value>,
    pub last_workflow_execution: Option<DateTime<Utc>>,
    pub workflow_status: Option<String>,
}

const TEAM_COLUMNS: &str = "id, name, description, members, orchestration_rules, \
     workflow_status, last_workflow_execution, owner_id, created_at, updated_at";

fn team_from_row(row: &Row<'_>) -> rusqlite::Result<Team> {
    let members: String = row.get(3)?;
    let rules: String = row.get(4)?;
    let last_execution: Option<String> = row.get(6)?;
    let created_at: String = row.get(8)?;
    let updated_at: String = row.get(9)?;

    Ok(Team {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        members: parse_json(3, &members)?,
        orchestration_rules: parse_json(4, &rules)?,
        workflow_status: row.get(5)?,
        last_workflow_execution: last_execution.as_deref().map(|t| parse_time(6, t)).transpose()?,
        owner_id: row.get(7)?,
        created_at: parse_time(8, &created_at)?,
        updated_at: parse_time(9, &updated_at)?,
    })
}

impl Database {
    pub fn create_team(&self, params: CreateTeam) -> Result<Team> {
        let now = Utc::now();
        let team = Team {
            id: Uuid::new_v4().to_string(),
            name: params.name,
            description: params.description,
            members: params.members.unwrap_or_default(),
            owner_id: params.owner_id,
            orchestration_rules: params
                .orchestration_rules
                .unwrap_or_else(|| Value::Object(Default::default())),
            last_workflow_execution: params.last_workflow_execution,
            workflow_status: params.workflow_status,
            created_at: now,
            updated_at: now,
        };

        self.write_team(&team).context("Failed to create team")?;
        tracing::info!(team_id = %team.id, name = %team.name, "Created team");
        Ok(team)
    }

    pub fn get_team(&self, id: &str) -> Result<Option<Team>> {
        let conn = self.conn()?;
        let team = conn
            .query_row(
                &format!("SELECT {} FROM teams WHERE id = ?1", TEAM_COLUMNS),
                [id],
                team_from_row,
            )
            .optional()
            .with_context(|| format!("Failed to load team {}", id))?;
        Ok(team)
    }

    /// List teams, oldest first
    pub fn list_teams(&self, limit: Option<u32>, offset: Option<u32>) -> Result<Vec<Team>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM teams ORDER BY created_at ASC, id ASC LIMIT ?1 OFFSET ?2",
            TEAM_COLUMNS
        ))?;

        let teams = stmt
            .query_map([limit.unwrap_or(100), offset.unwrap_or(0)], team_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to list teams")?;

        Ok(teams)
    }

    /// Apply a partial update; `None` when the team doesn't exist
    pub fn update_team(&self, id: &str, params: UpdateTeam) -> Result<Option<Team>> {
        let Some(mut team) = self.get_team(id)? else {
            return Ok(None);
        };

        if let Some(name) = params.name {
            team.name = name;
        }
        if let Some(description) = params.description {
            team.description = Some(description);
        }
        if let Some(members) = params.members {
            team.members = members;
        }
        if let Some(rules) = params.orchestration_rules {
            team.orchestration_rules = rules;
        }
        if let Some(at) = params.last_workflow_execution {
            team.last_workflow_execution = Some(at);
        }
        if let Some(status) = params.workflow_status {
            team.workflow_status = Some(status);
        }
        team.updated_at = Utc::now();

        self.write_team(&team)
            .with_context(|| format!("Failed to update team {}", id))?;
        tracing::info!(team_id = %team.id, name = %team.name, "Updated team");
        Ok(Some(team))
    }

    pub fn delete_team(&self, id: &str) -> Result<bool> {
        let conn = self.conn()?;
        let rows = conn
            .execute("DELETE FROM teams WHERE id = ?1", [id])
            .context("Failed to delete team")?;
        if rows > 0 {
            tracing::info!(team_id = %id, "Deleted team");
        }
        Ok(rows > 0)
    }

    fn write_team(&self, team: &Team) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO teams (id, name, description, members, orchestration_rules,
                               workflow_status, last_workflow_execution, owner_id,
                               created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                description = excluded.description,
                members = excluded.members,
                orchestration_rules = excluded.orchestration_rules,
                workflow_status = excluded.workflow_status,
                last_workflow_execution = excluded.last_workflow_execution,
                owner_id = excluded.owner_id,
                updated_at = excluded.updated_at
            "#,
            rusqlite::params![
                team.id,
                team.name,
                team.description,
                serde_json::to_string(&team.members)?,
                serde_json::to_string(&team.orchestration_rules)?,
                team.workflow_status,
                team.last_workflow_execution.map(|t| t.to_rfc3339()),
                team.owner_id,
                team.created_at.to_rfc3339(),
                team.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }
}
