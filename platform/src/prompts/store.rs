//! In-memory prompt store with version history and audit trail

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{PlatformError, Result};

pub const DEFAULT_VERSION: &str = "1.0";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditAction {
    Create,
    Update,
    Rollback,
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditAction::Create => write!(f, "create"),
            AuditAction::Update => write!(f, "update"),
            AuditAction::Rollback => write!(f, "rollback"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub action: AuditAction,
    pub timestamp: DateTime<Utc>,
    /// Version the prompt carries after the action
    pub version: String,
    /// Version the prompt carried before a rollback
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_version: Option<String>,
}

impl AuditEntry {
    fn new(action: AuditAction, version: &str) -> Self {
        Self {
            action,
            timestamp: Utc::now(),
            version: version.to_string(),
            original_version: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prompt {
    pub id: String,
    pub body: String,
    pub version: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub audit_log: Vec<AuditEntry>,
}

/// Input for [`PromptStore::create`]
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreatePrompt {
    pub body: String,
    pub version: Option<String>,
    pub tags: Option<Vec<String>>,
    pub owner_id: Option<String>,
}

impl CreatePrompt {
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            ..Default::default()
        }
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }
}

/// Partial update; `None` leaves the field as is
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePrompt {
    pub body: Option<String>,
    pub version: Option<String>,
    pub tags: Option<Vec<String>>,
}

/// Versioned prompt templates.
///
/// Every create and update appends one audit entry and one full snapshot to
/// the prompt's history. Rollback appends an audit entry only.
#[derive(Debug, Default)]
pub struct PromptStore {
    pub(super) prompts: BTreeMap<String, Prompt>,
    pub(super) history: BTreeMap<String, Vec<Prompt>>,
    pub(super) backup_dir: Option<PathBuf>,
}

impl PromptStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Default directory for backups written without an explicit path
    pub fn with_backup_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.backup_dir = Some(dir.into());
        self
    }

    pub fn create(&mut self, input: CreatePrompt) -> Prompt {
        let now = Utc::now();
        let version = input.version.unwrap_or_else(|| DEFAULT_VERSION.to_string());

        let prompt = Prompt {
            id: Uuid::new_v4().to_string(),
            body: input.body,
            audit_log: vec![AuditEntry::new(AuditAction::Create, &version)],
            version,
            tags: input.tags.unwrap_or_default(),
            owner_id: input.owner_id,
            created_at: now,
            updated_at: now,
        };

        self.history.insert(prompt.id.clone(), vec![prompt.clone()]);
        self.prompts.insert(prompt.id.clone(), prompt.clone());

        tracing::info!(prompt_id = %prompt.id, version = %prompt.version, "Created prompt");
        prompt
    }

    pub fn get(&self, id: &str) -> Option<&Prompt> {
        self.prompts.get(id)
    }

    pub fn update(&mut self, id: &str, changes: UpdatePrompt) -> Result<Prompt> {
        let prompt = self
            .prompts
            .get_mut(id)
            .ok_or_else(|| PlatformError::not_found("Prompt", id))?;

        if let Some(body) = changes.body {
            prompt.body = body;
        }
        if let Some(version) = changes.version {
            prompt.version = version;
        }
        if let Some(tags) = changes.tags {
            prompt.tags = tags;
        }
        prompt.updated_at = Utc::now();

        let entry = AuditEntry::new(AuditAction::Update, &prompt.version);
        prompt.audit_log.push(entry);

        let snapshot = prompt.clone();
        self.history.entry(id.to_string()).or_default().push(snapshot.clone());

        tracing::info!(prompt_id = %id, version = %snapshot.version, "Updated prompt");
        Ok(snapshot)
    }

    /// Drop a prompt together with its history
    pub fn delete(&mut self, id: &str) -> bool {
        let existed = self.prompts.remove(id).is_some();
        self.history.remove(id);
        if existed {
            tracing::info!(prompt_id = %id, "Deleted prompt");
        }
        existed
    }

    /// Snapshots oldest first; empty for unknown ids
    pub fn get_versions(&self, id: &str) -> &[Prompt] {
        self.history.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// First snapshot carrying `version`
    pub fn get_version(&self, id: &str, version: &str) -> Result<&Prompt> {
        let versions = self
            .history
            .get(id)
            .ok_or_else(|| PlatformError::not_found("Prompt", id))?;

        versions
            .iter()
            .find(|p| p.version == version)
            .ok_or_else(|| PlatformError::VersionNotFound {
                id: id.to_string(),
                version: version.to_string(),
            })
    }

    /// Restore body, version and tags from the first snapshot labelled
    /// `version`. Identity, creation time and audit trail are kept.
    pub fn rollback(&mut self, id: &str, version: &str) -> Result<Prompt> {
        let target = self.get_version(id, version)?.clone();

        let prompt = self
            .prompts
            .get_mut(id)
            .ok_or_else(|| PlatformError::not_found("Prompt", id))?;

        let previous = std::mem::replace(&mut prompt.version, target.version);
        prompt.body = target.body;
        prompt.tags = target.tags;
        prompt.updated_at = Utc::now();
        prompt.audit_log.push(AuditEntry {
            original_version: Some(previous.clone()),
            ..AuditEntry::new(AuditAction::Rollback, version)
        });

        tracing::info!(
            prompt_id = %id,
            from = %previous,
            to = %version,
            "Rolled back prompt"
        );
        Ok(prompt.clone())
    }

    /// Tags match when any is shared; otherwise `query` matches the body
    /// case-insensitively; otherwise everything matches.
    pub fn search(&self, tags: Option<&[String]>, query: Option<&str>) -> Vec<Prompt> {
        let tags = tags.filter(|t| !t.is_empty());
        let query = query
            .filter(|q| !q.is_empty())
            .map(|q| q.to_lowercase());

        let mut results: Vec<Prompt> = self
            .prompts
            .values()
            .filter(|prompt| match (tags, &query) {
                (Some(tags), _) => tags.iter().any(|t| prompt.tags.contains(t)),
                (None, Some(q)) => prompt.body.to_lowercase().contains(q),
                (None, None) => true,
            })
            .cloned()
            .collect();

        results.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        results
    }

    pub fn list(&self) -> Vec<Prompt> {
        self.search(None, None)
    }

    pub fn len(&self) -> usize {
        self.prompts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prompts.is_empty()
    }
}
