//! JSON backup and restore for the prompt store

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::store::{Prompt, PromptStore};
use crate::error::{PlatformError, Result};

/// On-disk layout of a backup file
#[derive(Debug, Serialize, Deserialize)]
pub struct BackupDocument {
    #[serde(default)]
    pub prompts: BTreeMap<String, Prompt>,
    #[serde(default)]
    pub version_history: BTreeMap<String, Vec<Prompt>>,
    pub backup_timestamp: DateTime<Utc>,
}

fn backup_error(action: &str, path: &Path, err: impl std::fmt::Display) -> PlatformError {
    PlatformError::Backup(format!("{} {}: {}", action, path.display(), err))
}

impl PromptStore {
    /// Write every prompt and its history to `path`, or to a timestamped
    /// file in the backup directory. Returns the written path.
    pub fn backup(&self, path: Option<&Path>) -> Result<PathBuf> {
        let now = Utc::now();
        let target = match path {
            Some(path) => path.to_path_buf(),
            None => {
                let name = format!("prompts_backup_{}.json", now.format("%Y%m%d_%H%M%S"));
                match &self.backup_dir {
                    Some(dir) => dir.join(name),
                    None => PathBuf::from(name),
                }
            }
        };

        let document = BackupDocument {
            prompts: self.prompts.clone(),
            version_history: self.history.clone(),
            backup_timestamp: now,
        };
        let json = serde_json::to_string_pretty(&document)
            .map_err(|e| backup_error("Failed to serialize", &target, e))?;

        if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| backup_error("Failed to create directory for", &target, e))?;
        }

        // Readers never observe a half-written backup. The staging name is
        // unique per call so concurrent backups to one target never collide.
        let staging = target.with_extension(format!("json.{}.tmp", Uuid::new_v4().simple()));
        std::fs::write(&staging, json).map_err(|e| backup_error("Failed to write", &staging, e))?;
        std::fs::rename(&staging, &target)
            .map_err(|e| backup_error("Failed to move backup into", &target, e))?;

        tracing::info!(
            path = %target.display(),
            prompts = document.prompts.len(),
            "Backed up prompts"
        );
        Ok(target)
    }

    /// Replace the whole store with the contents of a backup file.
    ///
    /// The file is fully parsed first; on any error the store is untouched.
    /// Returns the number of prompts restored.
    pub fn restore(&mut self, path: &Path) -> Result<usize> {
        let content =
            std::fs::read_to_string(path).map_err(|e| backup_error("Failed to read", path, e))?;
        let document: BackupDocument =
            serde_json::from_str(&content).map_err(|e| backup_error("Failed to parse", path, e))?;

        if let Some(id) = document
            .prompts
            .keys()
            .find(|id| document.version_history.get(*id).map_or(true, Vec::is_empty))
        {
            return Err(backup_error(
                "Missing version history for prompt",
                path,
                format!("prompt {} has no snapshots", id),
            ));
        }

        let count = document.prompts.len();
        self.prompts = document.prompts;
        self.history = document.version_history;

        tracing::info!(
            path = %path.display(),
            prompts = count,
            taken_at = %document.backup_timestamp,
            "Restored prompts"
        );
        Ok(count)
    }
}
