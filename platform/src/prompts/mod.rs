//! Versioned prompt templates
//!
//! In-memory only; durability comes from JSON backups.

mod backup;
mod store;

pub use backup::BackupDocument;
pub use store::{
    AuditAction, AuditEntry, CreatePrompt, Prompt, PromptStore, UpdatePrompt, DEFAULT_VERSION,
};
