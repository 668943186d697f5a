//! Error types for the orchestration core

use crate::llm::BackendKind;

/// Errors raised by the orchestration core.
///
/// Lookup failures (`NotFound`, `VersionNotFound`) and malformed input are
/// caller mistakes and propagate. Backend failures are caught by the
/// workflow executor and turned into per-agent results.
#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("Version {version} not found for prompt {id}")]
    VersionNotFound { id: String, version: String },

    #[error("Unsupported LLM type: {0}")]
    UnsupportedBackend(String),

    #[error("Backend {0} is not configured or failed to initialize")]
    BackendUnavailable(BackendKind),

    #[error("Backend {backend} failed: {message}")]
    BackendError { backend: BackendKind, message: String },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Backup error: {0}")]
    Backup(String),

    #[error("Storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

impl PlatformError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Short machine-readable label for the error variant
    pub fn label(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::VersionNotFound { .. } => "version_not_found",
            Self::UnsupportedBackend(_) => "unsupported_backend",
            Self::BackendUnavailable(_) => "backend_unavailable",
            Self::BackendError { .. } => "backend_error",
            Self::InvalidRequest(_) => "invalid_request",
            Self::Backup(_) => "backup_error",
            Self::Storage(_) => "storage_error",
        }
    }
}

pub type Result<T> = std::result::Result<T, PlatformError>;
