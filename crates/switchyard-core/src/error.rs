//! Error types for provider operations

use std::path::PathBuf;
use thiserror::Error;

use crate::app::AppId;
use crate::storage::DatabaseError;

/// Result type for provider operations
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Errors that can occur while managing providers
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Provider (or application) does not exist
    #[error("Provider '{id}' not found for {app}")]
    NotFound { app: AppId, id: String },

    /// Current pointer would reference a provider that does not exist
    #[error("Cannot make '{id}' current for {app}: no such provider")]
    InvalidReference { app: AppId, id: String },

    /// Provider is current and must be released before deletion
    #[error("Provider '{id}' is current for {app}; clear it before deleting")]
    CurrentProvider { app: AppId, id: String },

    /// Writing the live configuration failed
    #[error("Failed to update live config for {app}: {message}")]
    ReconciliationFailure { app: AppId, message: String },

    /// Batch sort index update failed
    #[error("Failed to update sort order for {app}: {message}")]
    SortUpdateFailure { app: AppId, message: String },

    /// Environment conflict scan failed
    #[error("Environment check failed: {0}")]
    EnvCheckFailure(String),

    /// Unknown application id
    #[error("Unknown application: {0}")]
    InvalidApp(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Storage error
    #[error("Database error: {0}")]
    Database(String),

    /// File I/O error
    #[error("I/O error for {path}: {message}")]
    Io { path: PathBuf, message: String },

    /// JSON/TOML parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Background task failed to complete
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ProviderError {
    /// Get the error code for CLI/API responses
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NOT_FOUND",
            Self::InvalidReference { .. } => "INVALID_REFERENCE",
            Self::CurrentProvider { .. } => "CURRENT_PROVIDER",
            Self::ReconciliationFailure { .. } => "RECONCILIATION_FAILURE",
            Self::SortUpdateFailure { .. } => "SORT_UPDATE_FAILURE",
            Self::EnvCheckFailure(_) => "ENV_CHECK_FAILURE",
            Self::InvalidApp(_) => "INVALID_APP",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Io { .. } => "IO_ERROR",
            Self::Parse(_) => "PARSE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Build an I/O error tagged with the path it happened on
    pub fn io(path: impl Into<PathBuf>, err: &std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            message: err.to_string(),
        }
    }
}

impl From<rusqlite::Error> for ProviderError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<DatabaseError> for ProviderError {
    fn from(err: DatabaseError) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}
