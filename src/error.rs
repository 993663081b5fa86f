//! Error types
//!
//! `ImportError` is returned by everything that computes or executes an import.
//! `StorageError` covers reading deposit content and sidecar files.

use thiserror::Error;

/// Storage-level failures (deposit store, sidecar index, fixtures)
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

/// Reasons a slug is rejected
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SlugValidationError {
    #[error("slug is required and cannot be empty")]
    Required,

    #[error("slug must be between 1 and {max_length} characters")]
    TooLong { max_length: usize },

    #[error("slug can only contain lowercase letters, digits, '.', '_' and '-'")]
    InvalidFormat,
}

/// Import computation and execution errors
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Validation failed for {path}: {message}")]
    Validation { path: String, message: String },

    #[error("Invalid slug '{slug}' at {path}: {reason}")]
    InvalidSlug {
        path: String,
        slug: String,
        reason: SlugValidationError,
    },

    #[error("No digest available for {path}")]
    MissingDigest { path: String },

    #[error("Digest conflict for {path}: deposit has {deposit_digest}, METS has {mets_digest}")]
    DigestConflict {
        path: String,
        deposit_digest: String,
        mets_digest: String,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Path is not available for a new archival group: {0}")]
    PathUnavailable(String),

    #[error("Version conflict: expected {expected}, supplied {supplied}")]
    VersionConflict { expected: String, supplied: String },

    #[error("Deposit {0} already has an active job")]
    JobAlreadyActive(String),

    #[error("Internal invariant violated: {0}")]
    Invariant(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Job queue is closed")]
    QueueClosed,

    #[error("Repository error: {0}")]
    Repository(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl ImportError {
    /// True for failures the depositor can fix by changing the deposit.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ImportError::Validation { .. }
                | ImportError::InvalidSlug { .. }
                | ImportError::MissingDigest { .. }
                | ImportError::DigestConflict { .. }
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ImportError::NotFound(_))
    }

    pub(crate) fn validation(path: impl Into<String>, message: impl Into<String>) -> Self {
        ImportError::Validation {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl From<config::ConfigError> for ImportError {
    fn from(err: config::ConfigError) -> Self {
        ImportError::ConfigError(err.to_string())
    }
}
