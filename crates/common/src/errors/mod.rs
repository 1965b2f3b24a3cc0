//! Error types for ragsync services
//!
//! Provides the failure taxonomy shared by every component:
//! - Distinct error types for the different failure modes
//! - Machine-readable error kinds for structured results
//! - A rule for which failures may be retried

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Machine-readable error kinds for structured failure results
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Malformed or missing secret/config; fatal, never retried
    Configuration,
    /// Invalid table name or payload; fails fast before any mutation
    Validation,
    /// Connection build or health-check failure; retried with backoff
    TransientConnection,
    /// Failure during delete/insert/commit; rolled back before propagating
    Transaction,
    /// Anything uncategorized; surfaced as an internal failure
    Unexpected,
}

impl ErrorKind {
    /// Stable string tag for log fields and failure reports
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Configuration => "CONFIGURATION_ERROR",
            ErrorKind::Validation => "VALIDATION_ERROR",
            ErrorKind::TransientConnection => "TRANSIENT_CONNECTION_ERROR",
            ErrorKind::Transaction => "TRANSACTION_ERROR",
            ErrorKind::Unexpected => "UNEXPECTED_ERROR",
        }
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    #[error("Transient connection failure: {message}")]
    TransientConnection { message: String },

    #[error("Transaction failed: {message}")]
    Transaction { message: String },

    #[error("Unexpected error: {0}")]
    Unexpected(#[from] anyhow::Error),
}

impl AppError {
    /// Configuration failure (bad secret material, missing settings)
    pub fn configuration(message: impl Into<String>) -> Self {
        AppError::Configuration {
            message: message.into(),
        }
    }

    /// Validation failure without a specific field
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation {
            message: message.into(),
            field: None,
        }
    }

    /// Validation failure attributed to a payload field
    pub fn validation_field(message: impl Into<String>, field: impl Into<String>) -> Self {
        AppError::Validation {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Connection-layer failure eligible for retry
    pub fn transient(err: impl std::fmt::Display) -> Self {
        AppError::TransientConnection {
            message: err.to_string(),
        }
    }

    /// Failure inside an open transaction
    pub fn transaction(err: impl std::fmt::Display) -> Self {
        AppError::Transaction {
            message: err.to_string(),
        }
    }

    /// Get the error kind for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Configuration { .. } => ErrorKind::Configuration,
            AppError::Validation { .. } => ErrorKind::Validation,
            AppError::TransientConnection { .. } => ErrorKind::TransientConnection,
            AppError::Transaction { .. } => ErrorKind::Transaction,
            AppError::Unexpected(_) => ErrorKind::Unexpected,
        }
    }

    /// Only transient connection failures may be retried; validation and
    /// configuration errors never self-heal, and transaction errors are the
    /// invoker's responsibility once rolled back.
    pub fn is_transient(&self) -> bool {
        matches!(self, AppError::TransientConnection { .. })
    }
}

/// Structured failure result mirroring the success report shape
#[derive(Debug, Serialize, Deserialize)]
pub struct FailureReport {
    pub status: String,
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&AppError> for FailureReport {
    fn from(err: &AppError) -> Self {
        FailureReport {
            status: "error".to_string(),
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}
