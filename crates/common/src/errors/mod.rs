//! Error types for DocForge components
//!
//! Provides a shared error type with:
//! - Distinct variants for different failure modes
//! - Numeric error codes for machine handling
//!
//! Query-time "nothing found" outcomes are not errors and never pass through
//! this type; only infrastructure faults do.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Error codes for machine-readable error identification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors (1xxx)
    ValidationError,

    // Resource errors (4xxx)
    DocumentNotFound,

    // Store errors (7xxx)
    StoreError,
    StorePoisoned,

    // Internal errors (9xxx)
    ConfigurationError,
    SerializationError,
    IoError,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn as_code(&self) -> u16 {
        match self {
            // Validation (1xxx)
            ErrorCode::ValidationError => 1001,

            // Resources (4xxx)
            ErrorCode::DocumentNotFound => 4002,

            // Store (7xxx)
            ErrorCode::StoreError => 7001,
            ErrorCode::StorePoisoned => 7004,

            // Internal (9xxx)
            ErrorCode::ConfigurationError => 9002,
            ErrorCode::SerializationError => 9003,
            ErrorCode::IoError => 9004,
        }
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    // Resource errors
    #[error("Document not found: {id}")]
    DocumentNotFound { id: String },

    // Store errors
    #[error("Chunk store error: {message}")]
    Store { message: String },

    #[error("Chunk store lock poisoned")]
    StorePoisoned,

    // Internal errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation { .. } => ErrorCode::ValidationError,
            AppError::DocumentNotFound { .. } => ErrorCode::DocumentNotFound,
            AppError::Store { .. } => ErrorCode::StoreError,
            AppError::StorePoisoned => ErrorCode::StorePoisoned,
            AppError::Configuration { .. } => ErrorCode::ConfigurationError,
            AppError::Serialization(_) => ErrorCode::SerializationError,
            AppError::Io(_) => ErrorCode::IoError,
        }
    }

    /// Whether the caller supplied bad input (as opposed to an infrastructure fault)
    pub fn is_client_error(&self) -> bool {
        matches!(self.code().as_code(), 1000..=4999)
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Configuration {
            message: err.to_string(),
        }
    }
}
