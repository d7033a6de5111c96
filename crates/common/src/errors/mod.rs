//! Error types for ContractIQ services
//!
//! Provides a comprehensive error handling system with:
//! - Distinct error types for different failure modes
//! - Error codes for caller handling
//! - Retry classification for batch orchestration

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
    ContractNotFound,
    ContractDetailsNotFound,

    // Conflict errors (5xxx)
    Conflict,
    DuplicateContractDetails,

    // Database errors (7xxx)
    DatabaseError,
    ConnectionError,

    // Internal errors (9xxx)
    InternalError,
    ConfigurationError,
    SerializationError,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn as_code(&self) -> u16 {
        match self {
            // Validation (1xxx)
            ErrorCode::ValidationError => 1001,

            // Resources (4xxx)
            ErrorCode::ContractNotFound => 4002,
            ErrorCode::ContractDetailsNotFound => 4003,

            // Conflicts (5xxx)
            ErrorCode::Conflict => 5001,
            ErrorCode::DuplicateContractDetails => 5002,

            // Database (7xxx)
            ErrorCode::DatabaseError => 7001,
            ErrorCode::ConnectionError => 7002,

            // Internal (9xxx)
            ErrorCode::InternalError => 9001,
            ErrorCode::ConfigurationError => 9002,
            ErrorCode::SerializationError => 9003,
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
        field: Option<String>
    },

    // Resource errors
    #[error("Contract not found: {id}")]
    ContractNotFound { id: i32 },

    #[error("Contract details not found for contract {contract_id}")]
    ContractDetailsNotFound { contract_id: i32 },

    // Conflict errors
    #[error("Duplicate resource: {message}")]
    Duplicate { message: String },

    #[error("Contract details already exist for contract {contract_id}")]
    DuplicateContractDetails { contract_id: i32 },

    // Database errors
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Database connection error: {message}")]
    DatabaseConnection { message: String },

    // Internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Generic
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation { .. } => ErrorCode::ValidationError,
            AppError::ContractNotFound { .. } => ErrorCode::ContractNotFound,
            AppError::ContractDetailsNotFound { .. } => ErrorCode::ContractDetailsNotFound,
            AppError::Duplicate { .. } => ErrorCode::Conflict,
            AppError::DuplicateContractDetails { .. } => ErrorCode::DuplicateContractDetails,
            AppError::Database(_) => ErrorCode::DatabaseError,
            AppError::DatabaseConnection { .. } => ErrorCode::ConnectionError,
            AppError::Internal { .. } => ErrorCode::InternalError,
            AppError::Configuration { .. } => ErrorCode::ConfigurationError,
            AppError::Serialization(_) => ErrorCode::SerializationError,
            AppError::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Whether retrying the same write could succeed without operator action
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AppError::DatabaseConnection { .. } | AppError::Database(sea_orm::DbErr::ConnectionAcquire(_))
        )
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal {
            message: err.to_string()
        }
    }
}

impl From<::config::ConfigError> for AppError {
    fn from(err: ::config::ConfigError) -> Self {
        AppError::Configuration {
            message: err.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_mapping() {
        let err = AppError::ContractNotFound { id: 7 };
        assert_eq!(err.code(), ErrorCode::ContractNotFound);
        assert_eq!(err.code().as_code(), 4002);
        assert_eq!(err.to_string(), "Contract not found: 7");
    }

    #[test]
    fn test_validation_error() {
        let err = AppError::Validation {
            message: "Party name is empty".into(),
            field: Some("name".into()),
        };
        assert_eq!(err.code().as_code(), 1001);
        assert!(!err.is_transient());
    }

    #[test]
    fn test_internal_error() {
        let err = AppError::Internal {
            message: "Something went wrong".into()
        };
        assert_eq!(err.code(), ErrorCode::InternalError);
        assert_eq!(err.to_string(), "Internal error: Something went wrong");
    }

    #[test]
    fn test_connection_error_is_transient() {
        let err = AppError::DatabaseConnection { message: "refused".into() };
        assert!(err.is_transient());
    }
}
