//! Ingestion service error types

use contractiq_common::errors::AppError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestionError {
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Unsupported document format for {path}: {message}")]
    UnsupportedFormat { path: String, message: String },

    #[error("Failed to start {extractor} for {path}: {message}")]
    ExtractorSpawn {
        extractor: String,
        path: String,
        message: String,
    },

    #[error("{extractor} failed for {path} (exit status {status:?}): {stderr}")]
    ExtractorFailed {
        extractor: String,
        path: String,
        status: Option<i32>,
        stderr: String,
    },

    #[error("{extractor} timed out after {timeout_ms}ms for {path}")]
    ExtractorTimeout {
        extractor: String,
        path: String,
        timeout_ms: u64,
    },

    #[error("Database error: {0}")]
    DatabaseError(#[from] AppError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Extraction task failed: {0}")]
    TaskError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl IngestionError {
    /// Text could not be obtained from the document. Retrying without
    /// fixing the file or the extractor tool will fail the same way.
    pub fn is_acquisition_failure(&self) -> bool {
        matches!(
            self,
            IngestionError::FileNotFound(_)
                | IngestionError::UnsupportedFormat { .. }
                | IngestionError::ExtractorSpawn { .. }
                | IngestionError::ExtractorFailed { .. }
                | IngestionError::ExtractorTimeout { .. }
        )
    }

    /// A later attempt may succeed without touching the document
    pub fn is_retryable(&self) -> bool {
        match self {
            IngestionError::DatabaseError(e) => e.is_transient(),
            _ => false,
        }
    }

    /// Short label for metrics
    pub fn reason(&self) -> &'static str {
        match self {
            IngestionError::FileNotFound(_) => "file_not_found",
            IngestionError::UnsupportedFormat { .. } => "unsupported_format",
            IngestionError::ExtractorSpawn { .. } => "extractor_spawn",
            IngestionError::ExtractorFailed { .. } => "extractor_failed",
            IngestionError::ExtractorTimeout { .. } => "timeout",
            IngestionError::DatabaseError(_) => "database",
            IngestionError::ConfigError(_) => "config",
            IngestionError::TaskError(_) => "task",
            IngestionError::IoError(_) => "io",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquisition_failures_classified() {
        let timeout = IngestionError::ExtractorTimeout {
            extractor: "pdftotext".into(),
            path: "a.pdf".into(),
            timeout_ms: 45_000,
        };
        assert!(timeout.is_acquisition_failure());
        assert_eq!(timeout.reason(), "timeout");
        assert!(!timeout.is_retryable());

        let db = IngestionError::from(AppError::DatabaseConnection {
            message: "connection refused".into(),
        });
        assert!(!db.is_acquisition_failure());
        assert!(db.is_retryable());

        let conflict = IngestionError::from(AppError::Duplicate {
            message: "party exists".into(),
        });
        assert!(!conflict.is_retryable());
    }

    #[test]
    fn test_failed_extractor_message_carries_stderr() {
        let err = IngestionError::ExtractorFailed {
            extractor: "pdftotext".into(),
            path: "broken.pdf".into(),
            status: Some(1),
            stderr: "Syntax Error: Couldn't find trailer dictionary".into(),
        };
        let message = err.to_string();
        assert!(message.contains("broken.pdf"));
        assert!(message.contains("trailer dictionary"));
    }
}
