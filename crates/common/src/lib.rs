//! ContractIQ Common Library
//!
//! Shared code for the contract extraction services including:
//! - Database models and the persistence gateway
//! - Error types and handling
//! - Configuration management
//! - Metrics and observability

pub mod config;
pub mod db;
pub mod errors;
pub mod metrics;

// Re-export commonly used types
pub use errors::{AppError, Result};
pub use config::AppConfig;
pub use db::{ContractStore, MemoryStore, Repository};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
