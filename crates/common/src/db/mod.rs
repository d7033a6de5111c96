//! Database layer for ContractIQ
//!
//! Provides:
//! - SeaORM entity models
//! - The `ContractStore` persistence gateway
//! - Repository (PostgreSQL) and in-memory implementations
//! - Connection pool management

pub mod models;
mod repository;
mod store;

pub use repository::Repository;
pub use store::{ContractStore, ContractUpdate, MemoryStore, NewContractDetails, NewParty};

use crate::config::DatabaseConfig;
use crate::errors::{AppError, Result};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection};
use std::time::Duration;
use tracing::info;

/// How fresh a read must be
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadConsistency {
    /// Replica lag is acceptable
    Eventual,
    /// Must observe writes made earlier in the same run
    ReadYourWrites,
}

/// Primary and optional replica connections
#[derive(Clone)]
pub struct DbPool {
    /// Primary connection (for writes)
    pub primary: DatabaseConnection,

    /// Read replica connection (optional)
    pub replica: Option<DatabaseConnection>,
}

async fn open(role: &str, url: &str, config: &DatabaseConfig) -> Result<DatabaseConnection> {
    info!(role, "Connecting to database");

    let mut opts = ConnectOptions::new(url);
    opts.max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
        .sqlx_logging(false);

    Database::connect(opts)
        .await
        .map_err(|e| AppError::DatabaseConnection {
            message: format!("{} connection failed: {}", role, e),
        })
}

async fn select_one(role: &str, conn: &DatabaseConnection) -> Result<()> {
    conn.execute_unprepared("SELECT 1")
        .await
        .map(|_| ())
        .map_err(|e| AppError::DatabaseConnection {
            message: format!("{} ping failed: {}", role, e),
        })
}

impl DbPool {
    /// Open the primary and, when `read_url` is set, the replica
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        let primary = open("primary", &config.url, config).await?;
        let replica = match config.read_url.as_deref() {
            Some(read_url) => Some(open("replica", read_url, config).await?),
            None => None,
        };

        Ok(Self { primary, replica })
    }

    /// Connection for a read at the given consistency
    ///
    /// Only eventual reads go to the replica; everything else, and every
    /// read when no replica is configured, hits the primary.
    pub fn reader(&self, consistency: ReadConsistency) -> &DatabaseConnection {
        match (consistency, self.replica.as_ref()) {
            (ReadConsistency::Eventual, Some(replica)) => replica,
            _ => &self.primary,
        }
    }

    /// Connection for writes (always primary)
    pub fn writer(&self) -> &DatabaseConnection {
        &self.primary
    }

    /// Check connectivity of every configured connection
    pub async fn ping(&self) -> Result<()> {
        select_one("primary", &self.primary).await?;
        if let Some(ref replica) = self.replica {
            select_one("replica", replica).await?;
        }
        Ok(())
    }
}
