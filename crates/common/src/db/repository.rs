//! Repository pattern for database operations
//!
//! Implements the extraction core's persistence gateway over
//! PostgreSQL through SeaORM.

use crate::db::models::*;
use crate::db::store::{ContractStore, ContractUpdate, NewContractDetails, NewParty};
use crate::db::{DbPool, ReadConsistency};
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    SqlErr,
};
use tracing::debug;

/// Repository for data access operations
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Connection for reads that tolerate replica lag
    fn read_conn(&self) -> &DatabaseConnection {
        self.pool.reader(ReadConsistency::Eventual)
    }

    /// Connection for reads that feed a write decision in the same run
    fn fresh_conn(&self) -> &DatabaseConnection {
        self.pool.reader(ReadConsistency::ReadYourWrites)
    }

    /// Get the write connection
    fn write_conn(&self) -> &DatabaseConnection {
        self.pool.writer()
    }

    // ========================================================================
    // Health Check
    // ========================================================================

    /// Ping the database
    pub async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }

    // ========================================================================
    // Contract Operations
    // ========================================================================

    /// Find contract by ID
    pub async fn find_contract_by_id(&self, id: i32) -> Result<Option<Contract>> {
        ContractEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }
}

fn apply_details(model: &mut ContractDetailsActiveModel, data: NewContractDetails) {
    model.executed_status = Set(data.executed_status);
    model.language = Set(data.language);
    model.internal_parties = Set(serde_json::json!(data.internal_parties));
    model.counterparties = Set(serde_json::json!(data.counterparties));
    model.governing_law = Set(data.governing_law);
    model.payment_term = Set(data.payment_term);
    model.breach_notice = Set(data.breach_notice);
    model.termination_notice = Set(data.termination_notice);
    model.extracted_text = Set(data.extracted_text);
    model.extraction_metadata = Set(data.extraction_metadata);
    model.updated_at = Set(chrono::Utc::now().into());
}

#[async_trait]
impl ContractStore for Repository {
    async fn get_contract_details(&self, contract_id: i32) -> Result<Option<ContractDetails>> {
        ContractDetailsEntity::find()
            .filter(ContractDetailsColumn::ContractId.eq(contract_id))
            .one(self.fresh_conn())
            .await
            .map_err(Into::into)
    }

    async fn create_contract_details(&self, data: NewContractDetails) -> Result<ContractDetails> {
        let now = chrono::Utc::now();

        let mut details = ContractDetailsActiveModel {
            contract_id: Set(data.contract_id),
            created_at: Set(now.into()),
            ..Default::default()
        };
        let contract_id = data.contract_id;
        apply_details(&mut details, data);

        details.insert(self.write_conn()).await.map_err(|e| match e.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => {
                AppError::DuplicateContractDetails { contract_id }
            }
            _ => e.into(),
        })
    }

    async fn update_contract_details(
        &self,
        contract_id: i32,
        data: NewContractDetails,
    ) -> Result<ContractDetails> {
        let mut details: ContractDetailsActiveModel = ContractDetailsEntity::find()
            .filter(ContractDetailsColumn::ContractId.eq(contract_id))
            .one(self.fresh_conn())
            .await?
            .ok_or(AppError::ContractDetailsNotFound { contract_id })?
            .into();

        apply_details(&mut details, data);

        details.update(self.write_conn()).await.map_err(Into::into)
    }

    async fn update_contract(&self, contract_id: i32, update: ContractUpdate) -> Result<()> {
        if update.is_empty() {
            return Ok(());
        }

        let mut contract: ContractActiveModel = ContractEntity::find_by_id(contract_id)
            .one(self.fresh_conn())
            .await?
            .ok_or(AppError::ContractNotFound { id: contract_id })?
            .into();

        if let Some(contract_type) = update.contract_type {
            contract.contract_type = Set(Some(contract_type));
        }

        if let Some(status) = update.extraction_status {
            contract.extraction_status = Set(Some(status.into()));
        }

        contract.updated_at = Set(chrono::Utc::now().into());
        contract.update(self.write_conn()).await?;

        debug!(contract_id, "Contract updated");
        Ok(())
    }

    async fn create_party(&self, data: NewParty) -> Result<Party> {
        data.validate()?;

        let (registration_number, registration_type) = match data.registration {
            Some(reg) => (Some(reg.number), Some(String::from(reg.kind))),
            None => (None, None),
        };

        let party = PartyActiveModel {
            user_id: Set(data.user_id),
            name: Set(data.name),
            name_ar: Set(data.name_ar),
            party_type: Set(data.party_type.into()),
            registration_number: Set(registration_number),
            registration_type: Set(registration_type),
            email: Set(data.email),
            phone: Set(data.phone),
            address: Set(data.address),
            address_ar: Set(data.address_ar),
            source_contract_id: Set(data.source_contract_id),
            is_highlighted: Set(data.is_highlighted),
            created_at: Set(chrono::Utc::now().into()),
            ..Default::default()
        };

        party.insert(self.write_conn()).await.map_err(Into::into)
    }

    async fn find_parties_by_contract(&self, contract_id: i32) -> Result<Vec<Party>> {
        PartyEntity::find()
            .filter(PartyColumn::SourceContractId.eq(contract_id))
            .order_by_asc(PartyColumn::Id)
            .all(self.fresh_conn())
            .await
            .map_err(Into::into)
    }

    async fn list_contracts_for_processing(&self) -> Result<Vec<Contract>> {
        ContractEntity::find()
            .filter(ContractColumn::FilePath.is_not_null())
            .order_by_asc(ContractColumn::Id)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }
}
