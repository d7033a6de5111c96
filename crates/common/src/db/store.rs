//! Persistence gateway for the extraction core
//!
//! `ContractStore` is the narrow read/write surface the extraction
//! pipeline needs. `Repository` implements it over PostgreSQL;
//! `MemoryStore` keeps everything in process for tests and dry runs.

use crate::db::models::*;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use tokio::sync::RwLock;

/// Field values written to a contract's details row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewContractDetails {
    pub contract_id: i32,
    pub executed_status: bool,
    pub language: String,
    pub internal_parties: Vec<String>,
    pub counterparties: Vec<String>,
    pub governing_law: Option<String>,
    pub payment_term: Option<String>,
    pub breach_notice: Option<String>,
    pub termination_notice: Option<String>,
    pub extracted_text: String,
    pub extraction_metadata: serde_json::Value,
}

/// Partial update of the parent contract
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractUpdate {
    pub contract_type: Option<String>,
    pub extraction_status: Option<ExtractionStatus>,
}

impl ContractUpdate {
    pub fn is_empty(&self) -> bool {
        self.contract_type.is_none() && self.extraction_status.is_none()
    }
}

/// A party to insert
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewParty {
    pub user_id: i32,
    pub name: String,
    pub name_ar: Option<String>,
    pub party_type: PartyType,
    pub registration: Option<Registration>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub address_ar: Option<String>,
    pub source_contract_id: Option<i32>,
    pub is_highlighted: bool,
}

impl NewParty {
    /// Enforce the stored-party invariants before any write
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(AppError::Validation {
                message: "party name must not be empty".to_string(),
                field: Some("name".to_string()),
            });
        }
        Ok(())
    }
}

/// Storage operations used by the extraction pipeline
#[async_trait]
pub trait ContractStore: Send + Sync {
    /// Details row for a contract, if one exists
    async fn get_contract_details(&self, contract_id: i32) -> Result<Option<ContractDetails>>;

    /// Insert the details row for a contract that has none yet
    async fn create_contract_details(&self, data: NewContractDetails) -> Result<ContractDetails>;

    /// Overwrite the existing details row in place
    async fn update_contract_details(
        &self,
        contract_id: i32,
        data: NewContractDetails,
    ) -> Result<ContractDetails>;

    /// Apply a partial update to the parent contract
    async fn update_contract(&self, contract_id: i32, update: ContractUpdate) -> Result<()>;

    /// Insert one party row
    async fn create_party(&self, data: NewParty) -> Result<Party>;

    /// Parties previously extracted from a contract
    async fn find_parties_by_contract(&self, contract_id: i32) -> Result<Vec<Party>>;

    /// Contracts with an uploaded file, in id order
    async fn list_contracts_for_processing(&self) -> Result<Vec<Contract>>;
}

#[derive(Default)]
struct MemoryState {
    contracts: BTreeMap<i32, Contract>,
    details: BTreeMap<i32, ContractDetails>,
    parties: Vec<Party>,
    next_contract_id: i32,
    next_details_id: i32,
    next_party_id: i32,
    rejected_party_names: HashSet<String>,
}

/// In-process store with the same invariants as the database schema
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a contract row
    pub async fn insert_contract(
        &self,
        user_id: i32,
        title: &str,
        file_path: Option<String>,
    ) -> Contract {
        let mut state = self.state.write().await;
        state.next_contract_id += 1;
        let now = chrono::Utc::now();
        let contract = Contract {
            id: state.next_contract_id,
            user_id,
            title: title.to_string(),
            file_path,
            contract_type: None,
            extraction_status: None,
            created_at: now.into(),
            updated_at: now.into(),
        };
        state.contracts.insert(contract.id, contract.clone());
        contract
    }

    /// Make `create_party` fail for this name, to exercise write failures
    pub async fn reject_party_name(&self, name: &str) {
        self.state
            .write()
            .await
            .rejected_party_names
            .insert(name.to_string());
    }

    pub async fn contract(&self, id: i32) -> Option<Contract> {
        self.state.read().await.contracts.get(&id).cloned()
    }

    pub async fn contract_details_count(&self) -> usize {
        self.state.read().await.details.len()
    }

    pub async fn parties(&self) -> Vec<Party> {
        self.state.read().await.parties.clone()
    }
}

fn details_model(id: i32, data: NewContractDetails, created_at: DateTimeWithTimeZone) -> ContractDetails {
    ContractDetails {
        id,
        contract_id: data.contract_id,
        executed_status: data.executed_status,
        language: data.language,
        internal_parties: serde_json::json!(data.internal_parties),
        counterparties: serde_json::json!(data.counterparties),
        governing_law: data.governing_law,
        payment_term: data.payment_term,
        breach_notice: data.breach_notice,
        termination_notice: data.termination_notice,
        extracted_text: data.extracted_text,
        extraction_metadata: data.extraction_metadata,
        created_at,
        updated_at: chrono::Utc::now().into(),
    }
}

#[async_trait]
impl ContractStore for MemoryStore {
    async fn get_contract_details(&self, contract_id: i32) -> Result<Option<ContractDetails>> {
        Ok(self.state.read().await.details.get(&contract_id).cloned())
    }

    async fn create_contract_details(&self, data: NewContractDetails) -> Result<ContractDetails> {
        let mut state = self.state.write().await;
        if state.details.contains_key(&data.contract_id) {
            return Err(AppError::DuplicateContractDetails {
                contract_id: data.contract_id,
            });
        }
        state.next_details_id += 1;
        let contract_id = data.contract_id;
        let row = details_model(state.next_details_id, data, chrono::Utc::now().into());
        state.details.insert(contract_id, row.clone());
        Ok(row)
    }

    async fn update_contract_details(
        &self,
        contract_id: i32,
        mut data: NewContractDetails,
    ) -> Result<ContractDetails> {
        let mut state = self.state.write().await;
        let existing = state
            .details
            .get(&contract_id)
            .ok_or(AppError::ContractDetailsNotFound { contract_id })?;
        data.contract_id = contract_id;
        let row = details_model(existing.id, data, existing.created_at);
        state.details.insert(contract_id, row.clone());
        Ok(row)
    }

    async fn update_contract(&self, contract_id: i32, update: ContractUpdate) -> Result<()> {
        let mut state = self.state.write().await;
        let contract = state
            .contracts
            .get_mut(&contract_id)
            .ok_or(AppError::ContractNotFound { id: contract_id })?;
        if let Some(contract_type) = update.contract_type {
            contract.contract_type = Some(contract_type);
        }
        if let Some(status) = update.extraction_status {
            contract.extraction_status = Some(status.into());
        }
        contract.updated_at = chrono::Utc::now().into();
        Ok(())
    }

    async fn create_party(&self, data: NewParty) -> Result<Party> {
        data.validate()?;
        let mut state = self.state.write().await;
        if state.rejected_party_names.contains(&data.name) {
            return Err(AppError::Duplicate {
                message: format!("party {} rejected by store", data.name),
            });
        }
        state.next_party_id += 1;
        let (registration_number, registration_type) = match data.registration {
            Some(reg) => (Some(reg.number), Some(reg.kind.into())),
            None => (None, None),
        };
        let party = Party {
            id: state.next_party_id,
            user_id: data.user_id,
            name: data.name,
            name_ar: data.name_ar,
            party_type: data.party_type.into(),
            registration_number,
            registration_type,
            email: data.email,
            phone: data.phone,
            address: data.address,
            address_ar: data.address_ar,
            source_contract_id: data.source_contract_id,
            is_highlighted: data.is_highlighted,
            created_at: chrono::Utc::now().into(),
        };
        state.parties.push(party.clone());
        Ok(party)
    }

    async fn find_parties_by_contract(&self, contract_id: i32) -> Result<Vec<Party>> {
        Ok(self
            .state
            .read()
            .await
            .parties
            .iter()
            .filter(|p| p.source_contract_id == Some(contract_id))
            .cloned()
            .collect())
    }

    async fn list_contracts_for_processing(&self) -> Result<Vec<Contract>> {
        Ok(self
            .state
            .read()
            .await
            .contracts
            .values()
            .filter(|c| c.file_path.is_some())
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn details(contract_id: i32, law: Option<&str>) -> NewContractDetails {
        NewContractDetails {
            contract_id,
            executed_status: true,
            language: "English".to_string(),
            internal_parties: vec!["Acme Corp.".to_string()],
            counterparties: vec!["Beta LLC".to_string()],
            governing_law: law.map(str::to_string),
            payment_term: None,
            breach_notice: None,
            termination_notice: None,
            extracted_text: "text".to_string(),
            extraction_metadata: serde_json::json!({ "contractType": "nda" }),
        }
    }

    fn party(name: &str) -> NewParty {
        NewParty {
            user_id: 1,
            name: name.to_string(),
            name_ar: None,
            party_type: PartyType::Client,
            registration: Some(Registration {
                number: "1010101010".to_string(),
                kind: RegistrationType::Cr,
            }),
            email: None,
            phone: None,
            address: None,
            address_ar: None,
            source_contract_id: Some(1),
            is_highlighted: true,
        }
    }

    #[tokio::test]
    async fn test_details_create_then_update_keeps_single_row() {
        let store = MemoryStore::new();
        let created = store.create_contract_details(details(1, None)).await.unwrap();
        let updated = store
            .update_contract_details(1, details(1, Some("Delaware")))
            .await
            .unwrap();

        assert_eq!(created.id, updated.id);
        assert_eq!(updated.governing_law.as_deref(), Some("Delaware"));
        assert_eq!(updated.contract_type(), Some("nda"));
        assert_eq!(updated.counterparty_names(), vec!["Beta LLC".to_string()]);
        assert_eq!(store.contract_details_count().await, 1);
    }

    #[tokio::test]
    async fn test_duplicate_details_rejected() {
        let store = MemoryStore::new();
        store.create_contract_details(details(1, None)).await.unwrap();
        let err = store.create_contract_details(details(1, None)).await.unwrap_err();
        assert!(matches!(err, AppError::DuplicateContractDetails { contract_id: 1 }));
    }

    #[tokio::test]
    async fn test_update_contract_backfills_type_and_status() {
        let store = MemoryStore::new();
        let contract = store.insert_contract(3, "Lease", Some("/tmp/a.pdf".into())).await;
        store
            .update_contract(
                contract.id,
                ContractUpdate {
                    contract_type: Some("service".to_string()),
                    extraction_status: Some(ExtractionStatus::Failed),
                },
            )
            .await
            .unwrap();

        let stored = store.contract(contract.id).await.unwrap();
        assert_eq!(stored.contract_type.as_deref(), Some("service"));
        assert!(stored.extraction_failed());

        let missing = store.update_contract(99, ContractUpdate::default()).await;
        assert!(matches!(missing, Err(AppError::ContractNotFound { id: 99 })));
    }

    #[tokio::test]
    async fn test_party_registration_pair_round_trips() {
        let store = MemoryStore::new();
        let stored = store.create_party(party("Acme")).await.unwrap();
        assert_eq!(stored.kind(), PartyType::Client);
        assert_eq!(
            stored.registration(),
            Some(Registration {
                number: "1010101010".to_string(),
                kind: RegistrationType::Cr,
            })
        );
        assert_eq!(store.find_parties_by_contract(1).await.unwrap().len(), 1);
        assert!(store.find_parties_by_contract(2).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_party_name_rejected() {
        let store = MemoryStore::new();
        let err = store.create_party(party("   ")).await.unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_only_contracts_with_files_listed() {
        let store = MemoryStore::new();
        store.insert_contract(1, "with file", Some("/tmp/x.pdf".into())).await;
        store.insert_contract(1, "draft", None).await;
        let listed = store.list_contracts_for_processing().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].title, "with file");
    }
}
