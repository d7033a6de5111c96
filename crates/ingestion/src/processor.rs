//! Extraction processor
//!
//! Core logic for processing contracts: text acquisition, the field and
//! party passes, and the writes to the contract store.

use crate::acquisition::{AcquiredText, DocumentAcquirer, DocumentFormat};
use crate::errors::IngestionError;
use crate::fields::{extract_fields, ContractType, FieldBundle};
use crate::parties::{comparison_key, extract_parties, PartyCandidate};
use chrono::Utc;
use contractiq_common::config::{ExtractionConfig, PartyDedupPolicy};
use contractiq_common::db::models::{ContractDetails, ExtractionStatus};
use contractiq_common::db::{ContractStore, ContractUpdate, NewContractDetails};
use contractiq_common::errors::AppError;
use contractiq_common::metrics::{record_extraction_failure, record_parties, ExtractionTimer};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Party rows written for one document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PartyWriteSummary {
    pub extracted: usize,
    pub saved: usize,
    /// Already present for the contract (skip_existing policy)
    pub skipped: usize,
    pub failed: usize,
}

/// Result of processing one contract document
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionOutcome {
    pub contract_id: i32,
    pub format: DocumentFormat,
    pub details_id: i32,
    /// False when an existing details row was updated in place
    pub details_created: bool,
    pub fields: FieldBundle,
    pub parties: Vec<PartyCandidate>,
    pub party_writes: PartyWriteSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchFailure {
    pub contract_id: i32,
    pub error: String,
    /// The document itself could not be read; retrying will not help
    pub acquisition: bool,
    /// Transient store failure, worth another run
    pub retryable: bool,
}

/// Summary of a batch re-processing run
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub total: usize,
    pub succeeded: Vec<i32>,
    pub failed: Vec<BatchFailure>,
}

/// Extraction processor
pub struct ExtractionProcessor {
    store: Arc<dyn ContractStore>,
    acquirer: DocumentAcquirer,
    dedup: PartyDedupPolicy,
    batch_concurrency: usize,
}

impl ExtractionProcessor {
    pub fn new(
        store: Arc<dyn ContractStore>,
        acquirer: DocumentAcquirer,
        dedup: PartyDedupPolicy,
        batch_concurrency: usize,
    ) -> Self {
        Self {
            store,
            acquirer,
            dedup,
            batch_concurrency: batch_concurrency.max(1),
        }
    }

    /// Processor with subprocess extractors built from configuration
    pub fn from_config(
        store: Arc<dyn ContractStore>,
        config: &ExtractionConfig,
    ) -> Result<Self, IngestionError> {
        if config.timeout_secs == 0 {
            return Err(IngestionError::ConfigError(
                "extraction.timeout_secs must be greater than 0".to_string(),
            ));
        }
        if config.pdf.program.trim().is_empty() || config.docx.program.trim().is_empty() {
            return Err(IngestionError::ConfigError(
                "extraction commands need a program".to_string(),
            ));
        }

        Ok(Self::new(
            store,
            DocumentAcquirer::from_config(config),
            config.party_dedup,
            config.batch_concurrency,
        ))
    }

    /// Extract and store everything for one contract document.
    ///
    /// Acquisition failures abort the document before anything is written
    /// except the contract's `failed` status. Individual party writes may
    /// fail without failing the document.
    #[instrument(skip(self), fields(path = %path.display()))]
    pub async fn process_document(
        &self,
        path: &Path,
        contract_id: i32,
        user_id: i32,
    ) -> Result<ExtractionOutcome, IngestionError> {
        info!("Processing contract document");

        let format_label = DocumentFormat::from_extension(path)
            .map(|f| f.as_str())
            .unwrap_or("sniffed");
        let timer = ExtractionTimer::start(format_label);

        let acquired = match self.acquirer.acquire(path).await {
            Ok(acquired) => acquired,
            Err(e) => {
                error!(error = %e, "Text acquisition failed");
                record_extraction_failure(e.reason());
                self.mark_failed(contract_id).await;
                timer.finish(e.reason());
                return Err(e);
            }
        };

        let result = self.extract_and_store(contract_id, user_id, acquired).await;
        match &result {
            Ok(_) => timer.finish("success"),
            Err(e) => timer.finish(e.reason()),
        }

        result
    }

    async fn extract_and_store(
        &self,
        contract_id: i32,
        user_id: i32,
        acquired: AcquiredText,
    ) -> Result<ExtractionOutcome, IngestionError> {
        let AcquiredText { text, format } = acquired;
        let text: Arc<str> = Arc::from(text);

        // Both passes are CPU-bound and independent
        let (fields, parties) = tokio::try_join!(
            tokio::task::spawn_blocking({
                let text = Arc::clone(&text);
                move || extract_fields(&text)
            }),
            tokio::task::spawn_blocking({
                let text = Arc::clone(&text);
                move || extract_parties(&text)
            }),
        )
        .map_err(|e| IngestionError::TaskError(e.to_string()))?;

        let data = fields.to_contract_details(contract_id, text.to_string(), Utc::now());
        let (details, details_created) = self.upsert_details(data).await?;

        self.backfill_contract(contract_id, fields.contract_type).await;

        let party_writes = self.persist_parties(contract_id, user_id, &parties).await;
        record_parties(
            party_writes.extracted,
            party_writes.saved,
            party_writes.failed,
            party_writes.skipped,
        );

        info!(
            contract_id,
            format = format.as_str(),
            contract_type = fields.contract_type.as_str(),
            details_created,
            parties_saved = party_writes.saved,
            parties_failed = party_writes.failed,
            "Contract processed successfully"
        );

        Ok(ExtractionOutcome {
            contract_id,
            format,
            details_id: details.id,
            details_created,
            fields,
            parties,
            party_writes,
        })
    }

    /// Update the contract's details row, creating it on first extraction
    async fn upsert_details(
        &self,
        data: NewContractDetails,
    ) -> Result<(ContractDetails, bool), IngestionError> {
        let contract_id = data.contract_id;

        if self.store.get_contract_details(contract_id).await?.is_some() {
            let details = self.store.update_contract_details(contract_id, data).await?;
            return Ok((details, false));
        }

        match self.store.create_contract_details(data.clone()).await {
            Ok(details) => Ok((details, true)),
            Err(AppError::DuplicateContractDetails { .. }) => {
                debug!(contract_id, "Details row appeared concurrently, updating instead");
                let details = self.store.update_contract_details(contract_id, data).await?;
                Ok((details, false))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn backfill_contract(&self, contract_id: i32, contract_type: ContractType) {
        let update = ContractUpdate {
            contract_type: (contract_type != ContractType::Other)
                .then(|| contract_type.as_str().to_string()),
            extraction_status: Some(ExtractionStatus::Completed),
        };

        if let Err(e) = self.store.update_contract(contract_id, update).await {
            warn!(contract_id, error = %e, "Failed to backfill contract type");
        }
    }

    async fn mark_failed(&self, contract_id: i32) {
        let update = ContractUpdate {
            contract_type: None,
            extraction_status: Some(ExtractionStatus::Failed),
        };

        if let Err(e) = self.store.update_contract(contract_id, update).await {
            warn!(contract_id, error = %e, "Failed to record extraction failure");
        }
    }

    async fn persist_parties(
        &self,
        contract_id: i32,
        user_id: i32,
        parties: &[PartyCandidate],
    ) -> PartyWriteSummary {
        let mut summary = PartyWriteSummary {
            extracted: parties.len(),
            ..Default::default()
        };

        let skip_existing = self.dedup == PartyDedupPolicy::SkipExisting;
        let mut seen: HashSet<String> = if skip_existing {
            match self.store.find_parties_by_contract(contract_id).await {
                Ok(existing) => existing.iter().map(|p| comparison_key(&p.name)).collect(),
                Err(e) => {
                    warn!(contract_id, error = %e, "Could not load existing parties, inserting all");
                    HashSet::new()
                }
            }
        } else {
            HashSet::new()
        };

        for candidate in parties {
            if skip_existing && !seen.insert(comparison_key(&candidate.name)) {
                debug!(name = %candidate.name, "Party already recorded for contract");
                summary.skipped += 1;
                continue;
            }

            match self
                .store
                .create_party(candidate.to_new_party(user_id, contract_id))
                .await
            {
                Ok(party) => {
                    debug!(party_id = party.id, name = %party.name, "Party saved");
                    summary.saved += 1;
                }
                Err(e) => {
                    warn!(
                        contract_id,
                        name = %candidate.name,
                        error = %e,
                        "Failed to save party, continuing"
                    );
                    summary.failed += 1;
                }
            }
        }

        summary
    }

    /// Re-run extraction for every contract with an uploaded file.
    ///
    /// A failing document is logged and recorded in the report; it never
    /// stops the rest of the batch.
    #[instrument(skip(self))]
    pub async fn reprocess_all(&self) -> Result<BatchReport, IngestionError> {
        let contracts = self.store.list_contracts_for_processing().await?;

        info!(
            count = contracts.len(),
            concurrency = self.batch_concurrency,
            "Re-processing contracts"
        );

        let mut report = BatchReport {
            total: contracts.len(),
            ..Default::default()
        };

        let results: Vec<(i32, Result<ExtractionOutcome, IngestionError>)> = stream::iter(contracts)
            .map(|contract| async move {
                let outcome = match contract.file_path.as_deref() {
                    Some(file) => {
                        self.process_document(Path::new(file), contract.id, contract.user_id)
                            .await
                    }
                    None => Err(IngestionError::FileNotFound(format!(
                        "contract {} has no file",
                        contract.id
                    ))),
                };
                (contract.id, outcome)
            })
            .buffer_unordered(self.batch_concurrency)
            .collect()
            .await;

        for (contract_id, outcome) in results {
            match outcome {
                Ok(_) => report.succeeded.push(contract_id),
                Err(e) => {
                    warn!(contract_id, error = %e, "Skipping contract");
                    report.failed.push(BatchFailure {
                        contract_id,
                        acquisition: e.is_acquisition_failure(),
                        retryable: e.is_retryable(),
                        error: e.to_string(),
                    });
                }
            }
        }

        report.succeeded.sort_unstable();
        report.failed.sort_by_key(|f| f.contract_id);

        info!(
            total = report.total,
            succeeded = report.succeeded.len(),
            failed = report.failed.len(),
            "Batch re-processing complete"
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquisition::TextExtractor;
    use async_trait::async_trait;
    use contractiq_common::db::MemoryStore;
    use std::path::PathBuf;
    use tokio_test::{assert_err, assert_ok};

    const NDA: &str = "This Non-Disclosure Agreement is entered into between Acme Corp. (\"Party A\") and Beta LLC (\"Party B\").\n\n\
        This Agreement shall be governed by the laws of the State of Delaware.\n\n\
        Payment Terms: Net 30.\n\n\
        Executed on January 1, 2024.";

    /// Treats every document as UTF-8 text
    struct PlainTextExtractor;

    #[async_trait]
    impl TextExtractor for PlainTextExtractor {
        fn name(&self) -> &str {
            "plain"
        }

        async fn extract(&self, path: &Path) -> Result<String, IngestionError> {
            Ok(tokio::fs::read_to_string(path).await?)
        }
    }

    fn processor(
        store: &Arc<MemoryStore>,
        dedup: PartyDedupPolicy,
        concurrency: usize,
    ) -> ExtractionProcessor {
        let acquirer =
            DocumentAcquirer::new(Arc::new(PlainTextExtractor), Arc::new(PlainTextExtractor));
        ExtractionProcessor::new(store.clone(), acquirer, dedup, concurrency)
    }

    fn write_contract(dir: &tempfile::TempDir, name: &str, text: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, text).unwrap();
        path
    }

    #[tokio::test]
    async fn test_nda_document_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_contract(&dir, "nda.pdf", NDA);
        let store = Arc::new(MemoryStore::new());
        let contract = store.insert_contract(5, "NDA", Some(path.display().to_string())).await;

        let outcome = assert_ok!(
            processor(&store, PartyDedupPolicy::AlwaysCreate, 1)
                .process_document(&path, contract.id, 5)
                .await
        );

        assert!(outcome.details_created);
        assert_eq!(outcome.format, DocumentFormat::Pdf);
        assert_eq!(outcome.fields.contract_type, ContractType::Nda);
        assert_eq!(outcome.party_writes.saved, 2);

        let details = store.get_contract_details(contract.id).await.unwrap().unwrap();
        assert!(details.executed_status);
        assert_eq!(details.governing_law.as_deref(), Some("Delaware"));
        assert_eq!(details.payment_term.as_deref(), Some("Net 30"));
        assert_eq!(details.internal_party_names(), vec!["Acme Corp.".to_string()]);
        assert_eq!(details.counterparty_names(), vec!["Beta LLC".to_string()]);
        assert_eq!(details.contract_type(), Some("nda"));
        assert_eq!(details.extracted_text, NDA);

        let stored = store.contract(contract.id).await.unwrap();
        assert_eq!(stored.contract_type.as_deref(), Some("nda"));
        assert_eq!(stored.extraction_status.as_deref(), Some("completed"));

        let parties = store.parties().await;
        let names: Vec<&str> = parties.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Acme", "Beta"]);
        assert!(parties
            .iter()
            .all(|p| p.is_highlighted && p.source_contract_id == Some(contract.id) && p.user_id == 5));
    }

    #[tokio::test]
    async fn test_reprocessing_updates_details_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_contract(&dir, "nda.pdf", NDA);
        let store = Arc::new(MemoryStore::new());
        let contract = store.insert_contract(1, "NDA", Some(path.display().to_string())).await;
        let processor = processor(&store, PartyDedupPolicy::AlwaysCreate, 1);

        let first = processor.process_document(&path, contract.id, 1).await.unwrap();
        let second = processor.process_document(&path, contract.id, 1).await.unwrap();

        assert!(first.details_created);
        assert!(!second.details_created);
        assert_eq!(first.details_id, second.details_id);
        assert_eq!(store.contract_details_count().await, 1);
        // Default policy keeps inserting parties on every run
        assert_eq!(store.parties().await.len(), 4);
    }

    #[tokio::test]
    async fn test_skip_existing_policy_avoids_duplicate_parties() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_contract(&dir, "nda.pdf", NDA);
        let store = Arc::new(MemoryStore::new());
        let contract = store.insert_contract(1, "NDA", Some(path.display().to_string())).await;
        let processor = processor(&store, PartyDedupPolicy::SkipExisting, 1);

        processor.process_document(&path, contract.id, 1).await.unwrap();
        let second = processor.process_document(&path, contract.id, 1).await.unwrap();

        assert_eq!(second.party_writes.skipped, 2);
        assert_eq!(second.party_writes.saved, 0);
        assert_eq!(store.parties().await.len(), 2);
    }

    #[tokio::test]
    async fn test_party_write_failure_does_not_block_others() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_contract(&dir, "nda.pdf", NDA);
        let store = Arc::new(MemoryStore::new());
        let contract = store.insert_contract(1, "NDA", Some(path.display().to_string())).await;
        store.reject_party_name("Acme").await;

        let outcome = processor(&store, PartyDedupPolicy::AlwaysCreate, 1)
            .process_document(&path, contract.id, 1)
            .await
            .unwrap();

        assert_eq!(
            outcome.party_writes,
            PartyWriteSummary {
                extracted: 2,
                saved: 1,
                skipped: 0,
                failed: 1,
            }
        );
        let parties = store.parties().await;
        assert_eq!(parties.len(), 1);
        assert_eq!(parties[0].name, "Beta");
        assert_eq!(store.contract_details_count().await, 1);
    }

    #[tokio::test]
    async fn test_acquisition_failure_writes_no_details() {
        let store = Arc::new(MemoryStore::new());
        let contract = store
            .insert_contract(1, "Lost", Some("/nonexistent/lost.pdf".to_string()))
            .await;

        let err = assert_err!(
            processor(&store, PartyDedupPolicy::AlwaysCreate, 1)
                .process_document(Path::new("/nonexistent/lost.pdf"), contract.id, 1)
                .await
        );

        assert!(err.is_acquisition_failure());
        assert_eq!(store.contract_details_count().await, 0);
        assert!(store.parties().await.is_empty());
        assert!(store.contract(contract.id).await.unwrap().extraction_failed());
    }

    #[tokio::test]
    async fn test_other_type_is_not_backfilled() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_contract(&dir, "memo.docx", "completely unrelated text");
        let store = Arc::new(MemoryStore::new());
        let contract = store.insert_contract(1, "Memo", Some(path.display().to_string())).await;

        let outcome = processor(&store, PartyDedupPolicy::AlwaysCreate, 1)
            .process_document(&path, contract.id, 1)
            .await
            .unwrap();

        assert_eq!(outcome.format, DocumentFormat::Docx);
        assert_eq!(outcome.fields.contract_type, ContractType::Other);
        let stored = store.contract(contract.id).await.unwrap();
        assert_eq!(stored.contract_type, None);
        assert_eq!(stored.extraction_status.as_deref(), Some("completed"));
        assert!(outcome.parties.is_empty());
    }

    #[test]
    fn test_from_config_rejects_zero_timeout() {
        let store: Arc<dyn ContractStore> = Arc::new(MemoryStore::new());
        let config = ExtractionConfig {
            timeout_secs: 0,
            ..ExtractionConfig::default()
        };

        let result = ExtractionProcessor::from_config(store.clone(), &config);
        assert!(matches!(result, Err(IngestionError::ConfigError(_))));

        let processor = ExtractionProcessor::from_config(store, &ExtractionConfig::default())
            .unwrap();
        assert_eq!(processor.batch_concurrency, 1);
        assert_eq!(processor.dedup, PartyDedupPolicy::AlwaysCreate);
    }

    #[tokio::test]
    async fn test_batch_continues_past_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::new());

        for n in 1..=5 {
            let name = format!("contract-{n}.pdf");
            let path = if n == 3 {
                dir.path().join(&name)
            } else {
                write_contract(&dir, &name, NDA)
            };
            store
                .insert_contract(1, &name, Some(path.display().to_string()))
                .await;
        }
        store.insert_contract(1, "draft without upload", None).await;

        let report = processor(&store, PartyDedupPolicy::AlwaysCreate, 2)
            .reprocess_all()
            .await
            .unwrap();

        assert_eq!(report.total, 5);
        assert_eq!(report.succeeded, vec![1, 2, 4, 5]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].contract_id, 3);
        assert!(report.failed[0].acquisition);
        assert!(!report.failed[0].retryable);
        assert_eq!(store.contract_details_count().await, 4);
        assert!(store.contract(3).await.unwrap().extraction_failed());
    }
}
