//! ContractIQ Ingestion
//!
//! Turns uploaded contract documents into structured records:
//! 1. Acquires plain text from PDF/DOCX via external extractors
//! 2. Runs the field and party extraction engines over the text
//! 3. Stores the details row, backfills the contract and saves parties

pub mod acquisition;
pub mod errors;
pub mod fields;
pub mod parties;
mod pattern;
pub mod processor;
pub mod script;

pub use acquisition::{DocumentAcquirer, DocumentFormat, TextExtractor};
pub use errors::IngestionError;
pub use fields::{extract_fields, ContractType, FieldBundle};
pub use parties::{extract_parties, PartyCandidate};
pub use processor::{BatchReport, ExtractionOutcome, ExtractionProcessor};
