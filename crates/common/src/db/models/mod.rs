//! SeaORM entity models
//!
//! Database entities touched by the extraction core

mod contract;
mod contract_details;
mod party;

pub use contract::{
    Entity as ContractEntity,
    Model as Contract,
    ActiveModel as ContractActiveModel,
    Column as ContractColumn,
    ExtractionStatus,
};

pub use contract_details::{
    Entity as ContractDetailsEntity,
    Model as ContractDetails,
    ActiveModel as ContractDetailsActiveModel,
    Column as ContractDetailsColumn,
};

pub use party::{
    Entity as PartyEntity,
    Model as Party,
    ActiveModel as PartyActiveModel,
    Column as PartyColumn,
    PartyType,
    Registration,
    RegistrationType,
};
