//! Party entity: a legal entity named in a contract

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Role a party plays in a contract
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartyType {
    Vendor,
    Client,
    Partner,
    Contractor,
}

impl PartyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PartyType::Vendor => "vendor",
            PartyType::Client => "client",
            PartyType::Partner => "partner",
            PartyType::Contractor => "contractor",
        }
    }
}

impl From<String> for PartyType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "client" => PartyType::Client,
            "partner" => PartyType::Partner,
            "contractor" => PartyType::Contractor,
            _ => PartyType::Vendor,
        }
    }
}

impl From<PartyType> for String {
    fn from(party_type: PartyType) -> Self {
        party_type.as_str().to_string()
    }
}

/// Kind of government-issued identifier
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationType {
    /// Commercial registration
    Cr,
    Vat,
    NationalId,
}

impl RegistrationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegistrationType::Cr => "cr",
            RegistrationType::Vat => "vat",
            RegistrationType::NationalId => "national_id",
        }
    }
}

impl From<RegistrationType> for String {
    fn from(kind: RegistrationType) -> Self {
        kind.as_str().to_string()
    }
}

/// Registration number paired with its kind
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub number: String,
    pub kind: RegistrationType,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "parties")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub user_id: i32,

    /// Cleaned name, never empty
    #[sea_orm(column_type = "Text")]
    pub name: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub name_ar: Option<String>,

    #[sea_orm(column_name = "type", column_type = "Text")]
    pub party_type: String,

    /// Set together with `registration_type` or not at all
    #[sea_orm(column_type = "Text", nullable)]
    pub registration_number: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub registration_type: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub email: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub phone: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub address: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub address_ar: Option<String>,

    pub source_contract_id: Option<i32>,

    /// Freshly extracted, awaiting review
    pub is_highlighted: bool,

    pub created_at: DateTimeWithTimeZone,
}

impl Model {
    pub fn kind(&self) -> PartyType {
        PartyType::from(self.party_type.clone())
    }

    pub fn registration(&self) -> Option<Registration> {
        let kind = match self.registration_type.as_deref()? {
            "cr" => RegistrationType::Cr,
            "vat" => RegistrationType::Vat,
            "national_id" => RegistrationType::NationalId,
            _ => return None,
        };
        Some(Registration {
            number: self.registration_number.clone()?,
            kind,
        })
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::contract::Entity",
        from = "Column::SourceContractId",
        to = "super::contract::Column::Id",
        on_delete = "SetNull"
    )]
    SourceContract,
}

impl Related<super::contract::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SourceContract.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
