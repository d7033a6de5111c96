//! Extracted contract metadata, one row per contract

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "contract_details")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Unique: at most one details row per contract
    #[sea_orm(unique)]
    pub contract_id: i32,

    pub executed_status: bool,

    /// "Arabic" or "English"
    #[sea_orm(column_type = "Text")]
    pub language: String,

    /// Ordered list of first-party name strings
    #[sea_orm(column_type = "JsonBinary")]
    pub internal_parties: Json,

    /// Ordered list of second-party name strings
    #[sea_orm(column_type = "JsonBinary")]
    pub counterparties: Json,

    #[sea_orm(column_type = "Text", nullable)]
    pub governing_law: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub payment_term: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub breach_notice: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub termination_notice: Option<String>,

    /// Full plain-text dump of the source document
    #[sea_orm(column_type = "Text")]
    pub extracted_text: String,

    /// `{extractedAt, contractType, ...}`
    #[sea_orm(column_type = "JsonBinary")]
    pub extraction_metadata: Json,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    pub fn internal_party_names(&self) -> Vec<String> {
        json_strings(&self.internal_parties)
    }

    pub fn counterparty_names(&self) -> Vec<String> {
        json_strings(&self.counterparties)
    }

    /// Contract type recorded in the extraction metadata
    pub fn contract_type(&self) -> Option<&str> {
        self.extraction_metadata.get("contractType")?.as_str()
    }
}

fn json_strings(value: &Json) -> Vec<String> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::contract::Entity",
        from = "Column::ContractId",
        to = "super::contract::Column::Id",
        on_delete = "Cascade"
    )]
    Contract,
}

impl Related<super::contract::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Contract.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
