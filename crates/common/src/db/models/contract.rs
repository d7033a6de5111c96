//! Contract entity
//!
//! Owned by the surrounding CRUD application; the extraction core only
//! reads the file location and backfills `type` and `extraction_status`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Outcome of the last extraction attempt for a contract
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionStatus {
    Completed,
    Failed,
}

impl ExtractionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionStatus::Completed => "completed",
            ExtractionStatus::Failed => "failed",
        }
    }
}

impl From<ExtractionStatus> for String {
    fn from(status: ExtractionStatus) -> Self {
        status.as_str().to_string()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "contracts")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub user_id: i32,

    #[sea_orm(column_type = "Text")]
    pub title: String,

    /// Location of the uploaded PDF/DOCX on disk
    #[sea_orm(column_type = "Text", nullable)]
    pub file_path: Option<String>,

    /// Detected contract category (service, nda, employment, sales)
    #[sea_orm(column_name = "type", column_type = "Text", nullable)]
    pub contract_type: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub extraction_status: Option<String>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    /// Whether the last extraction attempt failed (as opposed to finding nothing)
    pub fn extraction_failed(&self) -> bool {
        self.extraction_status.as_deref() == Some(ExtractionStatus::Failed.as_str())
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_one = "super::contract_details::Entity")]
    Details,

    #[sea_orm(has_many = "super::party::Entity")]
    Parties,
}

impl Related<super::contract_details::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Details.def()
    }
}

impl Related<super::party::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Parties.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
