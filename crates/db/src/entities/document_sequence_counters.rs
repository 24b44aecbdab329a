//! `SeaORM` Entity for document_sequence_counters table.
//!
//! Written only through the increment upsert in the ledger store.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "document_sequence_counters")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub series_name: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub year: i32,
    pub current_number: i64,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::document_series::Entity",
        from = "Column::SeriesName",
        to = "super::document_series::Column::Name"
    )]
    DocumentSeries,
}

impl Related<super::document_series::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DocumentSeries.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
