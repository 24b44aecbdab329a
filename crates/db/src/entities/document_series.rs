//! `SeaORM` Entity for document_series table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "document_series")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub name: String,
    pub description: Option<String>,
    pub active: bool,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::document_sequence_counters::Entity")]
    DocumentSequenceCounters,
}

impl Related<super::document_sequence_counters::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DocumentSequenceCounters.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
