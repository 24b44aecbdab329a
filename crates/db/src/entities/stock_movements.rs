//! `SeaORM` Entity for stock_movements table.
//!
//! Rows are append-only; a trigger rejects `UPDATE` and `DELETE`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::{ItemKind, MovementDirection, MovementType};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "stock_movements")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Recording order, assigned by the database.
    pub seq: i64,
    pub item_kind: ItemKind,
    pub item_id: Uuid,
    pub location_id: Uuid,
    pub movement_type: MovementType,
    pub direction: MovementDirection,
    pub quantity: Decimal,
    pub unit_measure: String,
    pub unit_cost: Decimal,
    pub total_cost: Decimal,
    #[sea_orm(column_type = "JsonBinary")]
    pub cost_breakdown: Json,
    pub reference_document_id: Option<Uuid>,
    pub reversed_movement_id: Option<Uuid>,
    pub actor_id: Uuid,
    pub occurred_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::stock_documents::Entity",
        from = "Column::ReferenceDocumentId",
        to = "super::stock_documents::Column::Id"
    )]
    StockDocuments,
}

impl Related<super::stock_documents::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StockDocuments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
