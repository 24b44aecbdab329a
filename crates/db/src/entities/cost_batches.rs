//! `SeaORM` Entity for cost_batches table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "cost_batches")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub position_id: Uuid,
    pub quantity_remaining: Decimal,
    pub unit_cost: Decimal,
    pub acquired_at: DateTimeUtc,
    pub source_movement_id: Uuid,
    pub ordinal: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::inventory_positions::Entity",
        from = "Column::PositionId",
        to = "super::inventory_positions::Column::Id"
    )]
    InventoryPositions,
}

impl Related<super::inventory_positions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::InventoryPositions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
