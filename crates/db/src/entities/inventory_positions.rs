//! `SeaORM` Entity for inventory_positions table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::ItemKind;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "inventory_positions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub item_kind: ItemKind,
    pub item_id: Uuid,
    pub location_id: Uuid,
    pub unit_measure: String,
    pub total_stock: Decimal,
    pub max_purchase_price: Decimal,
    pub version: i64,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::cost_batches::Entity")]
    CostBatches,
}

impl Related<super::cost_batches::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CostBatches.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
