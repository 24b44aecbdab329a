//! String-backed enums stored in `VARCHAR` columns with `CHECK` constraints.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use stockledger_core::document;
use stockledger_core::inventory;
use stockledger_core::movement;

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum ItemKind {
    #[sea_orm(string_value = "product")]
    Product,
    #[sea_orm(string_value = "packaging")]
    Packaging,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum MovementType {
    #[sea_orm(string_value = "receipt")]
    Receipt,
    #[sea_orm(string_value = "consumption")]
    Consumption,
    #[sea_orm(string_value = "return_in")]
    ReturnIn,
    #[sea_orm(string_value = "adjustment")]
    Adjustment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum MovementDirection {
    #[sea_orm(string_value = "increase")]
    Increase,
    #[sea_orm(string_value = "decrease")]
    Decrease,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(24))")]
pub enum DocumentKind {
    #[sea_orm(string_value = "goods_receipt")]
    GoodsReceipt,
    #[sea_orm(string_value = "invoice")]
    Invoice,
    #[sea_orm(string_value = "delivery_note")]
    DeliveryNote,
    #[sea_orm(string_value = "return_note")]
    ReturnNote,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum DocumentStatus {
    #[sea_orm(string_value = "draft")]
    Draft,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

// ========== Conversions to and from the domain enums ==========

impl From<inventory::ItemKind> for ItemKind {
    fn from(kind: inventory::ItemKind) -> Self {
        match kind {
            inventory::ItemKind::Product => Self::Product,
            inventory::ItemKind::Packaging => Self::Packaging,
        }
    }
}

impl From<ItemKind> for inventory::ItemKind {
    fn from(kind: ItemKind) -> Self {
        match kind {
            ItemKind::Product => Self::Product,
            ItemKind::Packaging => Self::Packaging,
        }
    }
}

impl From<movement::MovementType> for MovementType {
    fn from(value: movement::MovementType) -> Self {
        match value {
            movement::MovementType::Receipt => Self::Receipt,
            movement::MovementType::Consumption => Self::Consumption,
            movement::MovementType::ReturnIn => Self::ReturnIn,
            movement::MovementType::Adjustment => Self::Adjustment,
        }
    }
}

impl From<MovementType> for movement::MovementType {
    fn from(value: MovementType) -> Self {
        match value {
            MovementType::Receipt => Self::Receipt,
            MovementType::Consumption => Self::Consumption,
            MovementType::ReturnIn => Self::ReturnIn,
            MovementType::Adjustment => Self::Adjustment,
        }
    }
}

impl From<movement::Direction> for MovementDirection {
    fn from(value: movement::Direction) -> Self {
        match value {
            movement::Direction::Increase => Self::Increase,
            movement::Direction::Decrease => Self::Decrease,
        }
    }
}

impl From<MovementDirection> for movement::Direction {
    fn from(value: MovementDirection) -> Self {
        match value {
            MovementDirection::Increase => Self::Increase,
            MovementDirection::Decrease => Self::Decrease,
        }
    }
}

impl From<document::DocumentKind> for DocumentKind {
    fn from(kind: document::DocumentKind) -> Self {
        match kind {
            document::DocumentKind::GoodsReceipt => Self::GoodsReceipt,
            document::DocumentKind::Invoice => Self::Invoice,
            document::DocumentKind::DeliveryNote => Self::DeliveryNote,
            document::DocumentKind::ReturnNote => Self::ReturnNote,
        }
    }
}

impl From<DocumentKind> for document::DocumentKind {
    fn from(kind: DocumentKind) -> Self {
        match kind {
            DocumentKind::GoodsReceipt => Self::GoodsReceipt,
            DocumentKind::Invoice => Self::Invoice,
            DocumentKind::DeliveryNote => Self::DeliveryNote,
            DocumentKind::ReturnNote => Self::ReturnNote,
        }
    }
}

impl From<document::DocumentStatus> for DocumentStatus {
    fn from(status: document::DocumentStatus) -> Self {
        match status {
            document::DocumentStatus::Draft => Self::Draft,
            document::DocumentStatus::Completed => Self::Completed,
            document::DocumentStatus::Cancelled => Self::Cancelled,
        }
    }
}

impl From<DocumentStatus> for document::DocumentStatus {
    fn from(status: DocumentStatus) -> Self {
        match status {
            DocumentStatus::Draft => Self::Draft,
            DocumentStatus::Completed => Self::Completed,
            DocumentStatus::Cancelled => Self::Cancelled,
        }
    }
}
