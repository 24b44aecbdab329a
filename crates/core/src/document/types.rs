//! Document domain types.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use stockledger_shared::types::{ActorId, DocumentId, LocationId, MovementId};

use crate::inventory::StockableItem;

/// Kind of stock-affecting document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    /// Goods receipt note (NIR); brings stock in.
    GoodsReceipt,
    /// Sales invoice; consumes stock.
    Invoice,
    /// Delivery note (aviz); consumes stock.
    DeliveryNote,
    /// Client return (storno) of a completed sale.
    ReturnNote,
}

impl DocumentKind {
    /// Returns the string representation of the kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GoodsReceipt => "goods_receipt",
            Self::Invoice => "invoice",
            Self::DeliveryNote => "delivery_note",
            Self::ReturnNote => "return_note",
        }
    }

    /// Returns true for documents that consume stock on completion.
    #[must_use]
    pub fn is_sale(&self) -> bool {
        matches!(self, Self::Invoice | Self::DeliveryNote)
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Document status.
///
/// The valid transitions are:
/// - Draft → Completed (complete, records the stock movements)
/// - Draft → Cancelled (cancel, no stock effect)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    /// Editable, no stock effect yet.
    Draft,
    /// Stock movements recorded (immutable).
    Completed,
    /// Abandoned without stock effect (immutable).
    Cancelled,
}

impl DocumentStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One line of a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentLine {
    /// 1-based line number.
    pub line_no: u32,
    /// Item moved by the line.
    pub item: StockableItem,
    /// Quantity moved.
    pub quantity: Decimal,
    /// Unit of measure of `quantity`.
    pub unit_measure: String,
    /// Acquisition cost per unit (goods receipts only).
    pub unit_cost: Option<Decimal>,
    /// Consumption being returned (return notes only).
    pub original_movement_id: Option<MovementId>,
}

/// Header and lines of a stock-affecting document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockDocument {
    /// Document identifier.
    pub id: DocumentId,
    /// Kind of document.
    pub kind: DocumentKind,
    /// Series the number was allocated from.
    pub series_name: String,
    /// Year the number was allocated in.
    pub year: i32,
    /// Number within `(series_name, year)`.
    pub number: i64,
    /// Business date of the document.
    pub document_date: NaiveDate,
    /// Current status.
    pub status: DocumentStatus,
    /// Location whose stock the document moves.
    pub location: LocationId,
    /// Supplier or client reference (invoice number, order, reason).
    pub partner_reference: Option<String>,
    /// Sale a return note reverses.
    pub original_document_id: Option<DocumentId>,
    /// Lines in order.
    pub lines: Vec<DocumentLine>,
    /// User who created the document.
    pub actor_id: ActorId,
    /// When the document was created.
    pub created_at: DateTime<Utc>,
    /// User who completed the document.
    pub completed_by: Option<ActorId>,
    /// When the document was completed.
    pub completed_at: Option<DateTime<Utc>>,
    /// User who cancelled the document.
    pub cancelled_by: Option<ActorId>,
    /// When the document was cancelled.
    pub cancelled_at: Option<DateTime<Utc>>,
    /// Optimistic concurrency token; 0 until first persisted.
    pub version: i64,
}

impl StockDocument {
    /// Human readable number, e.g. `NIR-2025-000042`.
    #[must_use]
    pub fn display_number(&self) -> String {
        format!("{}-{}-{:06}", self.series_name, self.year, self.number)
    }
}
