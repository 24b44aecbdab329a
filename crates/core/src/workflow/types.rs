//! Workflow inputs.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use stockledger_shared::types::{ActorId, DocumentId, LocationId, MovementId};

use crate::document::{DocumentKind, StockDocument};
use crate::inventory::StockableItem;
use crate::movement::StockMovement;

/// One received line of a goods receipt note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptLine {
    /// Item received.
    pub item: StockableItem,
    /// Quantity received.
    pub quantity: Decimal,
    /// Unit of measure of `quantity`.
    pub unit_measure: String,
    /// Acquisition cost per unit.
    pub unit_cost: Decimal,
}

/// A goods receipt note (NIR).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoodsReceiptInput {
    /// Numbering series, e.g. `NIR`.
    pub series: String,
    /// Business date; its year selects the counter.
    pub document_date: NaiveDate,
    /// Receiving location.
    pub location: LocationId,
    /// Supplier invoice or delivery reference.
    pub supplier_reference: Option<String>,
    /// Received lines.
    pub lines: Vec<ReceiptLine>,
    /// User creating the document.
    pub actor_id: ActorId,
    /// Complete immediately instead of saving a draft.
    pub finalize: bool,
}

/// One sold line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleLine {
    /// Item sold.
    pub item: StockableItem,
    /// Quantity sold.
    pub quantity: Decimal,
    /// Unit of measure of `quantity`.
    pub unit_measure: String,
}

/// An invoice or delivery note consuming stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesInput {
    /// `Invoice` or `DeliveryNote`.
    pub kind: DocumentKind,
    /// Numbering series, e.g. `FACT`.
    pub series: String,
    /// Business date; its year selects the counter.
    pub document_date: NaiveDate,
    /// Location the goods leave from.
    pub location: LocationId,
    /// Client or order reference.
    pub client_reference: Option<String>,
    /// Sold lines.
    pub lines: Vec<SaleLine>,
    /// User creating the document.
    pub actor_id: ActorId,
    /// Complete immediately instead of saving a draft.
    pub finalize: bool,
}

/// One returned line, naming the consumption it reverses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnLine {
    /// Consumption movement of the original sale.
    pub original_movement_id: MovementId,
    /// Quantity coming back; at most what is still unreturned.
    pub quantity: Decimal,
}

/// A return note (storno) against a completed sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnInput {
    /// Numbering series, e.g. `RET`.
    pub series: String,
    /// Business date; its year selects the counter.
    pub document_date: NaiveDate,
    /// The completed invoice or delivery note being reversed.
    pub original_document_id: DocumentId,
    /// Why the goods came back.
    pub reason: Option<String>,
    /// Returned lines.
    pub lines: Vec<ReturnLine>,
    /// User creating the document.
    pub actor_id: ActorId,
    /// Complete immediately instead of saving a draft.
    pub finalize: bool,
}

/// Result of a workflow: the persisted document and the movements it
/// recorded (empty for drafts and cancellations).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowOutcome {
    /// The document as persisted.
    pub document: StockDocument,
    /// Movements recorded by this call, in line order.
    pub movements: Vec<StockMovement>,
}
