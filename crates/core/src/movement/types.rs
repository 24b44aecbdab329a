//! Movement domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use stockledger_shared::types::{ActorId, DocumentId, LocationId, MovementId};

use crate::inventory::{CostBreakdown, PositionKey, StockableItem};

/// Kind of physical stock change.
///
/// The set is closed: every change of stock is one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementType {
    /// Goods in, e.g. from a goods receipt note.
    Receipt,
    /// Goods out, e.g. from an invoice or delivery note.
    Consumption,
    /// Client return, goods back in at the original consumption cost.
    ReturnIn,
    /// Manual correction in either direction.
    Adjustment,
}

impl MovementType {
    /// Returns the string representation of the type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Receipt => "receipt",
            Self::Consumption => "consumption",
            Self::ReturnIn => "return_in",
            Self::Adjustment => "adjustment",
        }
    }

    /// Direction implied by the type; `None` for adjustments.
    #[must_use]
    pub fn fixed_direction(&self) -> Option<Direction> {
        match self {
            Self::Receipt | Self::ReturnIn => Some(Direction::Increase),
            Self::Consumption => Some(Direction::Decrease),
            Self::Adjustment => None,
        }
    }
}

impl fmt::Display for MovementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Whether a movement adds to or removes from stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Stock goes up.
    Increase,
    /// Stock goes down.
    Decrease,
}

impl Direction {
    /// Returns the string representation of the direction.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Increase => "increase",
            Self::Decrease => "decrease",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A request to change stock, handed to the Movement Recorder.
#[derive(Debug, Clone)]
pub struct MovementIntent {
    /// Item whose stock changes.
    pub item: StockableItem,
    /// Location of the stock.
    pub location: LocationId,
    /// Kind of change.
    pub movement_type: MovementType,
    /// Required for adjustments; must agree with the type otherwise.
    pub direction: Option<Direction>,
    /// Quantity moved (strictly positive).
    pub quantity: Decimal,
    /// Unit of measure of `quantity`.
    pub unit_measure: String,
    /// Acquisition cost per unit; required on receipts and positive adjustments.
    pub unit_cost: Option<Decimal>,
    /// Breakdown of the consumption being reversed (returns only).
    pub cost_breakdown: CostBreakdown,
    /// The consumption a return reverses.
    pub reversed_movement_id: Option<MovementId>,
    /// Business document that caused the movement.
    pub reference_document_id: Option<DocumentId>,
    /// User performing the operation.
    pub actor_id: ActorId,
    /// When the movement happens.
    pub timestamp: DateTime<Utc>,
}

impl MovementIntent {
    fn base(
        item: StockableItem,
        location: LocationId,
        movement_type: MovementType,
        quantity: Decimal,
        unit_measure: impl Into<String>,
        actor_id: ActorId,
    ) -> Self {
        Self {
            item,
            location,
            movement_type,
            direction: movement_type.fixed_direction(),
            quantity,
            unit_measure: unit_measure.into(),
            unit_cost: None,
            cost_breakdown: CostBreakdown::default(),
            reversed_movement_id: None,
            reference_document_id: None,
            actor_id,
            timestamp: Utc::now(),
        }
    }

    /// Goods in at `unit_cost`.
    #[must_use]
    pub fn receipt(
        item: StockableItem,
        location: LocationId,
        quantity: Decimal,
        unit_measure: impl Into<String>,
        unit_cost: Decimal,
        actor_id: ActorId,
    ) -> Self {
        let mut intent = Self::base(
            item,
            location,
            MovementType::Receipt,
            quantity,
            unit_measure,
            actor_id,
        );
        intent.unit_cost = Some(unit_cost);
        intent
    }

    /// Goods out, costed FIFO.
    #[must_use]
    pub fn consumption(
        item: StockableItem,
        location: LocationId,
        quantity: Decimal,
        unit_measure: impl Into<String>,
        actor_id: ActorId,
    ) -> Self {
        Self::base(
            item,
            location,
            MovementType::Consumption,
            quantity,
            unit_measure,
            actor_id,
        )
    }

    /// Goods back in at the costs recorded in `breakdown`.
    #[must_use]
    pub fn return_in(
        item: StockableItem,
        location: LocationId,
        unit_measure: impl Into<String>,
        breakdown: CostBreakdown,
        reversed_movement_id: Option<MovementId>,
        actor_id: ActorId,
    ) -> Self {
        let mut intent = Self::base(
            item,
            location,
            MovementType::ReturnIn,
            breakdown.total_quantity(),
            unit_measure,
            actor_id,
        );
        intent.cost_breakdown = breakdown;
        intent.reversed_movement_id = reversed_movement_id;
        intent
    }

    /// Manual correction. Increases need a unit cost.
    #[must_use]
    pub fn adjustment(
        item: StockableItem,
        location: LocationId,
        direction: Direction,
        quantity: Decimal,
        unit_measure: impl Into<String>,
        unit_cost: Option<Decimal>,
        actor_id: ActorId,
    ) -> Self {
        let mut intent = Self::base(
            item,
            location,
            MovementType::Adjustment,
            quantity,
            unit_measure,
            actor_id,
        );
        intent.direction = Some(direction);
        intent.unit_cost = unit_cost;
        intent
    }

    /// Links the movement to the document that caused it.
    #[must_use]
    pub fn with_reference(mut self, document_id: DocumentId) -> Self {
        self.reference_document_id = Some(document_id);
        self
    }

    /// Overrides the movement timestamp.
    #[must_use]
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Position the intent applies to.
    #[must_use]
    pub fn position_key(&self) -> PositionKey {
        PositionKey::new(self.item, self.location)
    }
}

/// Immutable ledger row describing one physical stock change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockMovement {
    /// Movement identifier.
    pub id: MovementId,
    /// Item whose stock changed.
    pub item: StockableItem,
    /// Location of the stock.
    pub location: LocationId,
    /// Kind of change.
    pub movement_type: MovementType,
    /// Resolved direction.
    pub direction: Direction,
    /// Quantity moved.
    pub quantity: Decimal,
    /// Unit of measure of `quantity`.
    pub unit_measure: String,
    /// Cost per unit (weighted average for multi-batch movements).
    pub unit_cost: Decimal,
    /// Exact total cost of the movement.
    pub total_cost: Decimal,
    /// Batches touched, in the order they were touched.
    pub cost_breakdown: CostBreakdown,
    /// Business document that caused the movement.
    pub reference_document_id: Option<DocumentId>,
    /// The consumption this movement reverses.
    pub reversed_movement_id: Option<MovementId>,
    /// User who performed the operation.
    pub actor_id: ActorId,
    /// When the movement happened.
    pub timestamp: DateTime<Utc>,
}

impl StockMovement {
    /// Position this movement belongs to.
    #[must_use]
    pub fn position_key(&self) -> PositionKey {
        PositionKey::new(self.item, self.location)
    }
}
