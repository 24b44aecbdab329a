//! Inventory domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use stockledger_shared::types::{BatchId, ItemId, LocationId, MovementId};

/// Kind of stockable item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    /// A sellable product.
    Product,
    /// Returnable or consumable packaging.
    Packaging,
}

impl ItemKind {
    /// Returns the string representation of the kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Product => "product",
            Self::Packaging => "packaging",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Polymorphic reference to anything the ledger can hold stock of.
///
/// The ledger only needs identity; all logic is kind-agnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StockableItem {
    /// Product or packaging.
    pub kind: ItemKind,
    /// Catalog identifier of the item.
    pub id: ItemId,
}

impl StockableItem {
    /// Creates a new item reference.
    #[must_use]
    pub const fn new(kind: ItemKind, id: ItemId) -> Self {
        Self { kind, id }
    }

    /// Shorthand for a product reference.
    #[must_use]
    pub const fn product(id: ItemId) -> Self {
        Self::new(ItemKind::Product, id)
    }

    /// Shorthand for a packaging reference.
    #[must_use]
    pub const fn packaging(id: ItemId) -> Self {
        Self::new(ItemKind::Packaging, id)
    }
}

impl fmt::Display for StockableItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// Identity of an inventory position: one item at one location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PositionKey {
    /// The item held.
    pub item: StockableItem,
    /// Where it is held.
    pub location: LocationId,
}

impl PositionKey {
    /// Creates a new position key.
    #[must_use]
    pub const fn new(item: StockableItem, location: LocationId) -> Self {
        Self { item, location }
    }
}

impl fmt::Display for PositionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.item, self.location)
    }
}

/// A remaining quantity tagged with the unit cost at which it was acquired.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostBatch {
    /// Batch identifier.
    pub batch_id: BatchId,
    /// Quantity still available for consumption.
    pub quantity_remaining: Decimal,
    /// Acquisition cost per unit.
    pub unit_cost: Decimal,
    /// When the stock entered the position.
    pub acquired_at: DateTime<Utc>,
    /// The movement that created this batch.
    pub source_movement_id: MovementId,
    /// Index among the batches created by the same movement.
    pub ordinal: u32,
}

impl CostBatch {
    /// Key defining FIFO order within a position.
    #[must_use]
    pub fn fifo_key(&self) -> (DateTime<Utc>, MovementId, u32) {
        (self.acquired_at, self.source_movement_id, self.ordinal)
    }

    /// Returns true if nothing can be consumed from this batch any more.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.quantity_remaining <= Decimal::ZERO
    }
}

/// One line of a cost breakdown: how much was taken from (or put into) a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostSlice {
    /// The batch touched.
    pub batch_id: BatchId,
    /// Quantity moved out of / into the batch.
    pub quantity_used: Decimal,
    /// Unit cost of the batch.
    pub unit_cost: Decimal,
}

impl CostSlice {
    /// Cost of this slice (`quantity_used * unit_cost`), or `None` if the
    /// product does not fit in a `Decimal`.
    #[must_use]
    pub fn cost(&self) -> Option<Decimal> {
        self.quantity_used.checked_mul(self.unit_cost)
    }
}

/// Itemized list of batches touched by one movement.
///
/// For a consumption this is the record a future return replays so that
/// stock comes back at exactly the cost it left with.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CostBreakdown(Vec<CostSlice>);

impl CostBreakdown {
    /// Creates a breakdown from slices.
    #[must_use]
    pub fn new(slices: Vec<CostSlice>) -> Self {
        Self(slices)
    }

    /// Returns the slices in order.
    #[must_use]
    pub fn slices(&self) -> &[CostSlice] {
        &self.0
    }

    /// Consumes the breakdown, returning its slices.
    #[must_use]
    pub fn into_slices(self) -> Vec<CostSlice> {
        self.0
    }

    /// Returns true if there are no slices.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Sum of slice quantities, saturating at `Decimal::MAX`.
    #[must_use]
    pub fn total_quantity(&self) -> Decimal {
        self.0
            .iter()
            .fold(Decimal::ZERO, |acc, s| acc.saturating_add(s.quantity_used))
    }

    /// Exact sum of slice costs, or `None` on overflow.
    #[must_use]
    pub fn total_cost(&self) -> Option<Decimal> {
        self.0
            .iter()
            .try_fold(Decimal::ZERO, |acc, s| acc.checked_add(s.cost()?))
    }

    /// Takes `quantity` units from the end of the breakdown after skipping
    /// `already_taken` units, also counted from the end.
    ///
    /// Returns slices in their original order. Used for partial returns: the
    /// most recently consumed stock goes back first, so repeated partial
    /// returns never hand back the same unit twice.
    ///
    /// Returns `None` if `already_taken + quantity` exceeds the breakdown.
    #[must_use]
    pub fn take_from_end(&self, already_taken: Decimal, quantity: Decimal) -> Option<Self> {
        if already_taken < Decimal::ZERO
            || quantity <= Decimal::ZERO
            || already_taken
                .checked_add(quantity)
                .is_none_or(|end| end > self.total_quantity())
        {
            return None;
        }

        let mut skip = already_taken;
        let mut needed = quantity;
        let mut taken = Vec::new();

        for slice in self.0.iter().rev() {
            if needed.is_zero() {
                break;
            }
            let mut available = slice.quantity_used;
            if skip > Decimal::ZERO {
                let skipped = skip.min(available);
                skip -= skipped;
                available -= skipped;
            }
            if available.is_zero() {
                continue;
            }
            let take = available.min(needed);
            needed -= take;
            taken.push(CostSlice {
                batch_id: slice.batch_id,
                quantity_used: take,
                unit_cost: slice.unit_cost,
            });
        }

        taken.reverse();
        Some(Self(taken))
    }
}

impl From<Vec<CostSlice>> for CostBreakdown {
    fn from(slices: Vec<CostSlice>) -> Self {
        Self(slices)
    }
}
