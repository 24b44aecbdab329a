//! Inventory positions and the FIFO costing algorithms.
//!
//! A position owns the cost batches of one item at one location. It is only
//! ever mutated by the Movement Recorder, which loads it inside a store
//! transaction, applies exactly one of [`InventoryPosition::receive`],
//! [`InventoryPosition::consume_fifo`] or [`InventoryPosition::restore`],
//! and saves it back under optimistic version control.

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use stockledger_shared::types::{BatchId, MovementId, PositionId};

use super::types::{CostBatch, CostBreakdown, CostSlice, PositionKey};
use crate::error::{LedgerError, LedgerResult};

/// Decimal places kept on derived unit costs (weighted averages).
pub const UNIT_COST_SCALE: u32 = 4;

/// Rounds a derived unit cost using Banker's Rounding.
#[must_use]
pub fn round_unit_cost(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(UNIT_COST_SCALE, RoundingStrategy::MidpointNearestEven)
}

fn overflow(key: &PositionKey, what: &str) -> LedgerError {
    LedgerError::invalid(format!("{what} of position {key} would exceed the decimal range"))
}

/// Stock of one item at one location, with its FIFO cost history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryPosition {
    /// Position identifier.
    pub id: PositionId,
    /// Item and location this position tracks.
    pub key: PositionKey,
    /// Base unit of measure of the item.
    pub unit_measure: String,
    /// Cached `Σ batches.quantity_remaining`.
    pub total_stock: Decimal,
    /// Highest unit cost ever received; never lowered.
    pub max_purchase_price: Decimal,
    /// Batches in FIFO order.
    pub batches: Vec<CostBatch>,
    /// Optimistic concurrency token; 0 until first persisted.
    pub version: i64,
}

impl InventoryPosition {
    /// Creates an empty, not yet persisted position.
    #[must_use]
    pub fn new(key: PositionKey, unit_measure: impl Into<String>) -> Self {
        Self {
            id: PositionId::new(),
            key,
            unit_measure: unit_measure.into(),
            total_stock: Decimal::ZERO,
            max_purchase_price: Decimal::ZERO,
            batches: Vec::new(),
            version: 0,
        }
    }

    /// Batches that can still be consumed, in FIFO order.
    pub fn available_batches(&self) -> impl Iterator<Item = &CostBatch> {
        self.batches.iter().filter(|b| !b.is_exhausted())
    }

    /// Exact value of the batches still on hand, or `None` on overflow.
    #[must_use]
    pub fn fifo_value(&self) -> Option<Decimal> {
        self.available_batches().try_fold(Decimal::ZERO, |acc, b| {
            acc.checked_add(b.quantity_remaining.checked_mul(b.unit_cost)?)
        })
    }

    /// Adds a new batch for an increase (receipt or positive adjustment).
    ///
    /// Returns the single breakdown slice referencing the new batch.
    ///
    /// # Errors
    ///
    /// Returns `InvalidMovementIntent` if the position's stock or value
    /// would overflow; the position is left untouched.
    pub fn receive(
        &mut self,
        quantity: Decimal,
        unit_cost: Decimal,
        acquired_at: DateTime<Utc>,
        source_movement_id: MovementId,
    ) -> LedgerResult<CostSlice> {
        let batch = CostBatch {
            batch_id: BatchId::new(),
            quantity_remaining: quantity,
            unit_cost,
            acquired_at,
            source_movement_id,
            ordinal: 0,
        };
        let slice = CostSlice {
            batch_id: batch.batch_id,
            quantity_used: quantity,
            unit_cost,
        };
        let total_stock = self.checked_growth(std::slice::from_ref(&slice))?;

        self.insert_batch(batch);
        self.total_stock = total_stock;
        self.max_purchase_price = self.max_purchase_price.max(unit_cost);
        Ok(slice)
    }

    /// Consumes `quantity` from the oldest batches first.
    ///
    /// The consumption is planned before anything is touched, so on
    /// `InsufficientStock` the position is left exactly as it was.
    pub fn consume_fifo(&mut self, quantity: Decimal) -> LedgerResult<CostBreakdown> {
        let insufficient = || LedgerError::InsufficientStock {
            item: self.key.item,
            location: self.key.location,
            requested: quantity,
            available: self.total_stock,
        };

        if quantity > self.total_stock {
            return Err(insufficient());
        }

        let mut still_needed = quantity;
        let mut plan: Vec<(usize, CostSlice)> = Vec::new();
        for (idx, batch) in self.batches.iter().enumerate() {
            if still_needed.is_zero() {
                break;
            }
            if batch.is_exhausted() {
                continue;
            }
            let take = batch.quantity_remaining.min(still_needed);
            plan.push((
                idx,
                CostSlice {
                    batch_id: batch.batch_id,
                    quantity_used: take,
                    unit_cost: batch.unit_cost,
                },
            ));
            still_needed -= take;
        }

        if !still_needed.is_zero() {
            return Err(insufficient());
        }

        let (indices, slices): (Vec<usize>, Vec<CostSlice>) = plan.into_iter().unzip();
        let breakdown = CostBreakdown::new(slices);
        if breakdown.total_cost().is_none() {
            return Err(overflow(&self.key, "consumed value"));
        }

        for (idx, slice) in indices.into_iter().zip(breakdown.slices()) {
            self.batches[idx].quantity_remaining -= slice.quantity_used;
        }
        self.total_stock -= quantity;

        Ok(breakdown)
    }

    /// Re-creates batches from a previously captured breakdown.
    ///
    /// One batch per slice, same unit cost, acquired at `acquired_at` so the
    /// returned stock queues behind what is already on hand. Returns the
    /// breakdown referencing the new batches.
    ///
    /// # Errors
    ///
    /// Returns `InvalidMovementIntent` if the position's stock or value
    /// would overflow; the position is left untouched.
    pub fn restore(
        &mut self,
        original: &CostBreakdown,
        acquired_at: DateTime<Utc>,
        source_movement_id: MovementId,
    ) -> LedgerResult<CostBreakdown> {
        let total_stock = self.checked_growth(original.slices())?;
        let mut slices = Vec::with_capacity(original.slices().len());

        for (ordinal, slice) in (0u32..).zip(original.slices()) {
            let batch = CostBatch {
                batch_id: BatchId::new(),
                quantity_remaining: slice.quantity_used,
                unit_cost: slice.unit_cost,
                acquired_at,
                source_movement_id,
                ordinal,
            };
            slices.push(CostSlice {
                batch_id: batch.batch_id,
                quantity_used: slice.quantity_used,
                unit_cost: slice.unit_cost,
            });
            self.insert_batch(batch);
            self.max_purchase_price = self.max_purchase_price.max(slice.unit_cost);
        }
        self.total_stock = total_stock;

        Ok(CostBreakdown::new(slices))
    }

    /// Drops exhausted batches. Returns how many were removed.
    pub fn prune_exhausted(&mut self) -> usize {
        let before = self.batches.len();
        self.batches.retain(|b| !b.is_exhausted());
        before - self.batches.len()
    }

    /// Checks the position's structural invariants.
    ///
    /// # Errors
    ///
    /// Returns a description of the first violated invariant.
    pub fn check_invariants(&self) -> Result<(), String> {
        let sum = self
            .batches
            .iter()
            .try_fold(Decimal::ZERO, |acc, b| acc.checked_add(b.quantity_remaining))
            .ok_or_else(|| "sum of batches overflows".to_string())?;
        if sum != self.total_stock {
            return Err(format!(
                "total_stock {} != sum of batches {}",
                self.total_stock, sum
            ));
        }
        if let Some(b) = self.batches.iter().find(|b| b.quantity_remaining < Decimal::ZERO) {
            return Err(format!("batch {} has negative quantity", b.batch_id));
        }
        if let Some(b) = self.batches.iter().find(|b| b.unit_cost > self.max_purchase_price) {
            return Err(format!(
                "batch {} cost {} exceeds max purchase price {}",
                b.batch_id, b.unit_cost, self.max_purchase_price
            ));
        }
        if self
            .batches
            .windows(2)
            .any(|w| w[0].fifo_key() > w[1].fifo_key())
        {
            return Err("batches are not in FIFO order".to_string());
        }
        Ok(())
    }

    /// Stock after adding `incoming`, provided both the stock and the FIFO
    /// value of the grown position stay representable.
    fn checked_growth(&self, incoming: &[CostSlice]) -> LedgerResult<Decimal> {
        let total_stock = incoming
            .iter()
            .try_fold(self.total_stock, |acc, s| acc.checked_add(s.quantity_used))
            .ok_or_else(|| overflow(&self.key, "stock"))?;
        self.fifo_value()
            .zip(CostBreakdown::new(incoming.to_vec()).total_cost())
            .and_then(|(held, added)| held.checked_add(added))
            .ok_or_else(|| overflow(&self.key, "stock value"))?;
        Ok(total_stock)
    }

    /// Inserts a batch at its FIFO position.
    ///
    /// Appending is the common case; back-dated receipts land in the middle.
    fn insert_batch(&mut self, batch: CostBatch) {
        let key = batch.fifo_key();
        let idx = self.batches.partition_point(|b| b.fifo_key() <= key);
        self.batches.insert(idx, batch);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::types::StockableItem;
    use chrono::{Duration, TimeZone};
    use rust_decimal_macros::dec;
    use stockledger_shared::types::{ItemId, LocationId};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap()
    }

    fn empty_position() -> InventoryPosition {
        InventoryPosition::new(
            PositionKey::new(StockableItem::product(ItemId::new()), LocationId::new()),
            "buc",
        )
    }

    /// 10^20 units; at 10^10 each the value exceeds `Decimal::MAX`.
    fn huge_quantity() -> Decimal {
        Decimal::from_i128_with_scale(100_000_000_000_000_000_000, 0)
    }

    /// Position holding `[(10,@5), (10,@7)]`.
    fn two_batch_position() -> InventoryPosition {
        let mut pos = empty_position();
        pos.receive(dec!(10), dec!(5), t0(), MovementId::new()).unwrap();
        pos.receive(dec!(10), dec!(7), t0() + Duration::days(1), MovementId::new()).unwrap();
        pos
    }

    #[test]
    fn test_receive_updates_totals() {
        let pos = two_batch_position();
        assert_eq!(pos.total_stock, dec!(20));
        assert_eq!(pos.max_purchase_price, dec!(7));
        assert_eq!(pos.batches.len(), 2);
        assert!(pos.check_invariants().is_ok());
    }

    #[test]
    fn test_consume_fifo_takes_oldest_first() {
        let mut pos = two_batch_position();
        let breakdown = pos.consume_fifo(dec!(15)).unwrap();

        let slices = breakdown.slices();
        assert_eq!(slices.len(), 2);
        assert_eq!((slices[0].quantity_used, slices[0].unit_cost), (dec!(10), dec!(5)));
        assert_eq!((slices[1].quantity_used, slices[1].unit_cost), (dec!(5), dec!(7)));

        let unit_cost = round_unit_cost(breakdown.total_cost().unwrap() / dec!(15));
        assert_eq!(unit_cost, dec!(5.6667));
        assert_eq!(unit_cost.round_dp(2), dec!(5.67));

        assert_eq!(pos.total_stock, dec!(5));
        assert!(pos.batches[0].is_exhausted());
        assert!(pos.check_invariants().is_ok());
    }

    #[test]
    fn test_consume_insufficient_leaves_position_unchanged() {
        let mut pos = two_batch_position();
        let before = pos.clone();

        let err = pos.consume_fifo(dec!(25)).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InsufficientStock { requested, available, .. }
                if requested == dec!(25) && available == dec!(20)
        ));
        assert_eq!(pos, before);
    }

    #[test]
    fn test_exhausted_batch_never_consumed_again() {
        let mut pos = two_batch_position();
        pos.consume_fifo(dec!(10)).unwrap();
        let next = pos.consume_fifo(dec!(1)).unwrap();
        assert_eq!(next.slices().len(), 1);
        assert_eq!(next.slices()[0].unit_cost, dec!(7));
    }

    #[test]
    fn test_restore_recreates_original_costs() {
        let mut pos = two_batch_position();
        let consumed = pos.consume_fifo(dec!(15)).unwrap();
        pos.prune_exhausted();

        let restored = pos
            .restore(&consumed, t0() + Duration::days(30), MovementId::new())
            .unwrap();

        assert_eq!(pos.total_stock, dec!(20));
        assert_eq!(restored.total_cost(), consumed.total_cost());
        let costs: Vec<Decimal> = pos.batches.iter().map(|b| b.unit_cost).collect();
        assert_eq!(costs, vec![dec!(7), dec!(5), dec!(7)]);
        assert!(pos.check_invariants().is_ok());
    }

    #[test]
    fn test_restored_batches_queue_behind_existing_stock() {
        let mut pos = two_batch_position();
        let consumed = pos.consume_fifo(dec!(15)).unwrap();
        pos.restore(&consumed, t0() + Duration::days(30), MovementId::new()).unwrap();

        // 5 @7 still on hand from the second receipt goes first.
        let next = pos.consume_fifo(dec!(5)).unwrap();
        assert_eq!(next.slices().len(), 1);
        assert_eq!(next.slices()[0].unit_cost, dec!(7));
        assert_eq!(next.total_quantity(), dec!(5));
    }

    #[test]
    fn test_back_dated_receipt_inserted_in_fifo_order() {
        let mut pos = two_batch_position();
        pos.receive(dec!(1), dec!(3), t0() - Duration::days(1), MovementId::new()).unwrap();
        assert_eq!(pos.batches[0].unit_cost, dec!(3));
        assert!(pos.check_invariants().is_ok());
    }

    #[test]
    fn test_max_purchase_price_not_lowered() {
        let mut pos = two_batch_position();
        pos.receive(dec!(1), dec!(2), t0() + Duration::days(2), MovementId::new()).unwrap();
        assert_eq!(pos.max_purchase_price, dec!(7));
        pos.consume_fifo(dec!(21)).unwrap();
        assert_eq!(pos.max_purchase_price, dec!(7));
    }

    #[test]
    fn test_prune_exhausted() {
        let mut pos = two_batch_position();
        pos.consume_fifo(dec!(10)).unwrap();
        assert_eq!(pos.prune_exhausted(), 1);
        assert_eq!(pos.batches.len(), 1);
        assert!(pos.check_invariants().is_ok());
    }

    #[test]
    fn test_receive_overflowing_value_leaves_position_unchanged() {
        let mut pos = two_batch_position();
        let before = pos.clone();

        let err = pos
            .receive(huge_quantity(), dec!(10000000000), t0(), MovementId::new())
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidMovementIntent(_)));
        assert_eq!(pos, before);
    }

    #[test]
    fn test_receive_overflowing_stock_rejected() {
        let mut pos = empty_position();
        pos.receive(Decimal::MAX, Decimal::ZERO, t0(), MovementId::new()).unwrap();

        let err = pos.receive(dec!(1), Decimal::ZERO, t0(), MovementId::new()).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidMovementIntent(_)));
        assert_eq!(pos.total_stock, Decimal::MAX);
        assert_eq!(pos.batches.len(), 1);
    }

    #[test]
    fn test_restore_overflowing_value_rejected() {
        let mut pos = two_batch_position();
        let before = pos.clone();
        let huge = CostBreakdown::new(vec![CostSlice {
            batch_id: BatchId::new(),
            quantity_used: huge_quantity(),
            unit_cost: dec!(10000000000),
        }]);

        let err = pos.restore(&huge, t0(), MovementId::new()).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidMovementIntent(_)));
        assert_eq!(pos, before);
    }

    #[test]
    fn test_fifo_value_sums_remaining_batches() {
        let mut pos = two_batch_position();
        assert_eq!(pos.fifo_value(), Some(dec!(120)));
        pos.consume_fifo(dec!(15)).unwrap();
        assert_eq!(pos.fifo_value(), Some(dec!(35)));
    }

    #[test]
    fn test_check_invariants_detects_drift() {
        let mut pos = two_batch_position();
        pos.total_stock = dec!(19);
        assert!(pos.check_invariants().is_err());
    }
}
