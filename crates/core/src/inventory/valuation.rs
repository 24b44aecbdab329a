//! Read-side valuation of inventory positions.
//!
//! Nothing here feeds back into the ledger. The recorder costs movements from
//! batches only; these helpers exist for reports that need a number even when
//! a position has no batches left.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::position::{InventoryPosition, round_unit_cost};
use crate::error::{LedgerError, LedgerResult};

/// Valuation of the stock currently on hand in one position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockValuation {
    /// Quantity on hand.
    pub quantity: Decimal,
    /// Exact value of the remaining batches at their acquisition costs.
    pub fifo_value: Decimal,
    /// `fifo_value / quantity`, or `None` when nothing is on hand.
    pub average_unit_cost: Option<Decimal>,
}

impl StockValuation {
    /// Values the remaining batches of a position.
    ///
    /// # Errors
    ///
    /// Returns `Store` if the stored batches are worth more than a `Decimal`
    /// can hold, which the recorder never lets happen.
    pub fn of(position: &InventoryPosition) -> LedgerResult<Self> {
        let fifo_value = position.fifo_value().ok_or_else(|| {
            LedgerError::Store(format!("value of position {} overflows", position.key))
        })?;
        let average_unit_cost = (!position.total_stock.is_zero())
            .then(|| round_unit_cost(fifo_value / position.total_stock));

        Ok(Self {
            quantity: position.total_stock,
            fifo_value,
            average_unit_cost,
        })
    }

    /// APPROXIMATION for reporting only: the average cost of the stock on
    /// hand, or the highest purchase price ever observed when the position
    /// is empty.
    ///
    /// This estimate is not FIFO cost and must never be used to cost a
    /// movement.
    pub fn approximate_unit_cost(position: &InventoryPosition) -> LedgerResult<Decimal> {
        Ok(Self::of(position)?
            .average_unit_cost
            .unwrap_or(position.max_purchase_price))
    }
}
