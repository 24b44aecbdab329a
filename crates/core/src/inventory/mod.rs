//! Cost Batch Store: per-position FIFO cost history.
//!
//! This module implements the inventory side of the ledger:
//! - Stockable item identity (product or packaging)
//! - Cost batches ordered by acquisition
//! - Inventory positions with FIFO consumption and cost-preserving restore
//! - Cost breakdowns, the durable receipt a reversal replays
//! - Read-side valuation helpers

pub mod position;
pub mod types;
pub mod valuation;

#[cfg(test)]
mod position_props;

pub use position::{InventoryPosition, UNIT_COST_SCALE, round_unit_cost};
pub use types::{CostBatch, CostBreakdown, CostSlice, ItemKind, PositionKey, StockableItem};
pub use valuation::StockValuation;
