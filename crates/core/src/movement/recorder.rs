//! The Movement Recorder.
//!
//! Every stock change goes through [`MovementRecorder::record`], inside a
//! transaction owned by the caller. The recorder validates the intent, loads
//! the position, applies FIFO costing or cost restoration, then writes the
//! position back and appends the immutable movement. If any step fails the
//! caller's transaction must be rolled back; nothing the recorder wrote is
//! then visible.

use rust_decimal::Decimal;
use stockledger_shared::LedgerConfig;
use stockledger_shared::types::MovementId;

use super::types::{Direction, MovementIntent, MovementType, StockMovement};
use super::validation::MovementValidator;
use crate::error::{LedgerError, LedgerResult};
use crate::inventory::{CostBreakdown, InventoryPosition, round_unit_cost};
use crate::store::LedgerTx;

/// Recorder tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecorderOptions {
    /// Drop exhausted batches after each decrease.
    pub prune_exhausted_batches: bool,
}

impl Default for RecorderOptions {
    fn default() -> Self {
        Self {
            prune_exhausted_batches: true,
        }
    }
}

impl From<&LedgerConfig> for RecorderOptions {
    fn from(config: &LedgerConfig) -> Self {
        Self {
            prune_exhausted_batches: config.prune_exhausted_batches,
        }
    }
}

/// Records stock movements against a [`LedgerTx`].
#[derive(Debug, Clone, Default)]
pub struct MovementRecorder {
    options: RecorderOptions,
}

impl MovementRecorder {
    /// Creates a recorder.
    #[must_use]
    pub fn new(options: RecorderOptions) -> Self {
        Self { options }
    }

    /// Records one movement inside `tx`.
    ///
    /// # Errors
    ///
    /// - `InvalidMovementIntent` for malformed intents (nothing is read), or
    ///   when stock or cost would leave the `Decimal` range
    /// - `InsufficientStock` if a decrease exceeds the position
    /// - `ConcurrencyConflict` if the position changed concurrently
    pub async fn record<T: LedgerTx>(
        &self,
        intent: &MovementIntent,
        tx: &mut T,
    ) -> LedgerResult<StockMovement> {
        let direction = MovementValidator::validate(intent)?;
        let key = intent.position_key();

        let mut position = match tx.load_position(&key).await? {
            Some(position) => {
                MovementValidator::validate_against(intent, &position)?;
                position
            }
            None if direction == Direction::Decrease => {
                return Err(LedgerError::InsufficientStock {
                    item: intent.item,
                    location: intent.location,
                    requested: intent.quantity,
                    available: Decimal::ZERO,
                });
            }
            None => InventoryPosition::new(key, intent.unit_measure.clone()),
        };

        let movement_id = MovementId::new();
        let (breakdown, receipt_cost) = match (intent.movement_type, direction) {
            (MovementType::ReturnIn, _) => {
                let restored =
                    position.restore(&intent.cost_breakdown, intent.timestamp, movement_id)?;
                (restored, None)
            }
            (_, Direction::Increase) => {
                let cost = intent
                    .unit_cost
                    .ok_or_else(|| LedgerError::invalid("increase requires a unit cost"))?;
                let slice =
                    position.receive(intent.quantity, cost, intent.timestamp, movement_id)?;
                (CostBreakdown::new(vec![slice]), Some(cost))
            }
            (_, Direction::Decrease) => {
                let consumed = position.consume_fifo(intent.quantity)?;
                if self.options.prune_exhausted_batches {
                    position.prune_exhausted();
                }
                (consumed, None)
            }
        };
        let total_cost = breakdown.total_cost().ok_or_else(|| {
            LedgerError::invalid(format!("cost of {} at {key} overflows", intent.quantity))
        })?;
        let unit_cost = receipt_cost.unwrap_or_else(|| average(total_cost, intent.quantity));

        if let Err(violation) = position.check_invariants() {
            return Err(LedgerError::Store(format!(
                "position {key} would become inconsistent: {violation}"
            )));
        }

        let movement = StockMovement {
            id: movement_id,
            item: intent.item,
            location: intent.location,
            movement_type: intent.movement_type,
            direction,
            quantity: intent.quantity,
            unit_measure: intent.unit_measure.clone(),
            unit_cost,
            total_cost,
            cost_breakdown: breakdown,
            reference_document_id: intent.reference_document_id,
            reversed_movement_id: intent.reversed_movement_id,
            actor_id: intent.actor_id,
            timestamp: intent.timestamp,
        };

        tx.save_position(&position).await?;
        tx.append_movement(&movement).await?;
        Ok(movement)
    }
}

/// Weighted unit cost, rounded to the unit-cost scale.
fn average(total_cost: Decimal, quantity: Decimal) -> Decimal {
    if quantity.is_zero() {
        return Decimal::ZERO;
    }
    round_unit_cost(total_cost / quantity)
}
