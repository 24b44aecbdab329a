//! Movement intent validation.
//!
//! All checks here are pure and run before the store is touched, so a
//! rejected intent never opens a position for writing.

use rust_decimal::Decimal;

use super::types::{Direction, MovementIntent, MovementType};
use crate::error::{LedgerError, LedgerResult};
use crate::inventory::InventoryPosition;

/// Stateless validator for movement intents.
pub struct MovementValidator;

impl MovementValidator {
    /// Validates an intent and resolves its direction.
    ///
    /// # Errors
    ///
    /// Returns `InvalidMovementIntent` describing the first problem found.
    pub fn validate(intent: &MovementIntent) -> LedgerResult<Direction> {
        if intent.quantity <= Decimal::ZERO {
            return Err(LedgerError::invalid(format!(
                "quantity must be positive, got {}",
                intent.quantity
            )));
        }
        if intent.unit_measure.trim().is_empty() {
            return Err(LedgerError::invalid("unit of measure is required"));
        }

        let direction = Self::resolve_direction(intent)?;

        if intent.movement_type != MovementType::ReturnIn {
            if intent.reversed_movement_id.is_some() {
                return Err(LedgerError::invalid(format!(
                    "only returns may reverse a movement, got {}",
                    intent.movement_type
                )));
            }
            if !intent.cost_breakdown.is_empty() {
                return Err(LedgerError::invalid(format!(
                    "only returns carry a cost breakdown, got {}",
                    intent.movement_type
                )));
            }
        }

        match intent.movement_type {
            MovementType::ReturnIn => Self::validate_return(intent)?,
            _ if direction == Direction::Increase => {
                let cost = intent.unit_cost.ok_or_else(|| {
                    LedgerError::invalid(format!(
                        "{} increase requires a unit cost",
                        intent.movement_type
                    ))
                })?;
                if cost < Decimal::ZERO {
                    return Err(LedgerError::invalid(format!(
                        "unit cost cannot be negative, got {cost}"
                    )));
                }
            }
            _ => {}
        }

        Ok(direction)
    }

    /// Checks that an existing position accepts the intent's unit.
    ///
    /// # Errors
    ///
    /// Returns `InvalidMovementIntent` on a unit mismatch.
    pub fn validate_against(
        intent: &MovementIntent,
        position: &InventoryPosition,
    ) -> LedgerResult<()> {
        if intent.unit_measure != position.unit_measure {
            return Err(LedgerError::invalid(format!(
                "unit {} does not match position unit {}",
                intent.unit_measure, position.unit_measure
            )));
        }
        Ok(())
    }

    fn resolve_direction(intent: &MovementIntent) -> LedgerResult<Direction> {
        match (intent.movement_type.fixed_direction(), intent.direction) {
            (Some(fixed), None) => Ok(fixed),
            (Some(fixed), Some(given)) if fixed == given => Ok(fixed),
            (Some(fixed), Some(given)) => Err(LedgerError::invalid(format!(
                "{} movements are always {fixed}, got {given}",
                intent.movement_type
            ))),
            (None, Some(given)) => Ok(given),
            (None, None) => Err(LedgerError::invalid(format!(
                "{} requires an explicit direction",
                intent.movement_type
            ))),
        }
    }

    fn validate_return(intent: &MovementIntent) -> LedgerResult<()> {
        let breakdown = &intent.cost_breakdown;
        if breakdown.is_empty() {
            return Err(LedgerError::invalid(
                "return requires the cost breakdown of the reversed consumption",
            ));
        }
        for slice in breakdown.slices() {
            if slice.quantity_used <= Decimal::ZERO {
                return Err(LedgerError::invalid(format!(
                    "breakdown slice for batch {} has non-positive quantity",
                    slice.batch_id
                )));
            }
            if slice.unit_cost < Decimal::ZERO {
                return Err(LedgerError::invalid(format!(
                    "breakdown slice for batch {} has negative cost",
                    slice.batch_id
                )));
            }
        }
        if breakdown.total_quantity() != intent.quantity {
            return Err(LedgerError::invalid(format!(
                "breakdown covers {} but return quantity is {}",
                breakdown.total_quantity(),
                intent.quantity
            )));
        }
        Ok(())
    }
}
