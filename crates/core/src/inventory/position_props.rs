//! Property-based tests for InventoryPosition.
//!
//! - Stock total always equals the sum of batch quantities
//! - Max purchase price never decreases
//! - Failed consumption leaves the position untouched
//! - Consume-then-restore preserves total quantity and total cost
//! - Partial returns never hand back more than was consumed

use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use stockledger_shared::types::{ItemId, LocationId, MovementId};

use super::position::InventoryPosition;
use super::types::{PositionKey, StockableItem};
use super::valuation::StockValuation;

/// Strategy for quantities (0.001 to 1,000.000).
fn quantity() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000i64).prop_map(|milli| Decimal::new(milli, 3))
}

/// Strategy for unit costs (0.00 to 500.00).
fn unit_cost() -> impl Strategy<Value = Decimal> {
    (0i64..50_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

#[derive(Debug, Clone)]
enum Op {
    Receive(Decimal, Decimal),
    Consume(Decimal),
    ConsumeAndReturn(Decimal),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (quantity(), unit_cost()).prop_map(|(q, c)| Op::Receive(q, c)),
        quantity().prop_map(Op::Consume),
        quantity().prop_map(Op::ConsumeAndReturn),
    ]
}

fn new_position() -> InventoryPosition {
    InventoryPosition::new(
        PositionKey::new(StockableItem::product(ItemId::new()), LocationId::new()),
        "kg",
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// *For any* sequence of receipts, consumptions and returns, the cached
    /// total SHALL equal the batch sum and the max price SHALL never drop.
    #[test]
    fn prop_invariants_hold_across_history(ops in prop::collection::vec(op(), 1..40)) {
        let mut pos = new_position();
        let start = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let mut last_max = pos.max_purchase_price;

        for (i, op) in ops.into_iter().enumerate() {
            let at = start + Duration::minutes(i64::try_from(i).unwrap());
            match op {
                Op::Receive(q, c) => {
                    pos.receive(q, c, at, MovementId::new()).unwrap();
                }
                Op::Consume(q) => {
                    let before = pos.clone();
                    if pos.consume_fifo(q).is_err() {
                        prop_assert_eq!(&pos, &before);
                    }
                }
                Op::ConsumeAndReturn(q) => {
                    if let Ok(taken) = pos.consume_fifo(q) {
                        pos.restore(&taken, at, MovementId::new()).unwrap();
                    }
                }
            }
            prop_assert!(pos.check_invariants().is_ok(), "{:?}", pos.check_invariants());
            prop_assert!(pos.max_purchase_price >= last_max);
            last_max = pos.max_purchase_price;
            prop_assert!(pos.total_stock >= Decimal::ZERO);
        }
    }

    /// *For any* consumption, the breakdown SHALL sum to the quantity
    /// consumed, and returning it SHALL restore total quantity and value.
    #[test]
    fn prop_consume_then_restore_is_cost_neutral(
        receipts in prop::collection::vec((quantity(), unit_cost()), 1..10),
        fraction in 1u32..=100u32,
    ) {
        let mut pos = new_position();
        let start = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        for (i, (q, c)) in receipts.into_iter().enumerate() {
            let at = start + Duration::hours(i64::try_from(i).unwrap());
            pos.receive(q, c, at, MovementId::new()).unwrap();
        }
        let before = StockValuation::of(&pos).unwrap();

        let wanted = (pos.total_stock * Decimal::from(fraction) / Decimal::from(100)).round_dp(3);
        prop_assume!(wanted > Decimal::ZERO);

        let taken = pos.consume_fifo(wanted).unwrap();
        prop_assert_eq!(taken.total_quantity(), wanted);

        pos.restore(&taken, start + Duration::days(365), MovementId::new()).unwrap();
        let after = StockValuation::of(&pos).unwrap();

        prop_assert_eq!(after.quantity, before.quantity);
        prop_assert_eq!(after.fifo_value, before.fifo_value);
    }

    /// *For any* split of a consumption into partial returns, the returned
    /// slices SHALL add up to exactly the consumed quantity and cost, and
    /// nothing more SHALL be returnable afterwards.
    #[test]
    fn prop_partial_returns_cover_consumption_once(
        receipts in prop::collection::vec((quantity(), unit_cost()), 1..8),
        percents in prop::collection::vec(1u32..=100u32, 1..6),
    ) {
        let mut pos = new_position();
        let start = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        for (i, (q, c)) in receipts.into_iter().enumerate() {
            let at = start + Duration::hours(i64::try_from(i).unwrap());
            pos.receive(q, c, at, MovementId::new()).unwrap();
        }
        let consumed = pos.consume_fifo(pos.total_stock).unwrap();
        let total = consumed.total_quantity();

        let mut returned = Decimal::ZERO;
        let mut returned_cost = Decimal::ZERO;
        for pct in percents {
            let left = total - returned;
            let chunk = (left * Decimal::from(pct) / Decimal::from(100)).round_dp(3);
            if chunk <= Decimal::ZERO {
                continue;
            }
            let slice = consumed.take_from_end(returned, chunk).unwrap();
            prop_assert_eq!(slice.total_quantity(), chunk);
            returned += chunk;
            returned_cost += slice.total_cost().unwrap();
        }

        let left = total - returned;
        if left > Decimal::ZERO {
            let rest = consumed.take_from_end(returned, left).unwrap();
            returned_cost += rest.total_cost().unwrap();
            returned += left;
        }

        prop_assert_eq!(returned, total);
        prop_assert_eq!(Some(returned_cost), consumed.total_cost());
        prop_assert!(consumed.take_from_end(returned, Decimal::new(1, 3)).is_none());
    }
}
