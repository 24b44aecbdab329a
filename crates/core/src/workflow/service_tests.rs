//! End-to-end workflow scenarios against the in-memory store.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use stockledger_shared::LedgerConfig;
use stockledger_shared::types::{ActorId, DocumentId, ItemId, LocationId, PageRequest};

use super::*;
use crate::document::{DocumentKind, DocumentStatus};
use crate::error::LedgerError;
use crate::inventory::{InventoryPosition, PositionKey, StockValuation, StockableItem};
use crate::movement::{Direction, MovementIntent, MovementType};
use crate::sequence::DocumentSeries;
use crate::store::MemoryLedgerStore;

struct Ledger {
    workflows: DocumentWorkflows<MemoryLedgerStore>,
    location: LocationId,
    actor: ActorId,
    item: StockableItem,
}

impl Ledger {
    async fn new() -> Self {
        let workflows = DocumentWorkflows::new(MemoryLedgerStore::new(), &LedgerConfig::default());
        for name in ["NIR", "FACT", "AVIZ", "RET"] {
            workflows
                .register_series(&DocumentSeries::new(name, None))
                .await
                .unwrap();
        }
        Self {
            workflows,
            location: LocationId::new(),
            actor: ActorId::new(),
            item: StockableItem::product(ItemId::new()),
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()
    }

    fn receipt_of(
        &self,
        item: StockableItem,
        quantity: Decimal,
        unit_cost: Decimal,
    ) -> GoodsReceiptInput {
        GoodsReceiptInput {
            series: "NIR".into(),
            document_date: Self::date(),
            location: self.location,
            supplier_reference: Some("SUP-123".into()),
            lines: vec![ReceiptLine {
                item,
                quantity,
                unit_measure: "buc".into(),
                unit_cost,
            }],
            actor_id: self.actor,
            finalize: true,
        }
    }

    fn receipt(&self, quantity: Decimal, unit_cost: Decimal) -> GoodsReceiptInput {
        self.receipt_of(self.item, quantity, unit_cost)
    }

    fn sale_of(&self, lines: &[(StockableItem, Decimal)]) -> SalesInput {
        SalesInput {
            kind: DocumentKind::Invoice,
            series: "FACT".into(),
            document_date: Self::date(),
            location: self.location,
            client_reference: None,
            lines: lines
                .iter()
                .map(|(item, quantity)| SaleLine {
                    item: *item,
                    quantity: *quantity,
                    unit_measure: "buc".into(),
                })
                .collect(),
            actor_id: self.actor,
            finalize: true,
        }
    }

    fn sale(&self, quantity: Decimal) -> SalesInput {
        self.sale_of(&[(self.item, quantity)])
    }

    fn return_of(&self, sale: &WorkflowOutcome, quantity: Decimal) -> ReturnInput {
        ReturnInput {
            series: "RET".into(),
            document_date: Self::date(),
            original_document_id: sale.document.id,
            reason: Some("damaged box".into()),
            lines: vec![ReturnLine {
                original_movement_id: sale.movements[0].id,
                quantity,
            }],
            actor_id: self.actor,
            finalize: true,
        }
    }

    fn key(&self) -> PositionKey {
        PositionKey::new(self.item, self.location)
    }

    async fn position(&self) -> Option<InventoryPosition> {
        self.workflows.position(&self.key()).await.unwrap()
    }

    /// Two receipts: `[(10,@5), (10,@7)]`.
    async fn stocked() -> Self {
        let ledger = Self::new().await;
        ledger.workflows.receive_goods(&ledger.receipt(dec!(10), dec!(5))).await.unwrap();
        ledger.workflows.receive_goods(&ledger.receipt(dec!(10), dec!(7))).await.unwrap();
        ledger
    }
}

fn batch_costs(position: &InventoryPosition) -> Vec<(Decimal, Decimal)> {
    position
        .batches
        .iter()
        .map(|b| (b.quantity_remaining, b.unit_cost))
        .collect()
}

#[tokio::test]
async fn test_goods_receipt_numbers_and_records() {
    let ledger = Ledger::new().await;
    let outcome = ledger
        .workflows
        .receive_goods(&ledger.receipt(dec!(10), dec!(5)))
        .await
        .unwrap();

    assert_eq!(outcome.document.status, DocumentStatus::Completed);
    assert_eq!(outcome.document.completed_by, Some(ledger.actor));
    assert!(outcome.document.completed_at.is_some());
    assert_eq!(outcome.document.kind, DocumentKind::GoodsReceipt);
    assert_eq!(outcome.document.display_number(), "NIR-2025-000001");
    assert_eq!(outcome.movements.len(), 1);
    assert_eq!(outcome.movements[0].movement_type, MovementType::Receipt);
    assert_eq!(outcome.movements[0].reference_document_id, Some(outcome.document.id));

    let second = ledger
        .workflows
        .receive_goods(&ledger.receipt(dec!(1), dec!(5)))
        .await
        .unwrap();
    assert_eq!(second.document.number, 2);

    let position = ledger.position().await.unwrap();
    assert_eq!(position.total_stock, dec!(11));
}

#[tokio::test]
async fn test_sale_costs_fifo() {
    let ledger = Ledger::stocked().await;
    let sale = ledger.workflows.record_sale(&ledger.sale(dec!(15))).await.unwrap();

    let movement = &sale.movements[0];
    assert_eq!(movement.movement_type, MovementType::Consumption);
    assert_eq!(movement.total_cost, dec!(85));
    assert_eq!(movement.unit_cost, dec!(5.6667));
    let slices: Vec<(Decimal, Decimal)> = movement
        .cost_breakdown
        .slices()
        .iter()
        .map(|s| (s.quantity_used, s.unit_cost))
        .collect();
    assert_eq!(slices, vec![(dec!(10), dec!(5)), (dec!(5), dec!(7))]);

    let position = ledger.position().await.unwrap();
    assert_eq!(position.total_stock, dec!(5));
    assert!(position.check_invariants().is_ok());
}

#[tokio::test]
async fn test_full_return_restores_original_costs() {
    let ledger = Ledger::stocked().await;
    let sale = ledger.workflows.record_sale(&ledger.sale(dec!(15))).await.unwrap();

    let ret = ledger
        .workflows
        .record_return(&ledger.return_of(&sale, dec!(15)))
        .await
        .unwrap();

    assert_eq!(ret.document.kind, DocumentKind::ReturnNote);
    assert_eq!(ret.document.original_document_id, Some(sale.document.id));
    assert_eq!(ret.movements[0].movement_type, MovementType::ReturnIn);
    assert_eq!(ret.movements[0].total_cost, sale.movements[0].total_cost);
    assert_eq!(ret.movements[0].reversed_movement_id, Some(sale.movements[0].id));

    let position = ledger.position().await.unwrap();
    assert_eq!(position.total_stock, dec!(20));
    assert_eq!(
        batch_costs(&position),
        vec![(dec!(5), dec!(7)), (dec!(10), dec!(5)), (dec!(5), dec!(7))]
    );
}

#[tokio::test]
async fn test_partial_returns_never_exceed_the_sale() {
    let ledger = Ledger::stocked().await;
    let sale = ledger.workflows.record_sale(&ledger.sale(dec!(15))).await.unwrap();

    let first = ledger
        .workflows
        .record_return(&ledger.return_of(&sale, dec!(3)))
        .await
        .unwrap();
    assert_eq!(first.movements[0].total_cost, dec!(21));

    let second = ledger
        .workflows
        .record_return(&ledger.return_of(&sale, dec!(3)))
        .await
        .unwrap();
    let slices: Vec<(Decimal, Decimal)> = second.movements[0]
        .cost_breakdown
        .slices()
        .iter()
        .map(|s| (s.quantity_used, s.unit_cost))
        .collect();
    assert_eq!(slices, vec![(dec!(1), dec!(5)), (dec!(2), dec!(7))]);
    assert_eq!(second.movements[0].total_cost, dec!(19));

    let err = ledger
        .workflows
        .record_return(&ledger.return_of(&sale, dec!(10)))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidMovementIntent(_)));

    // Only the two successful returns consumed RET numbers.
    assert_eq!(ledger.workflows.current_number("RET", 2025).await.unwrap(), Some(2));
    assert_eq!(ledger.position().await.unwrap().total_stock, dec!(11));
}

#[tokio::test]
async fn test_failed_sale_rolls_back_its_number() {
    let ledger = Ledger::stocked().await;

    let err = ledger.workflows.record_sale(&ledger.sale(dec!(25))).await.unwrap_err();
    assert!(matches!(
        err,
        LedgerError::InsufficientStock { requested, available, .. }
            if requested == dec!(25) && available == dec!(20)
    ));
    assert_eq!(ledger.workflows.current_number("FACT", 2025).await.unwrap(), None);

    let position = ledger.position().await.unwrap();
    assert_eq!(position.total_stock, dec!(20));
    assert_eq!(batch_costs(&position), vec![(dec!(10), dec!(5)), (dec!(10), dec!(7))]);

    let sale = ledger.workflows.record_sale(&ledger.sale(dec!(1))).await.unwrap();
    assert_eq!(sale.document.number, 1);
}

#[tokio::test]
async fn test_failing_line_rolls_back_earlier_lines() {
    let ledger = Ledger::stocked().await;
    let scarce = StockableItem::packaging(ItemId::new());
    ledger
        .workflows
        .receive_goods(&ledger.receipt_of(scarce, dec!(1), dec!(2)))
        .await
        .unwrap();

    let err = ledger
        .workflows
        .record_sale(&ledger.sale_of(&[(ledger.item, dec!(5)), (scarce, dec!(5))]))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InsufficientStock { .. }));

    assert_eq!(ledger.position().await.unwrap().total_stock, dec!(20));
    let history = ledger
        .workflows
        .movement_history(&ledger.key(), PageRequest::default())
        .await
        .unwrap();
    assert_eq!(history.meta.total, 2);
}

#[tokio::test]
async fn test_unknown_series_persists_nothing() {
    let ledger = Ledger::new().await;
    let mut input = ledger.receipt(dec!(1), dec!(1));
    input.series = "BON".into();

    let err = ledger.workflows.receive_goods(&input).await.unwrap_err();
    assert!(matches!(err, LedgerError::SeriesNotFound(name) if name == "BON"));
    assert!(ledger.position().await.is_none());
}

#[tokio::test]
async fn test_draft_has_no_stock_effect_until_completed() {
    let ledger = Ledger::new().await;
    let mut input = ledger.receipt(dec!(4), dec!(3));
    input.finalize = false;

    let draft = ledger.workflows.receive_goods(&input).await.unwrap();
    assert_eq!(draft.document.status, DocumentStatus::Draft);
    assert!(draft.movements.is_empty());
    assert!(ledger.position().await.is_none());
    assert_eq!(draft.document.completed_by, None);

    let approver = ActorId::new();
    let completed = ledger
        .workflows
        .complete(draft.document.id, approver)
        .await
        .unwrap();
    assert_eq!(completed.document.status, DocumentStatus::Completed);
    assert_eq!(completed.movements.len(), 1);
    assert_eq!(ledger.position().await.unwrap().total_stock, dec!(4));

    let stored = ledger.workflows.document(draft.document.id).await.unwrap().unwrap();
    assert_eq!(stored.status, DocumentStatus::Completed);
    assert_eq!(stored.completed_by, Some(approver));
    assert!(stored.completed_at.is_some());
    assert_eq!(stored.actor_id, ledger.actor);
    let recorded = ledger
        .workflows
        .movements_for_document(draft.document.id)
        .await
        .unwrap();
    assert_eq!(recorded, completed.movements);
}

#[tokio::test]
async fn test_completed_documents_are_immutable() {
    let ledger = Ledger::stocked().await;
    let sale = ledger.workflows.record_sale(&ledger.sale(dec!(1))).await.unwrap();

    let err = ledger
        .workflows
        .complete(sale.document.id, ledger.actor)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        LedgerError::InvalidTransition {
            from: DocumentStatus::Completed,
            to: DocumentStatus::Completed
        }
    ));

    let err = ledger
        .workflows
        .cancel(sale.document.id, ledger.actor)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidTransition { .. }));
}

#[tokio::test]
async fn test_cancelled_draft_keeps_its_number() {
    let ledger = Ledger::stocked().await;
    let mut input = ledger.sale(dec!(1));
    input.finalize = false;

    let draft = ledger.workflows.record_sale(&input).await.unwrap();
    let clerk = ActorId::new();
    let cancelled = ledger
        .workflows
        .cancel(draft.document.id, clerk)
        .await
        .unwrap();
    assert_eq!(cancelled.status, DocumentStatus::Cancelled);
    assert_eq!(cancelled.cancelled_by, Some(clerk));
    assert!(cancelled.cancelled_at.is_some());
    let stored = ledger.workflows.document(draft.document.id).await.unwrap().unwrap();
    assert_eq!(stored.cancelled_by, Some(clerk));

    let next = ledger.workflows.record_sale(&ledger.sale(dec!(1))).await.unwrap();
    assert_eq!(next.document.number, 2);
    assert_eq!(ledger.position().await.unwrap().total_stock, dec!(19));

    let err = ledger
        .workflows
        .complete(draft.document.id, ledger.actor)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidTransition { .. }));
}

#[tokio::test]
async fn test_return_requires_completed_sale() {
    let ledger = Ledger::stocked().await;
    let mut input = ledger.sale(dec!(2));
    input.finalize = false;
    let draft = ledger.workflows.record_sale(&input).await.unwrap();

    let mut ret = ReturnInput {
        series: "RET".into(),
        document_date: Ledger::date(),
        original_document_id: draft.document.id,
        reason: None,
        lines: Vec::new(),
        actor_id: ledger.actor,
        finalize: true,
    };
    assert!(matches!(
        ledger.workflows.record_return(&ret).await,
        Err(LedgerError::InvalidMovementIntent(_))
    ));

    ret.original_document_id = DocumentId::new();
    assert!(matches!(
        ledger.workflows.record_return(&ret).await,
        Err(LedgerError::DocumentNotFound(_))
    ));
}

#[tokio::test]
async fn test_return_line_must_belong_to_the_sale() {
    let ledger = Ledger::stocked().await;
    let first = ledger.workflows.record_sale(&ledger.sale(dec!(1))).await.unwrap();
    let second = ledger.workflows.record_sale(&ledger.sale(dec!(1))).await.unwrap();

    let mut input = ledger.return_of(&first, dec!(1));
    input.lines[0].original_movement_id = second.movements[0].id;
    assert!(matches!(
        ledger.workflows.record_return(&input).await,
        Err(LedgerError::InvalidMovementIntent(_))
    ));
}

#[tokio::test]
async fn test_draft_return_completes_later() {
    let ledger = Ledger::stocked().await;
    let sale = ledger.workflows.record_sale(&ledger.sale(dec!(12))).await.unwrap();

    let mut input = ledger.return_of(&sale, dec!(2));
    input.finalize = false;
    let draft = ledger.workflows.record_return(&input).await.unwrap();
    assert_eq!(ledger.position().await.unwrap().total_stock, dec!(8));

    let done = ledger
        .workflows
        .complete(draft.document.id, ledger.actor)
        .await
        .unwrap();
    assert_eq!(done.movements[0].total_cost, dec!(14));
    assert_eq!(ledger.position().await.unwrap().total_stock, dec!(10));
}

#[tokio::test]
async fn test_delivery_note_and_kind_check() {
    let ledger = Ledger::stocked().await;
    let mut input = ledger.sale(dec!(2));
    input.kind = DocumentKind::DeliveryNote;
    input.series = "AVIZ".into();
    let note = ledger.workflows.record_sale(&input).await.unwrap();
    assert_eq!(note.document.display_number(), "AVIZ-2025-000001");

    input.kind = DocumentKind::GoodsReceipt;
    assert!(matches!(
        ledger.workflows.record_sale(&input).await,
        Err(LedgerError::InvalidMovementIntent(_))
    ));
}

#[tokio::test]
async fn test_empty_document_rejected() {
    let ledger = Ledger::new().await;
    let mut input = ledger.receipt(dec!(1), dec!(1));
    input.lines.clear();
    assert!(matches!(
        ledger.workflows.receive_goods(&input).await,
        Err(LedgerError::InvalidMovementIntent(_))
    ));
    assert_eq!(ledger.workflows.current_number("NIR", 2025).await.unwrap(), None);
}

#[tokio::test]
async fn test_standalone_adjustment() {
    let ledger = Ledger::stocked().await;
    let intent = MovementIntent::adjustment(
        ledger.item,
        ledger.location,
        Direction::Decrease,
        dec!(12),
        "buc",
        None,
        ledger.actor,
    );
    let movement = ledger.workflows.record_movement(&intent).await.unwrap();
    assert_eq!(movement.total_cost, dec!(64));
    assert_eq!(movement.reference_document_id, None);
    assert_eq!(ledger.position().await.unwrap().total_stock, dec!(8));
}

#[tokio::test]
async fn test_valuation_follows_remaining_batches() {
    let ledger = Ledger::stocked().await;
    let value = ledger.workflows.valuation(&ledger.key()).await.unwrap().unwrap();
    assert_eq!(value.fifo_value, dec!(120));
    assert_eq!(value.average_unit_cost, Some(dec!(6)));

    ledger.workflows.record_sale(&ledger.sale(dec!(15))).await.unwrap();
    let value = ledger.workflows.valuation(&ledger.key()).await.unwrap().unwrap();
    assert_eq!(value.quantity, dec!(5));
    assert_eq!(value.fifo_value, dec!(35));

    ledger.workflows.record_sale(&ledger.sale(dec!(5))).await.unwrap();
    let value = ledger.workflows.valuation(&ledger.key()).await.unwrap().unwrap();
    assert!(value.fifo_value.is_zero());
    assert_eq!(value.average_unit_cost, None);
    let position = ledger.position().await.unwrap();
    assert_eq!(StockValuation::approximate_unit_cost(&position).unwrap(), dec!(7));
}

#[tokio::test]
async fn test_reads_are_idempotent_between_writes() {
    let ledger = Ledger::stocked().await;
    let first = ledger.position().await.unwrap();
    let second = ledger.position().await.unwrap();
    assert_eq!(first, second);

    ledger.workflows.record_sale(&ledger.sale(dec!(1))).await.unwrap();
    let third = ledger.position().await.unwrap();
    assert_ne!(first, third);
    assert_eq!(third, ledger.position().await.unwrap());
}

#[tokio::test]
async fn test_movement_history_pages() {
    let ledger = Ledger::stocked().await;
    for _ in 0..3 {
        ledger.workflows.record_sale(&ledger.sale(dec!(1))).await.unwrap();
    }

    let page = ledger
        .workflows
        .movement_history(&ledger.key(), PageRequest::new(2, 2))
        .await
        .unwrap();
    assert_eq!(page.meta.total, 5);
    assert_eq!(page.meta.total_pages, 3);
    assert_eq!(page.data.len(), 2);
    assert!(page.data.iter().all(|m| m.movement_type == MovementType::Consumption));
}
