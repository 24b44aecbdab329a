//! Goods Receipt (NIR): brings stock in at the supplier's unit cost.

use async_trait::async_trait;
use rust_decimal::Decimal;

use super::lifecycle::{NewDocument, open_document, validate_line};
use super::retry::UnitOfWork;
use super::types::{GoodsReceiptInput, WorkflowOutcome};
use crate::document::{DocumentKind, DocumentLine, StockDocument};
use crate::error::{LedgerError, LedgerResult};
use crate::movement::{MovementIntent, MovementRecorder, StockMovement};
use crate::store::LedgerTx;

/// Creates a goods receipt note inside `tx`; if `input.finalize`, records one
/// `Receipt` movement per line.
///
/// # Errors
///
/// `InvalidMovementIntent` for bad lines, `SeriesNotFound`/`SeriesInactive`,
/// or anything the recorder reports.
pub async fn receive_goods<T: LedgerTx>(
    input: &GoodsReceiptInput,
    recorder: &MovementRecorder,
    tx: &mut T,
) -> LedgerResult<WorkflowOutcome> {
    let mut lines = Vec::with_capacity(input.lines.len());
    for (line_no, line) in (1u32..).zip(&input.lines) {
        validate_line(line_no, line.quantity, &line.unit_measure)?;
        if line.unit_cost < Decimal::ZERO {
            return Err(LedgerError::invalid(format!(
                "line {line_no}: unit cost cannot be negative, got {}",
                line.unit_cost
            )));
        }
        lines.push(DocumentLine {
            line_no,
            item: line.item,
            quantity: line.quantity,
            unit_measure: line.unit_measure.clone(),
            unit_cost: Some(line.unit_cost),
            original_movement_id: None,
        });
    }

    let new = NewDocument {
        kind: DocumentKind::GoodsReceipt,
        series: input.series.clone(),
        document_date: input.document_date,
        location: input.location,
        partner_reference: input.supplier_reference.clone(),
        original_document_id: None,
        lines,
        actor_id: input.actor_id,
    };
    open_document(new, input.finalize, recorder, tx).await
}

pub(crate) async fn record_lines<T: LedgerTx>(
    document: &StockDocument,
    recorder: &MovementRecorder,
    tx: &mut T,
) -> LedgerResult<Vec<StockMovement>> {
    let mut movements = Vec::with_capacity(document.lines.len());
    for line in &document.lines {
        let unit_cost = line.unit_cost.ok_or_else(|| {
            LedgerError::invalid(format!("line {}: receipt line has no unit cost", line.line_no))
        })?;
        let intent = MovementIntent::receipt(
            line.item,
            document.location,
            line.quantity,
            line.unit_measure.clone(),
            unit_cost,
            document.actor_id,
        )
        .with_reference(document.id);
        movements.push(recorder.record(&intent, tx).await?);
    }
    Ok(movements)
}

pub(crate) struct ReceiveGoods<'a> {
    pub input: &'a GoodsReceiptInput,
    pub recorder: &'a MovementRecorder,
}

#[async_trait]
impl<'a, T: LedgerTx> UnitOfWork<T> for ReceiveGoods<'a> {
    type Output = WorkflowOutcome;

    async fn run(&self, tx: &mut T) -> LedgerResult<WorkflowOutcome> {
        receive_goods(self.input, self.recorder, tx).await
    }
}
