//! Sales Consumption: invoices and delivery notes take stock out FIFO.

use async_trait::async_trait;

use super::lifecycle::{NewDocument, open_document, validate_line};
use super::retry::UnitOfWork;
use super::types::{SalesInput, WorkflowOutcome};
use crate::document::{DocumentLine, StockDocument};
use crate::error::{LedgerError, LedgerResult};
use crate::movement::{MovementIntent, MovementRecorder, StockMovement};
use crate::store::LedgerTx;

/// Creates an invoice or delivery note inside `tx`; if `input.finalize`,
/// records one `Consumption` movement per line.
///
/// # Errors
///
/// `InvalidMovementIntent` for a non-sale kind or bad lines,
/// `InsufficientStock` if any line cannot be covered, plus series errors.
pub async fn record_sale<T: LedgerTx>(
    input: &SalesInput,
    recorder: &MovementRecorder,
    tx: &mut T,
) -> LedgerResult<WorkflowOutcome> {
    if !input.kind.is_sale() {
        return Err(LedgerError::invalid(format!(
            "{} is not a sales document",
            input.kind
        )));
    }

    let mut lines = Vec::with_capacity(input.lines.len());
    for (line_no, line) in (1u32..).zip(&input.lines) {
        validate_line(line_no, line.quantity, &line.unit_measure)?;
        lines.push(DocumentLine {
            line_no,
            item: line.item,
            quantity: line.quantity,
            unit_measure: line.unit_measure.clone(),
            unit_cost: None,
            original_movement_id: None,
        });
    }

    let new = NewDocument {
        kind: input.kind,
        series: input.series.clone(),
        document_date: input.document_date,
        location: input.location,
        partner_reference: input.client_reference.clone(),
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
        let intent = MovementIntent::consumption(
            line.item,
            document.location,
            line.quantity,
            line.unit_measure.clone(),
            document.actor_id,
        )
        .with_reference(document.id);
        movements.push(recorder.record(&intent, tx).await?);
    }
    Ok(movements)
}

pub(crate) struct RecordSale<'a> {
    pub input: &'a SalesInput,
    pub recorder: &'a MovementRecorder,
}

#[async_trait]
impl<'a, T: LedgerTx> UnitOfWork<T> for RecordSale<'a> {
    type Output = WorkflowOutcome;

    async fn run(&self, tx: &mut T) -> LedgerResult<WorkflowOutcome> {
        record_sale(self.input, self.recorder, tx).await
    }
}
