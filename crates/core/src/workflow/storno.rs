//! Return / Storno: brings sold stock back at the cost it left with.
//!
//! Each return line names a consumption movement of a completed sale. The
//! returned quantity is cut from the end of that consumption's breakdown,
//! skipping whatever earlier returns already gave back, so repeated partial
//! returns never restore the same unit twice and never exceed what was sold.
//! Completing a return claims the original sale's version, which serializes
//! concurrent returns against the same sale.

use async_trait::async_trait;
use rust_decimal::Decimal;
use stockledger_shared::types::{DocumentId, MovementId};

use super::lifecycle::{NewDocument, open_document};
use super::retry::UnitOfWork;
use super::types::{ReturnInput, WorkflowOutcome};
use crate::document::{DocumentKind, DocumentLine, DocumentStatus, StockDocument};
use crate::error::{LedgerError, LedgerResult};
use crate::movement::{MovementIntent, MovementRecorder, MovementType, StockMovement};
use crate::store::LedgerTx;

/// Creates a return note against a completed sale inside `tx`; if
/// `input.finalize`, records one `ReturnIn` movement per line.
///
/// # Errors
///
/// `DocumentNotFound`/`MovementNotFound` for dangling references,
/// `InvalidMovementIntent` for non-returnable documents or over-returns.
pub async fn record_return<T: LedgerTx>(
    input: &ReturnInput,
    recorder: &MovementRecorder,
    tx: &mut T,
) -> LedgerResult<WorkflowOutcome> {
    let original = load_returnable(input.original_document_id, tx).await?;

    let mut lines = Vec::with_capacity(input.lines.len());
    for (line_no, line) in (1u32..).zip(&input.lines) {
        if line.quantity <= Decimal::ZERO {
            return Err(LedgerError::invalid(format!(
                "line {line_no}: quantity must be positive, got {}",
                line.quantity
            )));
        }
        let consumed = load_consumption(&original, line.original_movement_id, tx).await?;
        if line.quantity > consumed.quantity {
            return Err(LedgerError::invalid(format!(
                "line {line_no}: cannot return {} of a {} consumption",
                line.quantity, consumed.quantity
            )));
        }
        lines.push(DocumentLine {
            line_no,
            item: consumed.item,
            quantity: line.quantity,
            unit_measure: consumed.unit_measure.clone(),
            unit_cost: None,
            original_movement_id: Some(consumed.id),
        });
    }

    let new = NewDocument {
        kind: DocumentKind::ReturnNote,
        series: input.series.clone(),
        document_date: input.document_date,
        location: original.location,
        partner_reference: input.reason.clone(),
        original_document_id: Some(original.id),
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
    let original_id = document
        .original_document_id
        .ok_or_else(|| LedgerError::invalid("return note has no original document"))?;
    let mut original = load_returnable(original_id, tx).await?;
    original.version = tx.update_document(&original).await?;

    let mut movements = Vec::with_capacity(document.lines.len());
    for line in &document.lines {
        let movement_id = line.original_movement_id.ok_or_else(|| {
            LedgerError::invalid(format!("line {}: no original movement", line.line_no))
        })?;
        let consumed = load_consumption(&original, movement_id, tx).await?;

        let already_returned: Decimal = tx
            .movements_reversing(consumed.id)
            .await?
            .iter()
            .map(|m| m.quantity)
            .sum();
        let slice = consumed
            .cost_breakdown
            .take_from_end(already_returned, line.quantity)
            .ok_or_else(|| {
                LedgerError::invalid(format!(
                    "line {}: cannot return {} of movement {}, {} of {} already returned",
                    line.line_no, line.quantity, consumed.id, already_returned, consumed.quantity
                ))
            })?;

        let intent = MovementIntent::return_in(
            consumed.item,
            document.location,
            consumed.unit_measure.clone(),
            slice,
            Some(consumed.id),
            document.actor_id,
        )
        .with_reference(document.id);
        movements.push(recorder.record(&intent, tx).await?);
    }
    Ok(movements)
}

async fn load_returnable<T: LedgerTx>(id: DocumentId, tx: &mut T) -> LedgerResult<StockDocument> {
    let original = tx
        .load_document(id)
        .await?
        .ok_or(LedgerError::DocumentNotFound(id))?;
    if !original.kind.is_sale() {
        return Err(LedgerError::invalid(format!(
            "{} {} cannot be returned",
            original.kind,
            original.display_number()
        )));
    }
    if original.status != DocumentStatus::Completed {
        return Err(LedgerError::invalid(format!(
            "{} is {}, only completed sales can be returned",
            original.display_number(),
            original.status
        )));
    }
    Ok(original)
}

async fn load_consumption<T: LedgerTx>(
    original: &StockDocument,
    id: MovementId,
    tx: &mut T,
) -> LedgerResult<StockMovement> {
    let movement = tx
        .load_movement(id)
        .await?
        .ok_or(LedgerError::MovementNotFound(id))?;
    if movement.movement_type != MovementType::Consumption
        || movement.reference_document_id != Some(original.id)
    {
        return Err(LedgerError::invalid(format!(
            "movement {id} is not a consumption of {}",
            original.display_number()
        )));
    }
    Ok(movement)
}

pub(crate) struct RecordReturn<'a> {
    pub input: &'a ReturnInput,
    pub recorder: &'a MovementRecorder,
}

#[async_trait]
impl<'a, T: LedgerTx> UnitOfWork<T> for RecordReturn<'a> {
    type Output = WorkflowOutcome;

    async fn run(&self, tx: &mut T) -> LedgerResult<WorkflowOutcome> {
        record_return(self.input, self.recorder, tx).await
    }
}
