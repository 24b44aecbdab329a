//! Document lifecycle shared by every workflow.
//!
//! Opening a document allocates its number and persists it; completing it
//! records one movement per line. Both happen in the caller's transaction.

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use stockledger_shared::types::{ActorId, DocumentId, LocationId};

use super::retry::UnitOfWork;
use super::types::WorkflowOutcome;
use super::{goods_receipt, sales, storno};
use crate::document::{DocumentKind, DocumentLine, DocumentService, DocumentStatus, StockDocument};
use crate::error::{LedgerError, LedgerResult};
use crate::movement::{MovementRecorder, StockMovement};
use crate::sequence::SequenceAllocator;
use crate::store::LedgerTx;

/// Header and lines of a document about to be numbered and persisted.
pub(crate) struct NewDocument {
    pub kind: DocumentKind,
    pub series: String,
    pub document_date: NaiveDate,
    pub location: LocationId,
    pub partner_reference: Option<String>,
    pub original_document_id: Option<DocumentId>,
    pub lines: Vec<DocumentLine>,
    pub actor_id: ActorId,
}

/// Allocates a number, persists the document and, if `finalize`, records
/// its movements.
pub(crate) async fn open_document<T: LedgerTx>(
    new: NewDocument,
    finalize: bool,
    recorder: &MovementRecorder,
    tx: &mut T,
) -> LedgerResult<WorkflowOutcome> {
    if new.lines.is_empty() {
        return Err(LedgerError::invalid("document has no lines"));
    }

    let year = new.document_date.year();
    let number = SequenceAllocator::allocate(&new.series, year, tx).await?;

    let mut document = StockDocument {
        id: DocumentId::new(),
        kind: new.kind,
        series_name: new.series,
        year,
        number,
        document_date: new.document_date,
        status: DocumentStatus::Draft,
        location: new.location,
        partner_reference: new.partner_reference,
        original_document_id: new.original_document_id,
        lines: new.lines,
        actor_id: new.actor_id,
        created_at: Utc::now(),
        completed_by: None,
        completed_at: None,
        cancelled_by: None,
        cancelled_at: None,
        version: 0,
    };
    if finalize {
        DocumentService::complete(document.status, document.actor_id)?.apply(&mut document);
    }
    document.version = tx.insert_document(&document).await?;

    let movements = if finalize {
        apply_movements(&document, recorder, tx).await?
    } else {
        Vec::new()
    };
    Ok(WorkflowOutcome {
        document,
        movements,
    })
}

/// Completes a draft and records its movements.
///
/// # Errors
///
/// `DocumentNotFound`, `InvalidTransition` for non-drafts, and anything
/// the recorder reports.
pub async fn complete_document<T: LedgerTx>(
    id: DocumentId,
    actor_id: ActorId,
    recorder: &MovementRecorder,
    tx: &mut T,
) -> LedgerResult<WorkflowOutcome> {
    let mut document = tx
        .load_document(id)
        .await?
        .ok_or(LedgerError::DocumentNotFound(id))?;
    DocumentService::complete(document.status, actor_id)?.apply(&mut document);
    document.version = tx.update_document(&document).await?;

    let movements = apply_movements(&document, recorder, tx).await?;
    Ok(WorkflowOutcome {
        document,
        movements,
    })
}

/// Cancels a draft. Its number stays consumed.
///
/// # Errors
///
/// `DocumentNotFound`, or `InvalidTransition` for non-drafts.
pub async fn cancel_document<T: LedgerTx>(
    id: DocumentId,
    actor_id: ActorId,
    tx: &mut T,
) -> LedgerResult<StockDocument> {
    let mut document = tx
        .load_document(id)
        .await?
        .ok_or(LedgerError::DocumentNotFound(id))?;
    DocumentService::cancel(document.status, actor_id)?.apply(&mut document);
    document.version = tx.update_document(&document).await?;
    Ok(document)
}

async fn apply_movements<T: LedgerTx>(
    document: &StockDocument,
    recorder: &MovementRecorder,
    tx: &mut T,
) -> LedgerResult<Vec<StockMovement>> {
    match document.kind {
        DocumentKind::GoodsReceipt => goods_receipt::record_lines(document, recorder, tx).await,
        DocumentKind::Invoice | DocumentKind::DeliveryNote => {
            sales::record_lines(document, recorder, tx).await
        }
        DocumentKind::ReturnNote => storno::record_lines(document, recorder, tx).await,
    }
}

/// Checks the fields every document line needs.
pub(crate) fn validate_line(
    line_no: u32,
    quantity: Decimal,
    unit_measure: &str,
) -> LedgerResult<()> {
    if quantity <= Decimal::ZERO {
        return Err(LedgerError::invalid(format!(
            "line {line_no}: quantity must be positive, got {quantity}"
        )));
    }
    if unit_measure.trim().is_empty() {
        return Err(LedgerError::invalid(format!(
            "line {line_no}: unit of measure is required"
        )));
    }
    Ok(())
}

pub(crate) struct CompleteDocument<'a> {
    pub id: DocumentId,
    pub actor_id: ActorId,
    pub recorder: &'a MovementRecorder,
}

#[async_trait]
impl<'a, T: LedgerTx> UnitOfWork<T> for CompleteDocument<'a> {
    type Output = WorkflowOutcome;

    async fn run(&self, tx: &mut T) -> LedgerResult<WorkflowOutcome> {
        complete_document(self.id, self.actor_id, self.recorder, tx).await
    }
}

pub(crate) struct CancelDocument {
    pub id: DocumentId,
    pub actor_id: ActorId,
}

#[async_trait]
impl<T: LedgerTx> UnitOfWork<T> for CancelDocument {
    type Output = StockDocument;

    async fn run(&self, tx: &mut T) -> LedgerResult<StockDocument> {
        cancel_document(self.id, self.actor_id, tx).await
    }
}
