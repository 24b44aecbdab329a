//! `DocumentWorkflows`: each call is one retried, atomic transaction.

use async_trait::async_trait;
use stockledger_shared::LedgerConfig;
use stockledger_shared::types::{ActorId, DocumentId, PageRequest, PageResponse};

use super::goods_receipt::ReceiveGoods;
use super::lifecycle::{CancelDocument, CompleteDocument};
use super::retry::{RetryPolicy, UnitOfWork, run_in_transaction};
use super::sales::RecordSale;
use super::storno::RecordReturn;
use super::types::{GoodsReceiptInput, ReturnInput, SalesInput, WorkflowOutcome};
use crate::document::StockDocument;
use crate::error::LedgerResult;
use crate::inventory::{InventoryPosition, PositionKey, StockValuation};
use crate::movement::{MovementIntent, MovementRecorder, RecorderOptions, StockMovement};
use crate::sequence::{DocumentSeries, SequenceAllocator};
use crate::store::{LedgerStore, LedgerTx};

/// Entry point for the document workflows over a [`LedgerStore`].
///
/// Every mutating call opens its own transaction, replays it on concurrency
/// conflicts according to the retry policy, and either commits everything
/// (number, document, movements) or nothing.
pub struct DocumentWorkflows<S: LedgerStore> {
    store: S,
    recorder: MovementRecorder,
    retry: RetryPolicy,
}

impl<S: LedgerStore> DocumentWorkflows<S> {
    /// Creates the workflows with settings from `config`.
    pub fn new(store: S, config: &LedgerConfig) -> Self {
        Self::with_parts(
            store,
            MovementRecorder::new(RecorderOptions::from(config)),
            RetryPolicy::from(config),
        )
    }

    /// Creates the workflows from explicit parts.
    pub fn with_parts(store: S, recorder: MovementRecorder, retry: RetryPolicy) -> Self {
        Self {
            store,
            recorder,
            retry,
        }
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Creates or replaces a document series.
    pub async fn register_series(&self, series: &DocumentSeries) -> LedgerResult<()> {
        run_in_transaction(&self.store, &self.retry, &RegisterSeries { series }).await
    }

    /// Goods Receipt (NIR).
    pub async fn receive_goods(&self, input: &GoodsReceiptInput) -> LedgerResult<WorkflowOutcome> {
        let work = ReceiveGoods {
            input,
            recorder: &self.recorder,
        };
        run_in_transaction(&self.store, &self.retry, &work).await
    }

    /// Sales Consumption (Invoice or Delivery Note).
    pub async fn record_sale(&self, input: &SalesInput) -> LedgerResult<WorkflowOutcome> {
        let work = RecordSale {
            input,
            recorder: &self.recorder,
        };
        run_in_transaction(&self.store, &self.retry, &work).await
    }

    /// Return / Storno against a completed sale.
    pub async fn record_return(&self, input: &ReturnInput) -> LedgerResult<WorkflowOutcome> {
        let work = RecordReturn {
            input,
            recorder: &self.recorder,
        };
        run_in_transaction(&self.store, &self.retry, &work).await
    }

    /// Completes a draft, recording its movements.
    pub async fn complete(
        &self,
        id: DocumentId,
        actor_id: ActorId,
    ) -> LedgerResult<WorkflowOutcome> {
        let work = CompleteDocument {
            id,
            actor_id,
            recorder: &self.recorder,
        };
        run_in_transaction(&self.store, &self.retry, &work).await
    }

    /// Cancels a draft.
    pub async fn cancel(&self, id: DocumentId, actor_id: ActorId) -> LedgerResult<StockDocument> {
        run_in_transaction(&self.store, &self.retry, &CancelDocument { id, actor_id }).await
    }

    /// Records a standalone movement, e.g. an inventory-count adjustment.
    pub async fn record_movement(&self, intent: &MovementIntent) -> LedgerResult<StockMovement> {
        let work = RecordMovement {
            intent,
            recorder: &self.recorder,
        };
        run_in_transaction(&self.store, &self.retry, &work).await
    }

    /// Current state of a position.
    pub async fn position(&self, key: &PositionKey) -> LedgerResult<Option<InventoryPosition>> {
        let mut tx = self.store.begin().await?;
        let result = tx.load_position(key).await;
        tx.rollback().await?;
        result
    }

    /// FIFO valuation of a position's remaining stock.
    pub async fn valuation(&self, key: &PositionKey) -> LedgerResult<Option<StockValuation>> {
        self.position(key)
            .await?
            .as_ref()
            .map(StockValuation::of)
            .transpose()
    }

    /// A document by id.
    pub async fn document(&self, id: DocumentId) -> LedgerResult<Option<StockDocument>> {
        let mut tx = self.store.begin().await?;
        let result = tx.load_document(id).await;
        tx.rollback().await?;
        result
    }

    /// Movements recorded for a document.
    pub async fn movements_for_document(&self, id: DocumentId) -> LedgerResult<Vec<StockMovement>> {
        let mut tx = self.store.begin().await?;
        let result = tx.movements_for_document(id).await;
        tx.rollback().await?;
        result
    }

    /// One page of a position's movement history, oldest first.
    pub async fn movement_history(
        &self,
        key: &PositionKey,
        page: PageRequest,
    ) -> LedgerResult<PageResponse<StockMovement>> {
        let mut tx = self.store.begin().await?;
        let result = tx.movements_for_position(key, page).await;
        tx.rollback().await?;
        result
    }

    /// Last committed number of a series in a year.
    pub async fn current_number(&self, series: &str, year: i32) -> LedgerResult<Option<i64>> {
        let mut tx = self.store.begin().await?;
        let result = SequenceAllocator::current(series, year, &mut tx).await;
        tx.rollback().await?;
        result
    }
}

struct RegisterSeries<'a> {
    series: &'a DocumentSeries,
}

#[async_trait]
impl<'a, T: LedgerTx> UnitOfWork<T> for RegisterSeries<'a> {
    type Output = ();

    async fn run(&self, tx: &mut T) -> LedgerResult<()> {
        SequenceAllocator::register(self.series, tx).await
    }
}

struct RecordMovement<'a> {
    intent: &'a MovementIntent,
    recorder: &'a MovementRecorder,
}

#[async_trait]
impl<'a, T: LedgerTx> UnitOfWork<T> for RecordMovement<'a> {
    type Output = StockMovement;

    async fn run(&self, tx: &mut T) -> LedgerResult<StockMovement> {
        self.recorder.record(self.intent, tx).await
    }
}
