//! Transactional store seam.
//!
//! The ledger never talks to a database directly. Every operation runs
//! against a [`LedgerTx`] obtained from a [`LedgerStore`]; nothing written
//! through a transaction is visible to others until [`LedgerTx::commit`].
//!
//! Versioned writes (`save_position`, `update_document`) are optimistic: the
//! value carries the version it was loaded at and the store refuses the write
//! with [`LedgerError::ConcurrencyConflict`](crate::LedgerError) if another
//! transaction committed in between. Counter increments are pessimistic: the
//! counter stays locked until the incrementing transaction ends.

pub mod memory;

use async_trait::async_trait;
use stockledger_shared::types::{DocumentId, MovementId, PageRequest, PageResponse};

use crate::document::StockDocument;
use crate::error::LedgerResult;
use crate::inventory::{InventoryPosition, PositionKey};
use crate::movement::StockMovement;
use crate::sequence::{DocumentSeries, SequenceCounter};

pub use memory::{MemoryLedgerStore, MemoryTx};

/// Factory for ledger transactions.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Transaction type produced by this store.
    type Tx: LedgerTx;

    /// Opens a new transaction.
    async fn begin(&self) -> LedgerResult<Self::Tx>;
}

/// One open unit of work against the ledger store.
///
/// Dropping a transaction without committing discards its writes.
#[async_trait]
pub trait LedgerTx: Send + Sized {
    // ========== Positions ==========

    /// Loads a position with its batches in FIFO order.
    async fn load_position(&mut self, key: &PositionKey) -> LedgerResult<Option<InventoryPosition>>;

    /// Writes a position and its batches. Version 0 inserts.
    ///
    /// Returns the new version.
    async fn save_position(&mut self, position: &InventoryPosition) -> LedgerResult<i64>;

    // ========== Movements ==========

    /// Appends a movement. Movements are never updated or deleted.
    async fn append_movement(&mut self, movement: &StockMovement) -> LedgerResult<()>;

    /// Loads a movement by id.
    async fn load_movement(&mut self, id: MovementId) -> LedgerResult<Option<StockMovement>>;

    /// Returns the movements that reverse `id`, oldest first.
    async fn movements_reversing(&mut self, id: MovementId) -> LedgerResult<Vec<StockMovement>>;

    /// Returns the movements caused by a document, in recording order.
    async fn movements_for_document(&mut self, id: DocumentId) -> LedgerResult<Vec<StockMovement>>;

    /// Returns one page of a position's movement history, oldest first.
    async fn movements_for_position(
        &mut self,
        key: &PositionKey,
        page: PageRequest,
    ) -> LedgerResult<PageResponse<StockMovement>>;

    // ========== Sequences ==========

    /// Creates or replaces a series definition.
    async fn register_series(&mut self, series: &DocumentSeries) -> LedgerResult<()>;

    /// Looks up a series by name.
    async fn find_series(&mut self, name: &str) -> LedgerResult<Option<DocumentSeries>>;

    /// Increments the `(series, year)` counter, creating it at 1, and keeps
    /// it locked until this transaction ends.
    async fn increment_counter(&mut self, series: &str, year: i32) -> LedgerResult<i64>;

    /// Reads the `(series, year)` counter without locking it.
    async fn current_counter(
        &mut self,
        series: &str,
        year: i32,
    ) -> LedgerResult<Option<SequenceCounter>>;

    // ========== Documents ==========

    /// Inserts a new document. Returns its version (1).
    async fn insert_document(&mut self, document: &StockDocument) -> LedgerResult<i64>;

    /// Loads a document by id.
    async fn load_document(&mut self, id: DocumentId) -> LedgerResult<Option<StockDocument>>;

    /// Writes a document loaded at `document.version`. Returns the new version.
    async fn update_document(&mut self, document: &StockDocument) -> LedgerResult<i64>;

    // ========== Lifecycle ==========

    /// Makes every write of this transaction durable and visible.
    async fn commit(self) -> LedgerResult<()>;

    /// Discards every write of this transaction.
    async fn rollback(self) -> LedgerResult<()>;
}
