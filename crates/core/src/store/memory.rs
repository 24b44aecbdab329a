//! In-memory ledger store.
//!
//! Writes are buffered per transaction and published atomically on commit.
//! Positions and documents are checked against the committed version at
//! write time and again at commit; counters are guarded by one async lock
//! per `(series, year)` held until the transaction ends, which gives the same
//! serialization a row lock gives in Postgres.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use stockledger_shared::types::{DocumentId, MovementId, PageRequest, PageResponse};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use super::{LedgerStore, LedgerTx};
use crate::document::StockDocument;
use crate::error::{LedgerError, LedgerResult};
use crate::inventory::{InventoryPosition, PositionKey};
use crate::movement::StockMovement;
use crate::sequence::{DocumentSeries, SequenceCounter};

type CounterKey = (String, i32);

#[derive(Default)]
struct Committed {
    positions: HashMap<PositionKey, InventoryPosition>,
    movements: Vec<StockMovement>,
    series: HashMap<String, DocumentSeries>,
    counters: HashMap<CounterKey, i64>,
    documents: HashMap<DocumentId, StockDocument>,
}

#[derive(Default)]
struct Shared {
    committed: Mutex<Committed>,
    counter_locks: Mutex<HashMap<CounterKey, Arc<AsyncMutex<()>>>>,
}

fn poisoned<T>(_: PoisonError<T>) -> LedgerError {
    LedgerError::Store("memory store lock poisoned".to_string())
}

impl Shared {
    fn committed(&self) -> LedgerResult<MutexGuard<'_, Committed>> {
        self.committed.lock().map_err(poisoned)
    }

    fn counter_lock(&self, key: &CounterKey) -> LedgerResult<Arc<AsyncMutex<()>>> {
        let mut locks = self.counter_locks.lock().map_err(poisoned)?;
        Ok(Arc::clone(locks.entry(key.clone()).or_default()))
    }
}

/// Thread-safe in-memory implementation of [`LedgerStore`].
///
/// Cloning is cheap and clones share state.
#[derive(Clone, Default)]
pub struct MemoryLedgerStore {
    shared: Arc<Shared>,
}

impl MemoryLedgerStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every committed movement in commit order.
    ///
    /// # Errors
    ///
    /// Fails only if the store lock is poisoned.
    pub fn committed_movements(&self) -> LedgerResult<Vec<StockMovement>> {
        Ok(self.shared.committed()?.movements.clone())
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    type Tx = MemoryTx;

    async fn begin(&self) -> LedgerResult<MemoryTx> {
        Ok(MemoryTx {
            shared: Arc::clone(&self.shared),
            positions: HashMap::new(),
            documents: HashMap::new(),
            movements: Vec::new(),
            series: HashMap::new(),
            counters: HashMap::new(),
            counter_guards: Vec::new(),
        })
    }
}

/// A buffered versioned write: `value.version == expected + 1`.
struct Pending<T> {
    expected: i64,
    value: T,
}

/// Open transaction on a [`MemoryLedgerStore`].
pub struct MemoryTx {
    shared: Arc<Shared>,
    positions: HashMap<PositionKey, Pending<InventoryPosition>>,
    documents: HashMap<DocumentId, Pending<StockDocument>>,
    movements: Vec<StockMovement>,
    series: HashMap<String, DocumentSeries>,
    counters: HashMap<CounterKey, i64>,
    counter_guards: Vec<OwnedMutexGuard<()>>,
}

impl MemoryTx {
    fn all_movements<'a>(
        &'a self,
        committed: &'a Committed,
    ) -> impl Iterator<Item = &'a StockMovement> + 'a {
        committed.movements.iter().chain(self.movements.iter())
    }

    fn collect_movements(
        &self,
        filter: impl Fn(&StockMovement) -> bool,
    ) -> LedgerResult<Vec<StockMovement>> {
        let committed = self.shared.committed()?;
        Ok(self
            .all_movements(&committed)
            .filter(|m| filter(m))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl LedgerTx for MemoryTx {
    async fn load_position(
        &mut self,
        key: &PositionKey,
    ) -> LedgerResult<Option<InventoryPosition>> {
        if let Some(pending) = self.positions.get(key) {
            return Ok(Some(pending.value.clone()));
        }
        Ok(self.shared.committed()?.positions.get(key).cloned())
    }

    async fn save_position(&mut self, position: &InventoryPosition) -> LedgerResult<i64> {
        let expected = match self.positions.get(&position.key) {
            Some(pending) if pending.value.version == position.version => pending.expected,
            Some(_) => {
                return Err(LedgerError::ConcurrencyConflict(format!(
                    "position {} saved from a stale copy",
                    position.key
                )));
            }
            None => position.version,
        };

        let current = self
            .shared
            .committed()?
            .positions
            .get(&position.key)
            .map_or(0, |p| p.version);
        if current != expected {
            return Err(LedgerError::ConcurrencyConflict(format!(
                "position {} changed (expected version {expected}, found {current})",
                position.key
            )));
        }

        let mut value = position.clone();
        value.version = expected + 1;
        self.positions
            .insert(position.key, Pending { expected, value });
        Ok(expected + 1)
    }

    async fn append_movement(&mut self, movement: &StockMovement) -> LedgerResult<()> {
        self.movements.push(movement.clone());
        Ok(())
    }

    async fn load_movement(&mut self, id: MovementId) -> LedgerResult<Option<StockMovement>> {
        let committed = self.shared.committed()?;
        Ok(self.all_movements(&committed).find(|m| m.id == id).cloned())
    }

    async fn movements_reversing(&mut self, id: MovementId) -> LedgerResult<Vec<StockMovement>> {
        self.collect_movements(|m| m.reversed_movement_id == Some(id))
    }

    async fn movements_for_document(&mut self, id: DocumentId) -> LedgerResult<Vec<StockMovement>> {
        self.collect_movements(|m| m.reference_document_id == Some(id))
    }

    async fn movements_for_position(
        &mut self,
        key: &PositionKey,
        page: PageRequest,
    ) -> LedgerResult<PageResponse<StockMovement>> {
        let history = self.collect_movements(|m| m.position_key() == *key)?;
        let total = u64::try_from(history.len()).unwrap_or(u64::MAX);
        let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
        let limit = usize::try_from(page.limit()).unwrap_or(usize::MAX);
        let data = history.into_iter().skip(offset).take(limit).collect();
        Ok(PageResponse::new(data, page, total))
    }

    async fn register_series(&mut self, series: &DocumentSeries) -> LedgerResult<()> {
        self.series.insert(series.name.clone(), series.clone());
        Ok(())
    }

    async fn find_series(&mut self, name: &str) -> LedgerResult<Option<DocumentSeries>> {
        if let Some(series) = self.series.get(name) {
            return Ok(Some(series.clone()));
        }
        Ok(self.shared.committed()?.series.get(name).cloned())
    }

    async fn increment_counter(&mut self, series: &str, year: i32) -> LedgerResult<i64> {
        let key = (series.to_string(), year);
        if let Some(number) = self.counters.get_mut(&key) {
            *number += 1;
            return Ok(*number);
        }

        let lock = self.shared.counter_lock(&key)?;
        let guard = lock.lock_owned().await;
        self.counter_guards.push(guard);

        let current = self
            .shared
            .committed()?
            .counters
            .get(&key)
            .copied()
            .unwrap_or(0);
        let next = current + 1;
        self.counters.insert(key, next);
        Ok(next)
    }

    async fn current_counter(
        &mut self,
        series: &str,
        year: i32,
    ) -> LedgerResult<Option<SequenceCounter>> {
        let key = (series.to_string(), year);
        let number = match self.counters.get(&key) {
            Some(n) => Some(*n),
            None => self.shared.committed()?.counters.get(&key).copied(),
        };
        Ok(number.map(|current_number| SequenceCounter {
            year,
            current_number,
        }))
    }

    async fn insert_document(&mut self, document: &StockDocument) -> LedgerResult<i64> {
        let exists = self.documents.contains_key(&document.id)
            || self.shared.committed()?.documents.contains_key(&document.id);
        if exists {
            return Err(LedgerError::ConcurrencyConflict(format!(
                "document {} already exists",
                document.id
            )));
        }

        let mut value = document.clone();
        value.version = 1;
        self.documents
            .insert(document.id, Pending { expected: 0, value });
        Ok(1)
    }

    async fn load_document(&mut self, id: DocumentId) -> LedgerResult<Option<StockDocument>> {
        if let Some(pending) = self.documents.get(&id) {
            return Ok(Some(pending.value.clone()));
        }
        Ok(self.shared.committed()?.documents.get(&id).cloned())
    }

    async fn update_document(&mut self, document: &StockDocument) -> LedgerResult<i64> {
        let expected = match self.documents.get(&document.id) {
            Some(pending) if pending.value.version == document.version => pending.expected,
            Some(_) => {
                return Err(LedgerError::ConcurrencyConflict(format!(
                    "document {} saved from a stale copy",
                    document.id
                )));
            }
            None => document.version,
        };

        let current = self
            .shared
            .committed()?
            .documents
            .get(&document.id)
            .map(|d| d.version);
        match current {
            None if expected == 0 => {}
            None => return Err(LedgerError::DocumentNotFound(document.id)),
            Some(v) if v == expected => {}
            Some(v) => {
                return Err(LedgerError::ConcurrencyConflict(format!(
                    "document {} changed (expected version {expected}, found {v})",
                    document.id
                )));
            }
        }

        let mut value = document.clone();
        value.version = expected + 1;
        self.documents
            .insert(document.id, Pending { expected, value });
        Ok(expected + 1)
    }

    async fn commit(self) -> LedgerResult<()> {
        let Self {
            shared,
            positions,
            documents,
            movements,
            series,
            counters,
            counter_guards,
        } = self;

        let mut committed = shared.committed()?;

        for (key, pending) in &positions {
            let current = committed.positions.get(key).map_or(0, |p| p.version);
            if current != pending.expected {
                return Err(LedgerError::ConcurrencyConflict(format!(
                    "position {key} changed before commit"
                )));
            }
        }
        for (id, pending) in &documents {
            let current = committed.documents.get(id).map_or(0, |d| d.version);
            if current != pending.expected {
                return Err(LedgerError::ConcurrencyConflict(format!(
                    "document {id} changed before commit"
                )));
            }
        }

        for (key, pending) in positions {
            committed.positions.insert(key, pending.value);
        }
        for (id, pending) in documents {
            committed.documents.insert(id, pending.value);
        }
        committed.movements.extend(movements);
        committed.series.extend(series);
        committed.counters.extend(counters);

        drop(committed);
        drop(counter_guards);
        Ok(())
    }

    async fn rollback(self) -> LedgerResult<()> {
        Ok(())
    }
}
