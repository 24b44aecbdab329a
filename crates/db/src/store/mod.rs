//! PostgreSQL implementation of the ledger store seam.
//!
//! One [`PgLedgerTx`] wraps one database transaction. Position and document
//! writes are optimistic (`UPDATE ... WHERE version = $expected`, zero rows
//! means another transaction won). Counter increments go through an
//! `INSERT ... ON CONFLICT DO UPDATE` upsert whose row lock is held until the
//! transaction ends, so concurrent allocations on one `(series, year)`
//! serialize and a rolled back allocation leaves no gap.

mod convert;
mod error;

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    DbBackend, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Statement,
    TransactionTrait,
};
use stockledger_core::document::StockDocument;
use stockledger_core::inventory::{InventoryPosition, PositionKey};
use stockledger_core::movement::StockMovement;
use stockledger_core::sequence::{DocumentSeries, SequenceCounter};
use stockledger_core::store::{LedgerStore, LedgerTx};
use stockledger_core::{LedgerError, LedgerResult};
use stockledger_shared::types::{ActorId, DocumentId, MovementId, PageRequest, PageResponse};
use tracing::{debug, warn};

use self::convert::{
    batch_model, document_from_model, document_model, movement_from_model, movement_model,
    new_position_model, position_from_models, series_from_model, series_model,
};
use self::error::map_db_err;
use crate::entities::sea_orm_active_enums::{DocumentStatus, ItemKind};
use crate::entities::{
    cost_batches, document_sequence_counters, document_series, inventory_positions,
    stock_documents, stock_movements,
};

const INCREMENT_COUNTER_SQL: &str = r"
INSERT INTO document_sequence_counters (series_name, year, current_number, updated_at)
VALUES ($1, $2, 1, NOW())
ON CONFLICT (series_name, year)
DO UPDATE SET current_number = document_sequence_counters.current_number + 1,
              updated_at = NOW()
RETURNING current_number
";

/// Ledger store backed by a PostgreSQL connection pool.
#[derive(Debug, Clone)]
pub struct PgLedgerStore {
    db: DatabaseConnection,
}

impl PgLedgerStore {
    /// Creates a store over an existing connection pool.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// The underlying connection pool.
    #[must_use]
    pub const fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    type Tx = PgLedgerTx;

    async fn begin(&self) -> LedgerResult<PgLedgerTx> {
        let txn = self.db.begin().await.map_err(map_db_err)?;
        Ok(PgLedgerTx { txn })
    }
}

/// An open PostgreSQL transaction. Dropping it rolls back.
pub struct PgLedgerTx {
    txn: DatabaseTransaction,
}

impl PgLedgerTx {
    fn position_query(key: &PositionKey) -> sea_orm::Select<inventory_positions::Entity> {
        inventory_positions::Entity::find()
            .filter(inventory_positions::Column::ItemKind.eq(ItemKind::from(key.item.kind)))
            .filter(inventory_positions::Column::ItemId.eq(key.item.id.into_inner()))
            .filter(inventory_positions::Column::LocationId.eq(key.location.into_inner()))
    }

    /// Makes the stored batches of a position match `position.batches`.
    ///
    /// Pruned batches are deleted; the rest are upserted by id.
    async fn sync_batches(&self, position: &InventoryPosition) -> LedgerResult<()> {
        let position_id = position.id.into_inner();
        let kept: Vec<_> = position
            .batches
            .iter()
            .map(|b| b.batch_id.into_inner())
            .collect();

        cost_batches::Entity::delete_many()
            .filter(cost_batches::Column::PositionId.eq(position_id))
            .filter(cost_batches::Column::Id.is_not_in(kept))
            .exec(&self.txn)
            .await
            .map_err(map_db_err)?;

        if position.batches.is_empty() {
            return Ok(());
        }

        let models = position
            .batches
            .iter()
            .map(|b| batch_model(position_id, b))
            .collect::<LedgerResult<Vec<_>>>()?;

        cost_batches::Entity::insert_many(models)
            .on_conflict(
                OnConflict::column(cost_batches::Column::Id)
                    .update_column(cost_batches::Column::QuantityRemaining)
                    .to_owned(),
            )
            .exec_without_returning(&self.txn)
            .await
            .map_err(map_db_err)?;
        Ok(())
    }
}

#[async_trait]
impl LedgerTx for PgLedgerTx {
    // ========== Positions ==========

    async fn load_position(
        &mut self,
        key: &PositionKey,
    ) -> LedgerResult<Option<InventoryPosition>> {
        let Some(row) = Self::position_query(key)
            .one(&self.txn)
            .await
            .map_err(map_db_err)?
        else {
            return Ok(None);
        };

        let batches = cost_batches::Entity::find()
            .filter(cost_batches::Column::PositionId.eq(row.id))
            .order_by_asc(cost_batches::Column::AcquiredAt)
            .order_by_asc(cost_batches::Column::SourceMovementId)
            .order_by_asc(cost_batches::Column::Ordinal)
            .all(&self.txn)
            .await
            .map_err(map_db_err)?;

        position_from_models(row, batches).map(Some)
    }

    async fn save_position(&mut self, position: &InventoryPosition) -> LedgerResult<i64> {
        let new_version = position.version + 1;

        if position.version == 0 {
            // A concurrent first receipt for the same key hits the unique
            // constraint and surfaces as a conflict.
            new_position_model(position, new_version)
                .insert(&self.txn)
                .await
                .map_err(map_db_err)?;
        } else {
            let result = inventory_positions::Entity::update_many()
                .col_expr(
                    inventory_positions::Column::UnitMeasure,
                    Expr::value(position.unit_measure.clone()),
                )
                .col_expr(
                    inventory_positions::Column::TotalStock,
                    Expr::value(position.total_stock),
                )
                .col_expr(
                    inventory_positions::Column::MaxPurchasePrice,
                    Expr::value(position.max_purchase_price),
                )
                .col_expr(inventory_positions::Column::Version, Expr::value(new_version))
                .col_expr(inventory_positions::Column::UpdatedAt, Expr::value(Utc::now()))
                .filter(inventory_positions::Column::Id.eq(position.id.into_inner()))
                .filter(inventory_positions::Column::Version.eq(position.version))
                .exec(&self.txn)
                .await
                .map_err(map_db_err)?;

            if result.rows_affected == 0 {
                warn!(
                    position = %position.key,
                    expected_version = position.version,
                    "Position changed concurrently"
                );
                return Err(LedgerError::ConcurrencyConflict(format!(
                    "position {} changed since version {}",
                    position.key, position.version
                )));
            }
        }

        self.sync_batches(position).await?;
        Ok(new_version)
    }

    // ========== Movements ==========

    async fn append_movement(&mut self, movement: &StockMovement) -> LedgerResult<()> {
        stock_movements::Entity::insert(movement_model(movement)?)
            .exec_without_returning(&self.txn)
            .await
            .map_err(map_db_err)?;
        Ok(())
    }

    async fn load_movement(&mut self, id: MovementId) -> LedgerResult<Option<StockMovement>> {
        stock_movements::Entity::find_by_id(id.into_inner())
            .one(&self.txn)
            .await
            .map_err(map_db_err)?
            .map(movement_from_model)
            .transpose()
    }

    async fn movements_reversing(&mut self, id: MovementId) -> LedgerResult<Vec<StockMovement>> {
        stock_movements::Entity::find()
            .filter(stock_movements::Column::ReversedMovementId.eq(id.into_inner()))
            .order_by_asc(stock_movements::Column::Seq)
            .all(&self.txn)
            .await
            .map_err(map_db_err)?
            .into_iter()
            .map(movement_from_model)
            .collect()
    }

    async fn movements_for_document(&mut self, id: DocumentId) -> LedgerResult<Vec<StockMovement>> {
        stock_movements::Entity::find()
            .filter(stock_movements::Column::ReferenceDocumentId.eq(id.into_inner()))
            .order_by_asc(stock_movements::Column::Seq)
            .all(&self.txn)
            .await
            .map_err(map_db_err)?
            .into_iter()
            .map(movement_from_model)
            .collect()
    }

    async fn movements_for_position(
        &mut self,
        key: &PositionKey,
        page: PageRequest,
    ) -> LedgerResult<PageResponse<StockMovement>> {
        let query = stock_movements::Entity::find()
            .filter(stock_movements::Column::ItemKind.eq(ItemKind::from(key.item.kind)))
            .filter(stock_movements::Column::ItemId.eq(key.item.id.into_inner()))
            .filter(stock_movements::Column::LocationId.eq(key.location.into_inner()));

        let total = query.clone().count(&self.txn).await.map_err(map_db_err)?;
        let data = query
            .order_by_asc(stock_movements::Column::Seq)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.txn)
            .await
            .map_err(map_db_err)?
            .into_iter()
            .map(movement_from_model)
            .collect::<LedgerResult<Vec<_>>>()?;

        Ok(PageResponse::new(data, page, total))
    }

    // ========== Sequences ==========

    async fn register_series(&mut self, series: &DocumentSeries) -> LedgerResult<()> {
        document_series::Entity::insert(series_model(series))
            .on_conflict(
                OnConflict::column(document_series::Column::Name)
                    .update_columns([
                        document_series::Column::Description,
                        document_series::Column::Active,
                        document_series::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&self.txn)
            .await
            .map_err(map_db_err)?;
        Ok(())
    }

    async fn find_series(&mut self, name: &str) -> LedgerResult<Option<DocumentSeries>> {
        let row = document_series::Entity::find_by_id(name.to_owned())
            .one(&self.txn)
            .await
            .map_err(map_db_err)?;
        Ok(row.map(series_from_model))
    }

    async fn increment_counter(&mut self, series: &str, year: i32) -> LedgerResult<i64> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            INCREMENT_COUNTER_SQL,
            [series.into(), year.into()],
        );
        let row = self
            .txn
            .query_one(stmt)
            .await
            .map_err(map_db_err)?
            .ok_or_else(|| {
                LedgerError::Store(format!("counter upsert for {series}/{year} returned no row"))
            })?;
        row.try_get::<i64>("", "current_number").map_err(map_db_err)
    }

    async fn current_counter(
        &mut self,
        series: &str,
        year: i32,
    ) -> LedgerResult<Option<SequenceCounter>> {
        let row = document_sequence_counters::Entity::find_by_id((series.to_owned(), year))
            .one(&self.txn)
            .await
            .map_err(map_db_err)?;
        Ok(row.map(|r| SequenceCounter {
            year: r.year,
            current_number: r.current_number,
        }))
    }

    // ========== Documents ==========

    async fn insert_document(&mut self, document: &StockDocument) -> LedgerResult<i64> {
        stock_documents::Entity::insert(document_model(document, 1)?)
            .exec_without_returning(&self.txn)
            .await
            .map_err(map_db_err)?;
        Ok(1)
    }

    async fn load_document(&mut self, id: DocumentId) -> LedgerResult<Option<StockDocument>> {
        stock_documents::Entity::find_by_id(id.into_inner())
            .one(&self.txn)
            .await
            .map_err(map_db_err)?
            .map(document_from_model)
            .transpose()
    }

    async fn update_document(&mut self, document: &StockDocument) -> LedgerResult<i64> {
        let new_version = document.version + 1;
        let lines = serde_json::to_value(&document.lines).map_err(error::json_err)?;

        let result = stock_documents::Entity::update_many()
            .col_expr(
                stock_documents::Column::Status,
                Expr::value(DocumentStatus::from(document.status)),
            )
            .col_expr(
                stock_documents::Column::PartnerReference,
                Expr::value(document.partner_reference.clone()),
            )
            .col_expr(stock_documents::Column::Lines, Expr::value(lines))
            .col_expr(
                stock_documents::Column::CompletedBy,
                Expr::value(document.completed_by.map(ActorId::into_inner)),
            )
            .col_expr(stock_documents::Column::CompletedAt, Expr::value(document.completed_at))
            .col_expr(
                stock_documents::Column::CancelledBy,
                Expr::value(document.cancelled_by.map(ActorId::into_inner)),
            )
            .col_expr(stock_documents::Column::CancelledAt, Expr::value(document.cancelled_at))
            .col_expr(stock_documents::Column::Version, Expr::value(new_version))
            .col_expr(stock_documents::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(stock_documents::Column::Id.eq(document.id.into_inner()))
            .filter(stock_documents::Column::Version.eq(document.version))
            .exec(&self.txn)
            .await
            .map_err(map_db_err)?;

        if result.rows_affected == 0 {
            warn!(
                document = %document.display_number(),
                expected_version = document.version,
                "Document changed concurrently"
            );
            return Err(LedgerError::ConcurrencyConflict(format!(
                "document {} changed since version {}",
                document.display_number(),
                document.version
            )));
        }
        Ok(new_version)
    }

    // ========== Lifecycle ==========

    async fn commit(self) -> LedgerResult<()> {
        self.txn.commit().await.map_err(map_db_err)?;
        debug!("Ledger transaction committed");
        Ok(())
    }

    async fn rollback(self) -> LedgerResult<()> {
        self.txn.rollback().await.map_err(map_db_err)?;
        debug!("Ledger transaction rolled back");
        Ok(())
    }
}
