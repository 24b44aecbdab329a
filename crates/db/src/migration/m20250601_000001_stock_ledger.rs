//! Stock ledger schema.
//!
//! Creates series and counters, positions with their cost batches, documents
//! and the append-only movement log.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // ============================================================
        // PART 1: NUMBERING
        // ============================================================
        db.execute_unprepared(DOCUMENT_SERIES_SQL).await?;
        db.execute_unprepared(DOCUMENT_SEQUENCE_COUNTERS_SQL).await?;

        // ============================================================
        // PART 2: COST BATCH STORE
        // ============================================================
        db.execute_unprepared(INVENTORY_POSITIONS_SQL).await?;
        db.execute_unprepared(COST_BATCHES_SQL).await?;

        // ============================================================
        // PART 3: DOCUMENTS & MOVEMENTS
        // ============================================================
        db.execute_unprepared(STOCK_DOCUMENTS_SQL).await?;
        db.execute_unprepared(STOCK_MOVEMENTS_SQL).await?;

        // ============================================================
        // PART 4: TRIGGERS
        // ============================================================
        db.execute_unprepared(TRIGGERS_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_ALL_SQL).await?;
        Ok(())
    }
}

// ============================================================
// SQL CONSTANTS
// ============================================================

const DOCUMENT_SERIES_SQL: &str = r"
CREATE TABLE document_series (
    name VARCHAR(32) PRIMARY KEY CHECK (name ~ '^[A-Z0-9_]+$'),
    description TEXT,
    active BOOLEAN NOT NULL DEFAULT TRUE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
";

const DOCUMENT_SEQUENCE_COUNTERS_SQL: &str = r"
CREATE TABLE document_sequence_counters (
    series_name VARCHAR(32) NOT NULL REFERENCES document_series(name),
    year INTEGER NOT NULL,
    current_number BIGINT NOT NULL CHECK (current_number > 0),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    PRIMARY KEY (series_name, year)
);
";

const INVENTORY_POSITIONS_SQL: &str = r"
CREATE TABLE inventory_positions (
    id UUID PRIMARY KEY,
    item_kind VARCHAR(16) NOT NULL CHECK (item_kind IN ('product', 'packaging')),
    item_id UUID NOT NULL,
    location_id UUID NOT NULL,
    unit_measure VARCHAR(32) NOT NULL,
    total_stock NUMERIC NOT NULL CHECK (total_stock >= 0),
    max_purchase_price NUMERIC NOT NULL CHECK (max_purchase_price >= 0),
    version BIGINT NOT NULL CHECK (version > 0),
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    CONSTRAINT uq_inventory_positions_item_location UNIQUE (item_kind, item_id, location_id)
);
";

const COST_BATCHES_SQL: &str = r"
CREATE TABLE cost_batches (
    id UUID PRIMARY KEY,
    position_id UUID NOT NULL REFERENCES inventory_positions(id),
    quantity_remaining NUMERIC NOT NULL CHECK (quantity_remaining >= 0),
    unit_cost NUMERIC NOT NULL CHECK (unit_cost >= 0),
    acquired_at TIMESTAMPTZ NOT NULL,
    source_movement_id UUID NOT NULL,
    ordinal INTEGER NOT NULL CHECK (ordinal >= 0)
);

CREATE INDEX idx_cost_batches_fifo
    ON cost_batches (position_id, acquired_at, source_movement_id, ordinal);
";

const STOCK_DOCUMENTS_SQL: &str = r"
CREATE TABLE stock_documents (
    id UUID PRIMARY KEY,
    kind VARCHAR(24) NOT NULL
        CHECK (kind IN ('goods_receipt', 'invoice', 'delivery_note', 'return_note')),
    series_name VARCHAR(32) NOT NULL REFERENCES document_series(name),
    year INTEGER NOT NULL,
    number BIGINT NOT NULL CHECK (number > 0),
    document_date DATE NOT NULL,
    status VARCHAR(16) NOT NULL CHECK (status IN ('draft', 'completed', 'cancelled')),
    location_id UUID NOT NULL,
    partner_reference TEXT,
    original_document_id UUID REFERENCES stock_documents(id),
    lines JSONB NOT NULL,
    actor_id UUID NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    completed_by UUID,
    completed_at TIMESTAMPTZ,
    cancelled_by UUID,
    cancelled_at TIMESTAMPTZ,
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    version BIGINT NOT NULL CHECK (version > 0),

    CONSTRAINT uq_stock_documents_number UNIQUE (series_name, year, number),
    CONSTRAINT chk_stock_documents_completed_audit CHECK (
        status <> 'completed' OR (completed_by IS NOT NULL AND completed_at IS NOT NULL)
    ),
    CONSTRAINT chk_stock_documents_cancelled_audit CHECK (
        status <> 'cancelled' OR (cancelled_by IS NOT NULL AND cancelled_at IS NOT NULL)
    )
);

CREATE INDEX idx_stock_documents_original ON stock_documents (original_document_id)
    WHERE original_document_id IS NOT NULL;
";

const STOCK_MOVEMENTS_SQL: &str = r"
CREATE TABLE stock_movements (
    id UUID PRIMARY KEY,
    seq BIGSERIAL NOT NULL UNIQUE,
    item_kind VARCHAR(16) NOT NULL CHECK (item_kind IN ('product', 'packaging')),
    item_id UUID NOT NULL,
    location_id UUID NOT NULL,
    movement_type VARCHAR(16) NOT NULL
        CHECK (movement_type IN ('receipt', 'consumption', 'return_in', 'adjustment')),
    direction VARCHAR(16) NOT NULL CHECK (direction IN ('increase', 'decrease')),
    quantity NUMERIC NOT NULL CHECK (quantity > 0),
    unit_measure VARCHAR(32) NOT NULL,
    unit_cost NUMERIC NOT NULL,
    total_cost NUMERIC NOT NULL,
    cost_breakdown JSONB NOT NULL,
    reference_document_id UUID REFERENCES stock_documents(id),
    reversed_movement_id UUID REFERENCES stock_movements(id),
    actor_id UUID NOT NULL,
    occurred_at TIMESTAMPTZ NOT NULL,

    CONSTRAINT chk_stock_movements_return_link
        CHECK (reversed_movement_id IS NULL OR movement_type = 'return_in')
);

CREATE INDEX idx_stock_movements_position
    ON stock_movements (item_kind, item_id, location_id, seq);
CREATE INDEX idx_stock_movements_document
    ON stock_movements (reference_document_id, seq) WHERE reference_document_id IS NOT NULL;
CREATE INDEX idx_stock_movements_reversed
    ON stock_movements (reversed_movement_id) WHERE reversed_movement_id IS NOT NULL;
";

const TRIGGERS_SQL: &str = r"
-- ============================================================
-- FUNCTION: prevent_stock_movement_mutation
-- Movements are an append-only log
-- ============================================================
CREATE OR REPLACE FUNCTION prevent_stock_movement_mutation()
RETURNS TRIGGER AS $$
BEGIN
    RAISE EXCEPTION 'stock_movements is append-only, % rejected for %', TG_OP, OLD.id;
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_stock_movements_append_only
BEFORE UPDATE OR DELETE ON stock_movements
FOR EACH ROW
EXECUTE FUNCTION prevent_stock_movement_mutation();

-- ============================================================
-- FUNCTION: prevent_finalized_document_change
-- Completed and cancelled documents never change status
-- ============================================================
CREATE OR REPLACE FUNCTION prevent_finalized_document_change()
RETURNS TRIGGER AS $$
BEGIN
    IF OLD.status <> 'draft' AND NEW.status <> OLD.status THEN
        RAISE EXCEPTION 'document % is %, status cannot change', OLD.id, OLD.status;
    END IF;
    RETURN NEW;
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_stock_documents_finalized
BEFORE UPDATE ON stock_documents
FOR EACH ROW
EXECUTE FUNCTION prevent_finalized_document_change();
";

const DROP_ALL_SQL: &str = r"
DROP TRIGGER IF EXISTS trg_stock_documents_finalized ON stock_documents;
DROP TRIGGER IF EXISTS trg_stock_movements_append_only ON stock_movements;
DROP FUNCTION IF EXISTS prevent_finalized_document_change();
DROP FUNCTION IF EXISTS prevent_stock_movement_mutation();
DROP TABLE IF EXISTS stock_movements;
DROP TABLE IF EXISTS stock_documents;
DROP TABLE IF EXISTS cost_batches;
DROP TABLE IF EXISTS inventory_positions;
DROP TABLE IF EXISTS document_sequence_counters;
DROP TABLE IF EXISTS document_series;
";
