//! Conversions between `SeaORM` models and ledger domain types.

use chrono::Utc;
use sea_orm::ActiveValue::{NotSet, Set};
use stockledger_core::document::{DocumentLine, StockDocument};
use stockledger_core::inventory::{
    CostBatch, CostBreakdown, InventoryPosition, PositionKey, StockableItem,
};
use stockledger_core::movement::StockMovement;
use stockledger_core::sequence::DocumentSeries;
use stockledger_core::{LedgerError, LedgerResult};
use stockledger_shared::types::{
    ActorId, BatchId, DocumentId, ItemId, LocationId, MovementId, PositionId,
};
use uuid::Uuid;

use super::error::json_err;
use crate::entities::{
    cost_batches, document_series, inventory_positions, stock_documents, stock_movements,
};

// ========== Positions ==========

pub(crate) fn position_from_models(
    row: inventory_positions::Model,
    batches: Vec<cost_batches::Model>,
) -> LedgerResult<InventoryPosition> {
    let item = StockableItem::new(row.item_kind.into(), ItemId::from_uuid(row.item_id));
    let batches = batches
        .into_iter()
        .map(batch_from_model)
        .collect::<LedgerResult<Vec<_>>>()?;
    Ok(InventoryPosition {
        id: PositionId::from_uuid(row.id),
        key: PositionKey::new(item, LocationId::from_uuid(row.location_id)),
        unit_measure: row.unit_measure,
        total_stock: row.total_stock,
        max_purchase_price: row.max_purchase_price,
        batches,
        version: row.version,
    })
}

fn batch_from_model(row: cost_batches::Model) -> LedgerResult<CostBatch> {
    let ordinal = u32::try_from(row.ordinal)
        .map_err(|_| LedgerError::Store(format!("batch {} has negative ordinal", row.id)))?;
    Ok(CostBatch {
        batch_id: BatchId::from_uuid(row.id),
        quantity_remaining: row.quantity_remaining,
        unit_cost: row.unit_cost,
        acquired_at: row.acquired_at,
        source_movement_id: MovementId::from_uuid(row.source_movement_id),
        ordinal,
    })
}

pub(crate) fn new_position_model(
    position: &InventoryPosition,
    version: i64,
) -> inventory_positions::ActiveModel {
    let now = Utc::now();
    inventory_positions::ActiveModel {
        id: Set(position.id.into_inner()),
        item_kind: Set(position.key.item.kind.into()),
        item_id: Set(position.key.item.id.into_inner()),
        location_id: Set(position.key.location.into_inner()),
        unit_measure: Set(position.unit_measure.clone()),
        total_stock: Set(position.total_stock),
        max_purchase_price: Set(position.max_purchase_price),
        version: Set(version),
        created_at: Set(now),
        updated_at: Set(now),
    }
}

pub(crate) fn batch_model(
    position_id: Uuid,
    batch: &CostBatch,
) -> LedgerResult<cost_batches::ActiveModel> {
    let ordinal = i32::try_from(batch.ordinal)
        .map_err(|_| LedgerError::Store(format!("batch {} ordinal out of range", batch.batch_id)))?;
    Ok(cost_batches::ActiveModel {
        id: Set(batch.batch_id.into_inner()),
        position_id: Set(position_id),
        quantity_remaining: Set(batch.quantity_remaining),
        unit_cost: Set(batch.unit_cost),
        acquired_at: Set(batch.acquired_at),
        source_movement_id: Set(batch.source_movement_id.into_inner()),
        ordinal: Set(ordinal),
    })
}

// ========== Movements ==========

pub(crate) fn movement_from_model(row: stock_movements::Model) -> LedgerResult<StockMovement> {
    let cost_breakdown: CostBreakdown =
        serde_json::from_value(row.cost_breakdown).map_err(json_err)?;
    Ok(StockMovement {
        id: MovementId::from_uuid(row.id),
        item: StockableItem::new(row.item_kind.into(), ItemId::from_uuid(row.item_id)),
        location: LocationId::from_uuid(row.location_id),
        movement_type: row.movement_type.into(),
        direction: row.direction.into(),
        quantity: row.quantity,
        unit_measure: row.unit_measure,
        unit_cost: row.unit_cost,
        total_cost: row.total_cost,
        cost_breakdown,
        reference_document_id: row.reference_document_id.map(DocumentId::from_uuid),
        reversed_movement_id: row.reversed_movement_id.map(MovementId::from_uuid),
        actor_id: ActorId::from_uuid(row.actor_id),
        timestamp: row.occurred_at,
    })
}

pub(crate) fn movement_model(
    movement: &StockMovement,
) -> LedgerResult<stock_movements::ActiveModel> {
    let cost_breakdown = serde_json::to_value(&movement.cost_breakdown).map_err(json_err)?;
    Ok(stock_movements::ActiveModel {
        id: Set(movement.id.into_inner()),
        seq: NotSet,
        item_kind: Set(movement.item.kind.into()),
        item_id: Set(movement.item.id.into_inner()),
        location_id: Set(movement.location.into_inner()),
        movement_type: Set(movement.movement_type.into()),
        direction: Set(movement.direction.into()),
        quantity: Set(movement.quantity),
        unit_measure: Set(movement.unit_measure.clone()),
        unit_cost: Set(movement.unit_cost),
        total_cost: Set(movement.total_cost),
        cost_breakdown: Set(cost_breakdown),
        reference_document_id: Set(movement.reference_document_id.map(DocumentId::into_inner)),
        reversed_movement_id: Set(movement.reversed_movement_id.map(MovementId::into_inner)),
        actor_id: Set(movement.actor_id.into_inner()),
        occurred_at: Set(movement.timestamp),
    })
}

// ========== Series ==========

pub(crate) fn series_from_model(row: document_series::Model) -> DocumentSeries {
    DocumentSeries {
        name: row.name,
        description: row.description,
        active: row.active,
    }
}

pub(crate) fn series_model(series: &DocumentSeries) -> document_series::ActiveModel {
    let now = Utc::now();
    document_series::ActiveModel {
        name: Set(series.name.clone()),
        description: Set(series.description.clone()),
        active: Set(series.active),
        created_at: Set(now),
        updated_at: Set(now),
    }
}

// ========== Documents ==========

pub(crate) fn document_from_model(row: stock_documents::Model) -> LedgerResult<StockDocument> {
    let lines: Vec<DocumentLine> = serde_json::from_value(row.lines).map_err(json_err)?;
    Ok(StockDocument {
        id: DocumentId::from_uuid(row.id),
        kind: row.kind.into(),
        series_name: row.series_name,
        year: row.year,
        number: row.number,
        document_date: row.document_date,
        status: row.status.into(),
        location: LocationId::from_uuid(row.location_id),
        partner_reference: row.partner_reference,
        original_document_id: row.original_document_id.map(DocumentId::from_uuid),
        lines,
        actor_id: ActorId::from_uuid(row.actor_id),
        created_at: row.created_at,
        completed_by: row.completed_by.map(ActorId::from_uuid),
        completed_at: row.completed_at,
        cancelled_by: row.cancelled_by.map(ActorId::from_uuid),
        cancelled_at: row.cancelled_at,
        version: row.version,
    })
}

pub(crate) fn document_model(
    document: &StockDocument,
    version: i64,
) -> LedgerResult<stock_documents::ActiveModel> {
    let lines = serde_json::to_value(&document.lines).map_err(json_err)?;
    Ok(stock_documents::ActiveModel {
        id: Set(document.id.into_inner()),
        kind: Set(document.kind.into()),
        series_name: Set(document.series_name.clone()),
        year: Set(document.year),
        number: Set(document.number),
        document_date: Set(document.document_date),
        status: Set(document.status.into()),
        location_id: Set(document.location.into_inner()),
        partner_reference: Set(document.partner_reference.clone()),
        original_document_id: Set(document.original_document_id.map(DocumentId::into_inner)),
        lines: Set(lines),
        actor_id: Set(document.actor_id.into_inner()),
        created_at: Set(document.created_at),
        completed_by: Set(document.completed_by.map(ActorId::into_inner)),
        completed_at: Set(document.completed_at),
        cancelled_by: Set(document.cancelled_by.map(ActorId::into_inner)),
        cancelled_at: Set(document.cancelled_at),
        updated_at: Set(Utc::now()),
        version: Set(version),
    })
}
