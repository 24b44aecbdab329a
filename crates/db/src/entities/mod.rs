//! `SeaORM` entity definitions for the stock ledger tables.

pub mod cost_batches;
pub mod document_sequence_counters;
pub mod document_series;
pub mod inventory_positions;
pub mod sea_orm_active_enums;
pub mod stock_documents;
pub mod stock_movements;
