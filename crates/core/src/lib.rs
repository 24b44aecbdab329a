//! Core stock ledger logic for Stockledger.
//!
//! This crate contains the inventory ledger and costing engine with ZERO web
//! or database dependencies. Persistence is reached only through the
//! [`store`] traits, so the same recorder and workflows run against the
//! in-memory store in tests and against PostgreSQL in production.
//!
//! # Modules
//!
//! - `inventory` - Cost batches, positions, FIFO consumption and reversal
//! - `movement` - Movement taxonomy, intent validation, the Movement Recorder
//! - `sequence` - Document series and the gapless Sequence Allocator
//! - `document` - Stock documents and their status state machine
//! - `workflow` - Goods receipt, sales consumption and return workflows
//! - `store` - Transactional store seam and the in-memory implementation

pub mod document;
pub mod error;
pub mod inventory;
pub mod movement;
pub mod sequence;
pub mod store;
pub mod workflow;

pub use error::{LedgerError, LedgerResult};
