//! Stock-affecting business documents.
//!
//! This module implements:
//! - Document kinds (goods receipt, invoice, delivery note, return note)
//! - The document status state machine (draft, completed, cancelled)
//! - Document headers and lines as persisted alongside their movements

pub mod service;
pub mod types;

pub use service::{DocumentAction, DocumentService};
pub use types::{DocumentKind, DocumentLine, DocumentStatus, StockDocument};
