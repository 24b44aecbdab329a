//! Ledger error types.
//!
//! Every failure of the stock ledger aborts the enclosing transaction. Only
//! [`LedgerError::ConcurrencyConflict`] is eligible for an automatic replay
//! of that transaction; business-rule failures are surfaced verbatim.

use rust_decimal::Decimal;
use stockledger_shared::AppError;
use stockledger_shared::types::{DocumentId, LocationId, MovementId};
use thiserror::Error;

use crate::document::DocumentStatus;
use crate::inventory::StockableItem;

/// Result type alias using `LedgerError`.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    // ========== Business Rule Errors ==========
    /// A decrease would consume more than the position holds.
    #[error("Insufficient stock for {item} at {location}: requested {requested}, available {available}")]
    InsufficientStock {
        /// The item being consumed.
        item: StockableItem,
        /// The location of the position.
        location: LocationId,
        /// Quantity requested by the movement.
        requested: Decimal,
        /// Quantity on hand before the movement.
        available: Decimal,
    },

    /// Malformed movement or document input, rejected before any store access.
    #[error("Invalid movement intent: {0}")]
    InvalidMovementIntent(String),

    /// Allocation requested for an unregistered series.
    #[error("Document series not found: {0}")]
    SeriesNotFound(String),

    /// Allocation requested for a series that has been deactivated.
    #[error("Document series is inactive: {0}")]
    SeriesInactive(String),

    /// Attempted an invalid document status transition.
    #[error("Invalid document status transition from {from} to {to}")]
    InvalidTransition {
        /// The current status.
        from: DocumentStatus,
        /// The attempted target status.
        to: DocumentStatus,
    },

    /// Document not found.
    #[error("Document not found: {0}")]
    DocumentNotFound(DocumentId),

    /// Stock movement not found.
    #[error("Stock movement not found: {0}")]
    MovementNotFound(MovementId),

    // ========== Concurrency Errors ==========
    /// The store detected a write conflict on a position, counter or document.
    #[error("Concurrent modification detected: {0}")]
    ConcurrencyConflict(String),

    /// Conflicts persisted through every allowed attempt.
    #[error("Gave up after {attempts} attempts: {last}")]
    RetriesExhausted {
        /// Number of attempts made.
        attempts: u32,
        /// Description of the last conflict.
        last: String,
    },

    // ========== Store Errors ==========
    /// Underlying store failure.
    #[error("Store error: {0}")]
    Store(String),
}

impl LedgerError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InsufficientStock { .. } => "INSUFFICIENT_STOCK",
            Self::InvalidMovementIntent(_) => "INVALID_MOVEMENT_INTENT",
            Self::SeriesNotFound(_) => "SERIES_NOT_FOUND",
            Self::SeriesInactive(_) => "SERIES_INACTIVE",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::DocumentNotFound(_) => "DOCUMENT_NOT_FOUND",
            Self::MovementNotFound(_) => "MOVEMENT_NOT_FOUND",
            Self::ConcurrencyConflict(_) => "CONCURRENCY_CONFLICT",
            Self::RetriesExhausted { .. } => "RETRIES_EXHAUSTED",
            Self::Store(_) => "STORE_ERROR",
        }
    }

    /// Returns true if replaying the whole transaction may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrencyConflict(_))
    }

    /// Shorthand for an `InvalidMovementIntent` with a formatted message.
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidMovementIntent(msg.into())
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        let msg = err.to_string();
        match err {
            LedgerError::InsufficientStock { .. }
            | LedgerError::SeriesNotFound(_)
            | LedgerError::SeriesInactive(_)
            | LedgerError::InvalidTransition { .. } => Self::BusinessRule(msg),
            LedgerError::InvalidMovementIntent(_) => Self::Validation(msg),
            LedgerError::DocumentNotFound(_) | LedgerError::MovementNotFound(_) => {
                Self::NotFound(msg)
            }
            LedgerError::ConcurrencyConflict(_) | LedgerError::RetriesExhausted { .. } => {
                Self::Conflict(msg)
            }
            LedgerError::Store(_) => Self::Database(msg),
        }
    }
}
