//! Gapless per-series, per-year number allocation.
//!
//! A number is allocated inside the caller's transaction and the counter row
//! stays locked until that transaction ends. If the transaction rolls back,
//! the increment rolls back with it and the number is handed out again; if
//! it commits, no other transaction can ever receive the same number.

use super::types::DocumentSeries;
use crate::error::{LedgerError, LedgerResult};
use crate::store::LedgerTx;

/// Stateless allocator over a [`LedgerTx`].
pub struct SequenceAllocator;

impl SequenceAllocator {
    /// Allocates the next number of `series_name` for `year`.
    ///
    /// The first allocation of a year returns 1.
    ///
    /// # Errors
    ///
    /// `SeriesNotFound` or `SeriesInactive` for unusable series;
    /// `ConcurrencyConflict` if the store gives up waiting for the counter.
    pub async fn allocate<T: LedgerTx>(
        series_name: &str,
        year: i32,
        tx: &mut T,
    ) -> LedgerResult<i64> {
        let series = tx
            .find_series(series_name)
            .await?
            .ok_or_else(|| LedgerError::SeriesNotFound(series_name.to_string()))?;
        if !series.active {
            return Err(LedgerError::SeriesInactive(series.name));
        }

        tx.increment_counter(series_name, year).await
    }

    /// Returns the last number allocated and committed (or allocated in
    /// `tx`) for `series_name` in `year`, without allocating.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn current<T: LedgerTx>(
        series_name: &str,
        year: i32,
        tx: &mut T,
    ) -> LedgerResult<Option<i64>> {
        Ok(tx
            .current_counter(series_name, year)
            .await?
            .map(|counter| counter.current_number))
    }

    /// Creates or replaces a series definition.
    ///
    /// # Errors
    ///
    /// `InvalidMovementIntent` for malformed names.
    pub async fn register<T: LedgerTx>(series: &DocumentSeries, tx: &mut T) -> LedgerResult<()> {
        DocumentSeries::validate_name(&series.name)?;
        tx.register_series(series).await
    }
}
