//! Document series and counters.

use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, LedgerResult};

/// Longest accepted series name.
pub const MAX_SERIES_NAME_LEN: usize = 32;

/// A named numbering stream such as `NIR` or `FACT`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSeries {
    /// Unique series name.
    pub name: String,
    /// Human readable description.
    pub description: Option<String>,
    /// Inactive series refuse new allocations.
    pub active: bool,
}

impl DocumentSeries {
    /// Creates an active series.
    #[must_use]
    pub fn new(name: impl Into<String>, description: Option<String>) -> Self {
        Self {
            name: name.into(),
            description,
            active: true,
        }
    }

    /// Returns a copy marked inactive.
    #[must_use]
    pub fn deactivated(mut self) -> Self {
        self.active = false;
        self
    }

    /// Checks that a series name is usable in display numbers.
    ///
    /// # Errors
    ///
    /// Returns `InvalidMovementIntent` for empty, overlong or non
    /// `[A-Z0-9_]` names.
    pub fn validate_name(name: &str) -> LedgerResult<()> {
        if name.is_empty() || name.len() > MAX_SERIES_NAME_LEN {
            return Err(LedgerError::invalid(format!(
                "series name must be 1..={MAX_SERIES_NAME_LEN} characters"
            )));
        }
        if !name
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
        {
            return Err(LedgerError::invalid(format!(
                "series name {name} may only contain A-Z, 0-9 and _"
            )));
        }
        Ok(())
    }
}

/// Last number handed out for a `(series, year)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceCounter {
    /// Calendar year the counter covers.
    pub year: i32,
    /// Last allocated number; the next allocation returns this plus one.
    pub current_number: i64,
}
