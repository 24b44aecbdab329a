//! Movement Recorder: the single entry point that changes stock.
//!
//! This module implements:
//! - The closed movement taxonomy (receipt, consumption, return, adjustment)
//! - Movement intents and their validation
//! - Immutable stock movement records
//! - The recorder applying FIFO consumption and cost-preserving reversal

pub mod recorder;
pub mod types;
pub mod validation;

pub use recorder::{MovementRecorder, RecorderOptions};
pub use types::{Direction, MovementIntent, MovementType, StockMovement};
pub use validation::MovementValidator;
