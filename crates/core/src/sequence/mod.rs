//! Sequence Allocator: gapless document numbers per series and year.

pub mod allocator;
pub mod types;

pub use allocator::SequenceAllocator;
pub use types::{DocumentSeries, SequenceCounter};
