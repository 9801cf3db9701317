//! Infinite-scroll list state.
//!
//! [`PaginatedAccumulator`] merges fetched pages into one list; an optional
//! [`ScrollGuard`] keeps the reader's position steady while appended pages
//! render.

mod accumulator;
mod scroll;

pub use accumulator::{AccumulatorState, PageApplied, PaginatedAccumulator, SequencePolicy};
pub use scroll::{ScrollGuard, Viewport, FRAME_INTERVAL, RESTORE_SCHEDULE};
