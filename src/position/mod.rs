//! Live position tracking
//!
//! Applies each tick to open positions, settles them when their duration
//! completes, and derives aggregate P&L from the tracked set.

mod tracker;
mod types;

pub use tracker::PositionTracker;
pub use types::{Position, TrackerEvent};
