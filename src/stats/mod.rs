//! Rolling digit statistics
//!
//! Keeps a FIFO window of recent ticks and recomputes per-digit frequency,
//! percentage and rank extremes on every mutation.

mod aggregator;
mod types;

pub use aggregator::{
    clamp_window, compute_stats, DigitStatsAggregator, DEFAULT_WINDOW, MAX_WINDOW, MIN_WINDOW,
};
pub use types::{DigitStat, StatsFilter, StatsSnapshot};
