//! Digit statistics over a bounded tick window

use super::{DigitStat, StatsFilter, StatsSnapshot};
use crate::feed::Tick;
use crate::telemetry::{set_gauge, GaugeMetric};
use std::collections::VecDeque;
use tokio::sync::mpsc;

pub const MIN_WINDOW: usize = 100;
pub const MAX_WINDOW: usize = 5000;
pub const DEFAULT_WINDOW: usize = 1000;

/// Clamp a requested window capacity to [`MIN_WINDOW`, `MAX_WINDOW`]
pub fn clamp_window(n: usize) -> usize {
    n.clamp(MIN_WINDOW, MAX_WINDOW)
}

/// Compute per-digit statistics over a digit sequence.
///
/// Returns one entry per digit (indexed by digit) and the number of digits
/// that passed the filter. Rank ties keep ascending digit order: sorting is
/// stable, so among equal percentages the lower digit ranks first in both the
/// highest and the lowest ordering. No rank flags are set when nothing passed
/// the filter.
pub fn compute_stats(
    digits: impl IntoIterator<Item = u8>,
    filter: StatsFilter,
) -> (Vec<DigitStat>, usize) {
    let mut counts = [0usize; 10];
    let mut previous = None;
    for digit in digits {
        let digit = digit.min(9);
        if filter.includes(previous, digit) {
            counts[digit as usize] += 1;
        }
        previous = Some(digit);
    }

    let filtered: usize = counts.iter().sum();
    let mut stats: Vec<DigitStat> = (0..10u8)
        .map(|digit| {
            let count = counts[digit as usize];
            let percentage = if filtered == 0 {
                0.0
            } else {
                count as f64 / filtered as f64 * 100.0
            };
            DigitStat {
                count,
                percentage,
                ..DigitStat::empty(digit)
            }
        })
        .collect();

    if filtered > 0 {
        let mut order: Vec<usize> = (0..10).collect();
        order.sort_by(|&a, &b| stats[b].percentage.total_cmp(&stats[a].percentage));
        stats[order[0]].is_highest = true;
        stats[order[1]].is_second_highest = true;

        let mut order: Vec<usize> = (0..10).collect();
        order.sort_by(|&a, &b| stats[a].percentage.total_cmp(&stats[b].percentage));
        stats[order[0]].is_lowest = true;
        stats[order[1]].is_second_lowest = true;
    }

    (stats, filtered)
}

/// Rolling digit statistics
///
/// Ticks enter in arrival order and the oldest is evicted once the window is
/// full. Statistics are rebuilt from the whole window after every change.
pub struct DigitStatsAggregator {
    capacity: usize,
    filter: StatsFilter,
    window: VecDeque<Tick>,
    stats: Vec<DigitStat>,
    filtered_count: usize,
    listeners: Vec<mpsc::UnboundedSender<StatsSnapshot>>,
}

impl DigitStatsAggregator {
    /// Create an aggregator; `capacity` is clamped
    pub fn new(capacity: usize, filter: StatsFilter) -> Self {
        let capacity = clamp_window(capacity);
        let (stats, filtered_count) = compute_stats(std::iter::empty(), filter);
        Self {
            capacity,
            filter,
            window: VecDeque::with_capacity(capacity),
            stats,
            filtered_count,
            listeners: Vec::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self::new(capacity, StatsFilter::Raw)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn filter(&self) -> StatsFilter {
        self.filter
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    pub fn filtered_count(&self) -> usize {
        self.filtered_count
    }

    /// Current statistics, indexed by digit
    pub fn stats(&self) -> &[DigitStat] {
        &self.stats
    }

    /// Ticks in the window, oldest first
    pub fn ticks(&self) -> impl Iterator<Item = &Tick> {
        self.window.iter()
    }

    /// Register a listener for post-mutation snapshots
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<StatsSnapshot> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.listeners.push(tx);
        rx
    }

    /// Replace the window with the newest `capacity` ticks of `ticks`
    pub fn seed(&mut self, ticks: impl IntoIterator<Item = Tick>) {
        self.window = ticks.into_iter().collect();
        self.evict();
        self.refresh();
    }

    /// Append a tick.
    ///
    /// Returns false, leaving the window untouched, when the tick is not newer
    /// than the newest tick already held.
    pub fn push(&mut self, tick: Tick) -> bool {
        if let Some(newest) = self.window.back() {
            if tick.timestamp <= newest.timestamp {
                tracing::debug!(
                    epoch = tick.timestamp.timestamp(),
                    newest = newest.timestamp.timestamp(),
                    "Dropping stale tick"
                );
                return false;
            }
        }
        self.window.push_back(tick);
        self.evict();
        self.refresh();
        true
    }

    pub fn set_filter(&mut self, filter: StatsFilter) {
        if self.filter != filter {
            self.filter = filter;
            self.refresh();
        }
    }

    /// Change capacity (clamped), evicting the oldest ticks if needed
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = clamp_window(capacity);
        self.evict();
        self.refresh();
    }

    pub fn clear(&mut self) {
        self.window.clear();
        self.refresh();
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            stats: self.stats.clone(),
            filter: self.filter,
            window_len: self.window.len(),
            filtered_count: self.filtered_count,
        }
    }

    fn evict(&mut self) {
        while self.window.len() > self.capacity {
            self.window.pop_front();
        }
    }

    fn refresh(&mut self) {
        let (stats, filtered_count) =
            compute_stats(self.window.iter().map(|tick| tick.digit), self.filter);
        self.stats = stats;
        self.filtered_count = filtered_count;
        set_gauge(GaugeMetric::WindowLength, self.window.len() as f64);

        if !self.listeners.is_empty() {
            let snapshot = self.snapshot();
            self.listeners
                .retain(|listener| listener.send(snapshot.clone()).is_ok());
        }
    }
}

impl Default for DigitStatsAggregator {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW, StatsFilter::Raw)
    }
}
