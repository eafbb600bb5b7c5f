//! Statistics types

use serde::{Deserialize, Serialize};

/// Which ticks of the window are counted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum StatsFilter {
    /// Every tick
    #[default]
    Raw,
    /// Ticks whose digit repeats the previous tick's digit; the first tick never counts
    MatchesRun,
    /// Every tick not counted by `MatchesRun`, including the first
    DiffersRun,
}

impl StatsFilter {
    /// Whether a tick with `digit` is counted, given the digit of the tick before it
    pub fn includes(self, previous: Option<u8>, digit: u8) -> bool {
        let repeats = previous == Some(digit);
        match self {
            StatsFilter::Raw => true,
            StatsFilter::MatchesRun => repeats,
            StatsFilter::DiffersRun => !repeats,
        }
    }
}

/// Frequency and rank of one digit over the filtered window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DigitStat {
    pub digit: u8,
    pub count: usize,
    /// Share of the filtered ticks, 0-100
    pub percentage: f64,
    pub is_highest: bool,
    pub is_second_highest: bool,
    pub is_lowest: bool,
    pub is_second_lowest: bool,
}

impl DigitStat {
    pub fn empty(digit: u8) -> Self {
        Self {
            digit,
            count: 0,
            percentage: 0.0,
            is_highest: false,
            is_second_highest: false,
            is_lowest: false,
            is_second_lowest: false,
        }
    }
}

/// Statistics published to listeners after every window mutation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsSnapshot {
    /// One entry per digit, indexed by digit
    pub stats: Vec<DigitStat>,
    pub filter: StatsFilter,
    pub window_len: usize,
    pub filtered_count: usize,
}
