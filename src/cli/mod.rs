//! CLI interface for tick-digits
//!
//! Provides subcommands for:
//! - `run`: Stream live digit statistics, optionally with a paper trade
//! - `history`: One-shot digit statistics over recent ticks
//! - `config`: Show the effective configuration

mod history;
mod run;

pub use history::HistoryArgs;
pub use run::RunArgs;

use crate::stats::{DigitStat, StatsSnapshot};
use clap::{Parser, Subcommand};
use std::fmt::Write;

#[derive(Parser, Debug)]
#[command(name = "tick-digits")]
#[command(about = "Last-digit statistics and contract tracking over a live tick feed")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Stream live digit statistics
    Run(RunArgs),
    /// Digit statistics over recent history
    History(HistoryArgs),
    /// Show configuration
    Config,
}

/// Render per-digit statistics as a table.
///
/// Markers: `++` highest, `+` second highest, `--` lowest, `-` second lowest.
pub fn render_stats(stats: &[DigitStat]) -> String {
    let mut out = String::from("digit  count      pct\n");
    for stat in stats {
        let marker = if stat.is_highest {
            "++"
        } else if stat.is_second_highest {
            "+"
        } else if stat.is_lowest {
            "--"
        } else if stat.is_second_lowest {
            "-"
        } else {
            ""
        };
        let _ = writeln!(
            out,
            "{:>5}  {:>5}  {:>6.2}% {}",
            stat.digit, stat.count, stat.percentage, marker
        );
    }
    out
}

/// One-line summary: hottest and coldest digits
pub fn summarize(snapshot: &StatsSnapshot) -> String {
    let find = |pred: fn(&DigitStat) -> bool| {
        snapshot
            .stats
            .iter()
            .find(|s| pred(s))
            .map(|s| format!("{} ({:.1}%)", s.digit, s.percentage))
            .unwrap_or_else(|| "-".to_string())
    };
    format!(
        "window={} counted={} high={} low={}",
        snapshot.window_len,
        snapshot.filtered_count,
        find(|s| s.is_highest),
        find(|s| s.is_lowest),
    )
}
