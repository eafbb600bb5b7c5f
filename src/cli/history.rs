//! History command implementation

use super::render_stats;
use crate::config::Config;
use crate::feed::FeedClient;
use crate::stats::{compute_stats, StatsFilter};
use clap::Args;

#[derive(Args, Debug)]
pub struct HistoryArgs {
    #[arg(short, long, default_value = "R_100")]
    pub symbol: String,

    /// Number of recent ticks to fetch
    #[arg(short = 'n', long, default_value_t = 1000)]
    pub count: usize,

    /// Statistics filter (overrides config)
    #[arg(short, long, value_enum)]
    pub filter: Option<StatsFilter>,

    /// Print every tick, not just the summary
    #[arg(short, long)]
    pub verbose: bool,
}

impl HistoryArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let client = FeedClient::new(&config.feed);
        let result = client.fetch_history(&self.symbol, self.count).await;
        client.shutdown().await;
        let ticks = result?;

        if self.verbose {
            for tick in &ticks {
                println!("{}  {:>12}  {}", tick.timestamp, tick.price, tick.digit);
            }
        }

        let filter = self.filter.unwrap_or(config.stats.filter);
        let (stats, counted) = compute_stats(ticks.iter().map(|t| t.digit), filter);
        println!("{} ticks for {}, {} counted", ticks.len(), self.symbol, counted);
        print!("{}", render_stats(&stats));
        Ok(())
    }
}
