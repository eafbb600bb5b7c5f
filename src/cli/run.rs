//! Run command implementation

use super::{render_stats, summarize};
use crate::config::Config;
use crate::contract::{ContractEvaluator, DurationType, Prediction};
use crate::execution::{PaperExecutor, TradeRequest};
use crate::feed::FeedClient;
use crate::position::{PositionTracker, TrackerEvent};
use crate::session::Session;
use crate::stats::{DigitStatsAggregator, StatsFilter};
use clap::Args;
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Symbol to stream
    #[arg(short, long, default_value = "R_100")]
    pub symbol: String,

    /// Window size in ticks (overrides config)
    #[arg(short, long)]
    pub window: Option<usize>,

    /// Statistics filter (overrides config)
    #[arg(short, long, value_enum)]
    pub filter: Option<StatsFilter>,

    /// Open a paper contract with this prediction once the window is seeded
    #[arg(long)]
    pub trade: Option<Prediction>,

    /// Digit barrier for OVER/UNDER/MATCHES/DIFFERS
    #[arg(long)]
    pub barrier: Option<Decimal>,

    #[arg(long, default_value = "1")]
    pub stake: Decimal,

    /// Contract duration in ticks, or seconds with --timed
    #[arg(long, default_value_t = 5)]
    pub duration: u32,

    #[arg(long)]
    pub timed: bool,
}

impl RunArgs {
    /// Paper trade described by the flags, if any
    pub fn trade_request(&self) -> Option<TradeRequest> {
        let prediction = self.trade?;
        Some(TradeRequest {
            symbol: self.symbol.clone(),
            prediction,
            barrier: self.barrier,
            stake: self.stake,
            duration: self.duration,
            duration_type: if self.timed {
                DurationType::Time
            } else {
                DurationType::Ticks
            },
        })
    }

    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let window = self.window.unwrap_or(config.stats.window_size);
        let filter = self.filter.unwrap_or(config.stats.filter);

        let client = Arc::new(FeedClient::new(&config.feed));
        client.validate_symbol(&self.symbol)?;
        client.connect().await?;

        let mut aggregator = DigitStatsAggregator::new(window, filter);
        let mut snapshots = aggregator.subscribe();
        let mut tracker =
            PositionTracker::new(ContractEvaluator::new(config.tracker.pip_decimals));
        let mut events = tracker.subscribe();

        let mut session = Session::new(client.clone(), &self.symbol, aggregator, tracker);
        let subscription = session.start().await?;
        println!("{}", render_stats(session.aggregator().stats()));

        if let Some(request) = self.trade_request() {
            let executor = PaperExecutor::new(config.execution.payout_ratio);
            match session.place_trade(&executor, request).await {
                Ok(id) => tracing::info!(%id, "Paper position opened"),
                Err(e) => tracing::warn!(error = %e, "Paper trade not placed"),
            }
        }

        let symbol = self.symbol.clone();
        tokio::spawn(async move {
            while let Some(snapshot) = snapshots.recv().await {
                tracing::info!(%symbol, "{}", summarize(&snapshot));
            }
        });
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                match event {
                    TrackerEvent::PositionSettled(position) => tracing::info!(
                        contract_id = %position.contract_id,
                        status = ?position.status,
                        pnl = %position.pnl(),
                        "Contract settled"
                    ),
                    TrackerEvent::PnlUpdated(pnl) => tracing::debug!(%pnl, "P&L"),
                    TrackerEvent::PositionUpdated(position) => tracing::debug!(
                        contract_id = %position.contract_id,
                        winning = ?position.is_winning,
                        "Position updated"
                    ),
                }
            }
        });

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Received shutdown signal");
                let _ = shutdown_tx.send(true);
            }
        });

        session.run(subscription, shutdown_rx).await;
        client.shutdown().await;

        println!("{}", render_stats(session.aggregator().stats()));
        println!("{}", summarize(&session.aggregator().snapshot()));
        if !session.tracker().positions().is_empty() {
            println!("Total P&L: {}", session.tracker().total_pnl());
        }
        Ok(())
    }
}
