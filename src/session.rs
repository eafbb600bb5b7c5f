//! Live session for one symbol
//!
//! Seeds the statistics window from history, then fans each live tick out
//! to the position tracker and the statistics aggregator in arrival order.

use crate::execution::{TradeError, TradeExecutor, TradeRequest};
use crate::feed::{FeedError, Subscription, SubscriptionHandle, Tick, TickFeed};
use crate::position::{Position, PositionTracker};
use crate::stats::DigitStatsAggregator;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use uuid::Uuid;

/// How often time contracts are checked for expiry between ticks
const SETTLE_INTERVAL: Duration = Duration::from_secs(1);

/// Session errors
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Feed(#[from] FeedError),
    #[error(transparent)]
    Trade(#[from] TradeError),
    /// A trade needs a live price to enter at
    #[error("No tick received yet for {0}")]
    NoEntryTick(String),
    #[error("Trade symbol {requested} does not match session symbol {session}")]
    SymbolMismatch { requested: String, session: String },
}

pub struct Session<F: TickFeed + ?Sized> {
    feed: Arc<F>,
    symbol: String,
    aggregator: DigitStatsAggregator,
    tracker: PositionTracker,
    last_tick: Option<Tick>,
    handle: Option<SubscriptionHandle>,
}

impl<F: TickFeed + ?Sized> Session<F> {
    pub fn new(
        feed: Arc<F>,
        symbol: impl Into<String>,
        aggregator: DigitStatsAggregator,
        tracker: PositionTracker,
    ) -> Self {
        Self {
            feed,
            symbol: symbol.into(),
            aggregator,
            tracker,
            last_tick: None,
            handle: None,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn aggregator(&self) -> &DigitStatsAggregator {
        &self.aggregator
    }

    pub fn aggregator_mut(&mut self) -> &mut DigitStatsAggregator {
        &mut self.aggregator
    }

    pub fn tracker(&self) -> &PositionTracker {
        &self.tracker
    }

    pub fn tracker_mut(&mut self) -> &mut PositionTracker {
        &mut self.tracker
    }

    pub fn last_tick(&self) -> Option<&Tick> {
        self.last_tick.as_ref()
    }

    /// Seed the window from history and open the live subscription.
    ///
    /// A failed history request only leaves the window empty; an invalid
    /// symbol or a failed subscribe is returned.
    pub async fn start(&mut self) -> Result<Subscription, SessionError> {
        let count = self.aggregator.capacity();
        match self.feed.fetch_history(&self.symbol, count).await {
            Ok(history) => {
                tracing::info!(symbol = %self.symbol, ticks = history.len(), "Seeded digit window");
                self.last_tick = history.last().cloned();
                self.aggregator.seed(history);
            }
            Err(e @ FeedError::InvalidSymbol(_)) => return Err(e.into()),
            Err(e) => {
                tracing::warn!(symbol = %self.symbol, error = %e, "History unavailable, starting empty");
            }
        }

        let subscription = self.feed.subscribe_ticks(&self.symbol).await?;
        self.handle = Some(subscription.handle.clone());
        Ok(subscription)
    }

    /// Apply one live tick: positions first, then statistics
    pub fn apply(&mut self, tick: Tick) {
        if self
            .last_tick
            .as_ref()
            .is_some_and(|last| tick.timestamp <= last.timestamp)
        {
            tracing::debug!(symbol = %self.symbol, epoch_ms = tick.epoch_ms(), "Dropping stale tick");
            return;
        }
        self.tracker.on_tick(&self.symbol, &tick);
        self.aggregator.push(tick.clone());
        self.last_tick = Some(tick);
    }

    /// Submit a trade and track the accepted contract from the latest tick
    pub async fn place_trade(
        &mut self,
        executor: &dyn TradeExecutor,
        request: TradeRequest,
    ) -> Result<Uuid, SessionError> {
        if request.symbol != self.symbol {
            return Err(SessionError::SymbolMismatch {
                requested: request.symbol,
                session: self.symbol.clone(),
            });
        }
        let entry = self
            .last_tick
            .clone()
            .ok_or_else(|| SessionError::NoEntryTick(self.symbol.clone()))?;

        let receipt = executor.submit_trade(request.clone()).await?;
        let position = Position::from_trade(&request, &receipt, &entry);
        Ok(self.tracker.open(position))
    }

    /// Consume live ticks until the stream ends or `shutdown` flips to true
    pub async fn run(&mut self, mut subscription: Subscription, mut shutdown: watch::Receiver<bool>) {
        let mut settle = tokio::time::interval(SETTLE_INTERVAL);

        loop {
            tokio::select! {
                tick = subscription.recv() => match tick {
                    Some(tick) => self.apply(tick),
                    None => {
                        tracing::warn!(symbol = %self.symbol, "Tick stream ended");
                        break;
                    }
                },
                _ = settle.tick() => {
                    self.tracker.settle_due(Utc::now());
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        tracing::info!(symbol = %self.symbol, "Session stopping");
                        break;
                    }
                }
            }
        }

        self.stop().await;
    }

    /// Release the live subscription; idempotent
    pub async fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.feed.unsubscribe(&handle).await;
        }
    }
}
