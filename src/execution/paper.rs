//! Paper execution with simulated acceptance

use super::{TradeError, TradeExecutor, TradeReceipt, TradeRequest};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Accepts every well-formed trade at a fixed payout ratio
pub struct PaperExecutor {
    payout_ratio: Decimal,
    accepted: Arc<RwLock<Vec<TradeReceipt>>>,
}

impl PaperExecutor {
    /// Create a paper executor paying `payout_ratio` times the stake on a win
    pub fn new(payout_ratio: Decimal) -> Self {
        Self {
            payout_ratio,
            accepted: Arc::new(RwLock::new(vec![])),
        }
    }

    /// Receipts handed out so far
    pub async fn receipts(&self) -> Vec<TradeReceipt> {
        self.accepted.read().await.clone()
    }
}

#[async_trait]
impl TradeExecutor for PaperExecutor {
    async fn submit_trade(&self, request: TradeRequest) -> Result<TradeReceipt, TradeError> {
        if request.stake <= Decimal::ZERO {
            return Err(TradeError::InvalidStake(request.stake));
        }
        if request.prediction.needs_barrier() && request.barrier.is_none() {
            return Err(TradeError::MissingBarrier(request.prediction));
        }

        let mut accepted = self.accepted.write().await;
        let receipt = TradeReceipt {
            contract_id: format!("PAPER-{}", accepted.len() + 1),
            payout: (request.stake * self.payout_ratio).round_dp(2),
            buy_price: request.stake,
        };
        accepted.push(receipt.clone());

        tracing::info!(
            contract_id = %receipt.contract_id,
            symbol = %request.symbol,
            prediction = %request.prediction,
            stake = %request.stake,
            "Paper trade accepted"
        );
        Ok(receipt)
    }
}
