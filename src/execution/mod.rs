//! Trade execution module
//!
//! The execution service is an external collaborator: it accepts a trade
//! request and answers with a contract id and payout, or an error. The
//! paper executor stands in for it during dry runs.

mod paper;
mod types;

pub use paper::PaperExecutor;
pub use types::{TradeError, TradeReceipt, TradeRequest};

use async_trait::async_trait;

/// Trait for trade execution collaborators
#[async_trait]
pub trait TradeExecutor: Send + Sync {
    /// Submit a trade; on acceptance returns the contract receipt
    async fn submit_trade(&self, request: TradeRequest) -> Result<TradeReceipt, TradeError>;
}
