//! Execution types

use crate::contract::{DurationType, Prediction};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A trade to be submitted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRequest {
    pub symbol: String,
    pub prediction: Prediction,
    /// Target digit for digit contracts
    pub barrier: Option<Decimal>,
    pub stake: Decimal,
    pub duration: u32,
    pub duration_type: DurationType,
}

/// Execution collaborator's answer to an accepted trade
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeReceipt {
    pub contract_id: String,
    /// Amount returned if the contract wins
    pub payout: Decimal,
    /// Amount charged
    pub buy_price: Decimal,
}

/// Trade execution errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TradeError {
    /// Stake must be positive
    #[error("Invalid stake: {0}")]
    InvalidStake(Decimal),
    /// Digit barrier contracts need a barrier
    #[error("{0} contract requires a barrier")]
    MissingBarrier(Prediction),
    /// Collaborator refused the trade
    #[error("Trade rejected: {0}")]
    Rejected(String),
}
