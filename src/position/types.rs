//! Position types

use crate::contract::{DurationType, PositionStatus, Prediction};
use crate::execution::{TradeReceipt, TradeRequest};
use crate::feed::Tick;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A contract held from trade acceptance until explicit removal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub id: Uuid,
    /// Contract id from the execution collaborator
    pub contract_id: String,
    pub contract_type: String,
    pub symbol: String,
    pub entry_price: Decimal,
    pub entry_time: DateTime<Utc>,
    pub stake: Decimal,
    pub payout: Decimal,
    pub prediction: Prediction,
    pub barrier: Option<Decimal>,
    /// Ticks or seconds, per `duration_type`
    pub duration: u32,
    pub duration_type: DurationType,
    pub status: PositionStatus,
    pub current_price: Option<Decimal>,
    pub is_winning: Option<bool>,
    /// Ticks applied since entry
    pub ticks_elapsed: u32,
    /// Timestamp of the last applied tick
    pub last_tick_at: Option<DateTime<Utc>>,
}

impl Position {
    /// Build an open position from an accepted trade and its entry tick
    pub fn from_trade(request: &TradeRequest, receipt: &TradeReceipt, entry: &Tick) -> Self {
        Self {
            id: Uuid::new_v4(),
            contract_id: receipt.contract_id.clone(),
            contract_type: request.prediction.contract_type().to_string(),
            symbol: request.symbol.clone(),
            entry_price: entry.price,
            entry_time: entry.timestamp,
            stake: receipt.buy_price,
            payout: receipt.payout,
            prediction: request.prediction,
            barrier: request.barrier,
            duration: request.duration,
            duration_type: request.duration_type,
            status: PositionStatus::Open,
            current_price: None,
            is_winning: None,
            ticks_elapsed: 0,
            last_tick_at: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == PositionStatus::Open
    }

    /// Settlement time for time-based contracts
    pub fn expiry(&self) -> Option<DateTime<Utc>> {
        match self.duration_type {
            DurationType::Time => Some(self.entry_time + Duration::seconds(self.duration as i64)),
            DurationType::Ticks => None,
        }
    }

    /// P&L contribution: a win (or winning open contract) earns
    /// `payout - stake`, anything else loses the stake
    pub fn pnl(&self) -> Decimal {
        let winning = match self.status {
            PositionStatus::Won => true,
            PositionStatus::Lost => false,
            PositionStatus::Open => self.is_winning == Some(true),
        };
        if winning {
            self.payout - self.stake
        } else {
            -self.stake
        }
    }
}

/// Notifications published by the tracker
#[derive(Debug, Clone, PartialEq)]
pub enum TrackerEvent {
    /// Current price or winning state changed
    PositionUpdated(Position),
    /// Position moved to WON or LOST
    PositionSettled(Position),
    /// Aggregate P&L after a processed tick or settlement sweep
    PnlUpdated(Decimal),
}
