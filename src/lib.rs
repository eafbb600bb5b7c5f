//! tick-digits: last-digit statistics over a live tick feed
//!
//! This library provides the core components for:
//! - Multiplexed WebSocket quote feed with history correlation and reconnection
//! - Rolling digit frequency statistics with run filters
//! - Contract settlement rules for rise/fall and digit predictions
//! - Open position tracking with live P&L
//! - Paper execution
//! - Logging and metrics

pub mod cli;
pub mod config;
pub mod contract;
pub mod digit;
pub mod execution;
pub mod feed;
pub mod position;
pub mod session;
pub mod stats;
pub mod telemetry;
pub mod ws;
