//! Quote feed module
//!
//! A single multiplexed connection serving live tick subscriptions and
//! correlated history requests, with bounded linear-backoff reconnection.

mod client;
mod error;
pub mod protocol;
mod registry;
mod types;

pub use client::{FeedClient, FeedClientConfig, Subscription};
pub use error::FeedError;
pub use types::{ConnectionState, StreamKind, SubscriptionHandle, SubscriptionKey, Tick};

use async_trait::async_trait;

/// Trait for tick sources
#[async_trait]
pub trait TickFeed: Send + Sync {
    /// Subscribe to live ticks for a symbol
    async fn subscribe_ticks(&self, symbol: &str) -> Result<Subscription, FeedError>;
    /// Fetch the most recent `count` ticks
    async fn fetch_history(&self, symbol: &str, count: usize) -> Result<Vec<Tick>, FeedError>;
    /// Release a subscription
    async fn unsubscribe(&self, handle: &SubscriptionHandle);
}
