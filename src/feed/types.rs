//! Feed types

use crate::digit::extract_digit;
use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A single price observation from the feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    /// Last digit of the quote string, 0-9
    pub digit: u8,
    /// Quote as published
    pub price: Decimal,
    /// Feed epoch
    pub timestamp: DateTime<Utc>,
}

impl Tick {
    /// Build a tick from a quote string and an epoch in seconds.
    ///
    /// The digit is taken from `quote` as written, before decimal parsing.
    pub fn from_quote(quote: &str, epoch_secs: i64) -> Option<Self> {
        let price = Decimal::from_str(quote.trim()).ok()?;
        let timestamp = Utc.timestamp_opt(epoch_secs, 0).single()?;
        Some(Self {
            digit: extract_digit(quote),
            price,
            timestamp,
        })
    }

    /// Milliseconds since the Unix epoch
    pub fn epoch_ms(&self) -> i64 {
        self.timestamp.timestamp_millis()
    }
}

/// Stream kinds a subscription can target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    Ticks,
}

impl StreamKind {
    pub fn as_str(self) -> &'static str {
        match self {
            StreamKind::Ticks => "ticks",
        }
    }
}

/// Registry key: at most one live subscription per (symbol, kind)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionKey {
    pub symbol: String,
    pub kind: StreamKind,
}

impl SubscriptionKey {
    pub fn new(symbol: impl Into<String>, kind: StreamKind) -> Self {
        Self {
            symbol: symbol.into(),
            kind,
        }
    }
}

impl fmt::Display for SubscriptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.symbol, self.kind.as_str())
    }
}

/// Handle returned by `subscribe`, used to unsubscribe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionHandle {
    pub key: SubscriptionKey,
    /// Correlation id of the subscribe request that created the entry
    pub req_id: u64,
}

/// Connection lifecycle as seen by feed callers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No transport running
    Idle,
    /// Transport started, not yet open
    Connecting,
    Connected,
    /// Transport dropped; waiting before retry `attempt`
    Reconnecting { attempt: u32 },
    /// Retry budget spent; only a manual `connect` resumes
    Exhausted,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_tick_from_quote() {
        let tick = Tick::from_quote("7054.231", 1_704_067_200).unwrap();
        assert_eq!(tick.digit, 1);
        assert_eq!(tick.price, dec!(7054.231));
        assert_eq!(tick.epoch_ms(), 1_704_067_200_000);
    }

    #[test]
    fn test_tick_digit_uses_quote_text() {
        let tick = Tick::from_quote("100.00", 1).unwrap();
        assert_eq!(tick.digit, 0);
        let tick = Tick::from_quote("100.5", 1).unwrap();
        assert_eq!(tick.digit, 5);
    }

    #[test]
    fn test_tick_from_bad_quote() {
        assert!(Tick::from_quote("abc", 1).is_none());
        assert!(Tick::from_quote("", 1).is_none());
    }

    #[test]
    fn test_subscription_key_display() {
        let key = SubscriptionKey::new("R_100", StreamKind::Ticks);
        assert_eq!(key.to_string(), "R_100:ticks");
    }

    #[test]
    fn test_subscription_key_equality() {
        let a = SubscriptionKey::new("R_100", StreamKind::Ticks);
        let b = SubscriptionKey::new("R_100".to_string(), StreamKind::Ticks);
        assert_eq!(a, b);
        assert_ne!(a, SubscriptionKey::new("R_50", StreamKind::Ticks));
    }
}
