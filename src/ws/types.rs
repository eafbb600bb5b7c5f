//! WebSocket types and configuration

use std::time::Duration;
use thiserror::Error;

/// Linear reconnection backoff
///
/// The n-th consecutive failed attempt waits `base_delay * n`. Once more than
/// `max_attempts` consecutive attempts have failed the policy yields no
/// further delay and the connection is considered exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Maximum consecutive reconnection attempts (0 = infinite)
    pub max_attempts: u32,
    /// Delay unit multiplied by the attempt number
    pub base_delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl ReconnectPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
        }
    }

    /// Delay before reconnection attempt `attempt` (1-based), or `None` once
    /// the attempt cap has been exceeded.
    pub fn delay_for(&self, attempt: u32) -> Option<Duration> {
        if attempt == 0 {
            return Some(Duration::ZERO);
        }
        if self.max_attempts > 0 && attempt > self.max_attempts {
            return None;
        }
        Some(self.base_delay * attempt)
    }

    /// Every delay the policy will hand out, in order. Empty for an infinite policy.
    pub fn schedule(&self) -> Vec<Duration> {
        (1..=self.max_attempts)
            .filter_map(|attempt| self.delay_for(attempt))
            .collect()
    }
}

/// WebSocket client configuration
#[derive(Debug, Clone)]
pub struct WsConfig {
    /// WebSocket URL to connect to
    pub url: String,
    /// Reconnection backoff
    pub reconnect: ReconnectPolicy,
    /// Interval for sending ping frames; a missing pong by the next ping fails the connection.
    /// Zero disables keepalive.
    pub ping_interval: Duration,
}

impl Default for WsConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            reconnect: ReconnectPolicy::default(),
            ping_interval: Duration::from_secs(30),
        }
    }
}

impl WsConfig {
    /// Create a new config with the given URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Set maximum reconnection attempts
    pub fn max_reconnects(mut self, n: u32) -> Self {
        self.reconnect.max_attempts = n;
        self
    }

    /// Set the linear backoff unit
    pub fn base_delay(mut self, d: Duration) -> Self {
        self.reconnect.base_delay = d;
        self
    }

    /// Set ping interval
    pub fn ping_interval(mut self, d: Duration) -> Self {
        self.ping_interval = d;
        self
    }
}

/// WebSocket message types
#[derive(Debug, Clone, PartialEq)]
pub enum WsMessage {
    /// Text message
    Text(String),
    /// Binary message
    Binary(Vec<u8>),
    /// Connection established
    Connected,
    /// Connection closed by the local side
    Disconnected,
    /// Reconnecting after failure
    Reconnecting { attempt: u32, delay: Duration },
    /// Retry budget spent; no further attempts will be made
    Exhausted { attempts: u32 },
}

/// WebSocket errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WsError {
    /// Connection failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    /// Maximum reconnection attempts exceeded
    #[error("Maximum reconnection attempts exceeded")]
    MaxReconnectsExceeded,
    /// Send failed
    #[error("Send failed: {0}")]
    SendFailed(String),
}
