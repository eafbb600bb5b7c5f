//! Configuration types for tick-digits

use crate::stats::StatsFilter;
use crate::telemetry::LogFormat;
use crate::ws::{ReconnectPolicy, WsConfig};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::Duration;

/// Default quote feed endpoint
pub const DEFAULT_FEED_URL: &str = "wss://ws.derivws.com/websockets/v3?app_id=1089";

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub stats: StatsConfig,
    #[serde(default)]
    pub tracker: TrackerConfig,
    #[serde(default)]
    pub execution: ExecutionConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Quote feed connection configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    /// WebSocket endpoint
    #[serde(default = "default_feed_url")]
    pub url: String,

    /// Allowed symbols; empty accepts any well-formed symbol
    #[serde(default)]
    pub symbols: Vec<String>,

    /// Consecutive reconnection attempts before giving up
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,

    /// Linear backoff unit in milliseconds
    #[serde(default = "default_reconnect_base_delay_ms")]
    pub reconnect_base_delay_ms: u64,

    /// Deadline for a history request
    #[serde(default = "default_history_timeout_secs")]
    pub history_timeout_secs: u64,

    /// Keepalive ping interval; 0 disables keepalive
    #[serde(default = "default_ping_interval_secs")]
    pub ping_interval_secs: u64,
}

fn default_feed_url() -> String {
    DEFAULT_FEED_URL.to_string()
}
fn default_max_reconnect_attempts() -> u32 {
    5
}
fn default_reconnect_base_delay_ms() -> u64 {
    1000
}
fn default_history_timeout_secs() -> u64 {
    10
}
fn default_ping_interval_secs() -> u64 {
    30
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: default_feed_url(),
            symbols: Vec::new(),
            max_reconnect_attempts: default_max_reconnect_attempts(),
            reconnect_base_delay_ms: default_reconnect_base_delay_ms(),
            history_timeout_secs: default_history_timeout_secs(),
            ping_interval_secs: default_ping_interval_secs(),
        }
    }
}

impl FeedConfig {
    pub fn history_timeout(&self) -> Duration {
        Duration::from_secs(self.history_timeout_secs)
    }

    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        ReconnectPolicy::new(
            self.max_reconnect_attempts,
            Duration::from_millis(self.reconnect_base_delay_ms),
        )
    }

    /// Transport settings derived from this section
    pub fn ws_config(&self) -> WsConfig {
        WsConfig {
            url: self.url.clone(),
            reconnect: self.reconnect_policy(),
            ping_interval: Duration::from_secs(self.ping_interval_secs),
        }
    }
}

/// Digit statistics configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StatsConfig {
    /// Window capacity in ticks, clamped to [100, 5000]
    #[serde(default = "default_window_size")]
    pub window_size: usize,

    #[serde(default)]
    pub filter: StatsFilter,
}

fn default_window_size() -> usize {
    1000
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            window_size: default_window_size(),
            filter: StatsFilter::default(),
        }
    }
}

/// Position tracking configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TrackerConfig {
    /// Decimal places shifted left before taking the last digit of a barrier contract price
    #[serde(default = "default_pip_decimals")]
    pub pip_decimals: u32,
}

fn default_pip_decimals() -> u32 {
    crate::contract::DEFAULT_PIP_DECIMALS
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            pip_decimals: default_pip_decimals(),
        }
    }
}

/// Paper execution configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionConfig {
    /// Payout as a multiple of stake
    #[serde(default = "default_payout_ratio")]
    pub payout_ratio: Decimal,
}

fn default_payout_ratio() -> Decimal {
    Decimal::new(195, 2) // 1.95
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            payout_ratio: default_payout_ratio(),
        }
    }
}

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    /// Prometheus exporter port (0 = disabled)
    #[serde(default)]
    pub metrics_port: u16,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            metrics_port: 0,
            log_level: default_log_level(),
            log_format: LogFormat::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}
