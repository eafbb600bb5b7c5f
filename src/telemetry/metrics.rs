//! Prometheus metrics

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Counter metric types
#[derive(Debug, Clone, Copy)]
pub enum CounterMetric {
    /// Ticks routed to a live subscription
    TicksReceived,
    /// Inbound payloads that failed to parse
    MalformedMessages,
    /// Inbound messages matching no pending request or subscription
    UnmatchedMessages,
    /// Transport reconnection attempts
    ReconnectAttempts,
    /// Positions moved from open to won/lost
    Settlements,
    /// Outbound requests dropped on a full transport queue
    DroppedOutbound,
}

/// Gauge metric types
#[derive(Debug, Clone, Copy)]
pub enum GaugeMetric {
    /// Aggregate P&L over tracked positions
    TotalPnl,
    /// Open position count
    OpenPositions,
    /// Ticks currently held by the statistics window
    WindowLength,
}

impl CounterMetric {
    fn name(self) -> &'static str {
        match self {
            CounterMetric::TicksReceived => "tickdigits_ticks_received_total",
            CounterMetric::MalformedMessages => "tickdigits_malformed_messages_total",
            CounterMetric::UnmatchedMessages => "tickdigits_unmatched_messages_total",
            CounterMetric::ReconnectAttempts => "tickdigits_reconnect_attempts_total",
            CounterMetric::Settlements => "tickdigits_settlements_total",
            CounterMetric::DroppedOutbound => "tickdigits_dropped_outbound_total",
        }
    }
}

impl GaugeMetric {
    fn name(self) -> &'static str {
        match self {
            GaugeMetric::TotalPnl => "tickdigits_total_pnl",
            GaugeMetric::OpenPositions => "tickdigits_open_positions",
            GaugeMetric::WindowLength => "tickdigits_window_length",
        }
    }
}

/// Increment a counter by one
pub fn increment(metric: CounterMetric) {
    metrics::counter!(metric.name()).increment(1);
}

/// Set a gauge value
pub fn set_gauge(metric: GaugeMetric, value: f64) {
    metrics::gauge!(metric.name()).set(value);
}

/// Install the Prometheus exporter with an HTTP listener on `port`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| anyhow::anyhow!("Failed to install metrics exporter: {}", e))?;

    tracing::info!(%addr, "Prometheus metrics exporter listening");
    Ok(())
}
