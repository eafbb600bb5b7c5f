//! WebSocket client with automatic reconnection

use super::types::{WsConfig, WsError, WsMessage};
use crate::telemetry::{increment, CounterMetric};
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tokio_tungstenite::{connect_async, tungstenite::Message};

/// Placeholder timer period when keepalive is disabled
const IDLE_PING_PERIOD: Duration = Duration::from_secs(3600);

/// Reusable WebSocket client with automatic reconnection and ping/pong handling
pub struct WsClient {
    config: WsConfig,
}

impl WsClient {
    /// Create a new WebSocket client with the given configuration
    pub fn new(config: WsConfig) -> Self {
        Self { config }
    }

    /// Create a new client with just a URL using default config
    pub fn with_url(url: impl Into<String>) -> Self {
        Self::new(WsConfig::new(url))
    }

    /// Get the configured URL
    pub fn url(&self) -> &str {
        &self.config.url
    }

    /// Connect and return both a receiver and a sender for bidirectional communication
    ///
    /// Spawns a background task that owns the socket. Outbound frames queue in
    /// the sender while the socket is down and flush after the next connect.
    /// Returns (message_receiver, message_sender)
    pub fn connect_bidirectional(&self) -> (mpsc::Receiver<WsMessage>, mpsc::Sender<String>) {
        let (msg_tx, msg_rx) = mpsc::channel(1024);
        let (send_tx, send_rx) = mpsc::channel(256);
        let config = self.config.clone();

        tokio::spawn(async move {
            if let Err(e) = Self::run_connection_loop(config, msg_tx, send_rx).await {
                tracing::error!(error = %e, "WebSocket connection loop failed");
            }
        });

        (msg_rx, send_tx)
    }

    /// Run the connection loop with linear-backoff reconnection
    async fn run_connection_loop(
        config: WsConfig,
        tx: mpsc::Sender<WsMessage>,
        mut send_rx: mpsc::Receiver<String>,
    ) -> Result<(), WsError> {
        let mut attempt: u32 = 0;

        loop {
            match Self::connect_and_stream(&config, &tx, &mut send_rx, &mut attempt).await {
                Ok(()) => {
                    tracing::info!("WebSocket closed by client");
                    let _ = tx.send(WsMessage::Disconnected).await;
                    return Ok(());
                }
                Err(e) => {
                    if tx.is_closed() {
                        tracing::info!("Receiver dropped, stopping reconnection");
                        return Ok(());
                    }

                    attempt += 1;
                    let Some(delay) = config.reconnect.delay_for(attempt) else {
                        tracing::error!(
                            error = %e,
                            attempts = attempt - 1,
                            "Max reconnection attempts reached"
                        );
                        let _ = tx
                            .send(WsMessage::Exhausted {
                                attempts: attempt - 1,
                            })
                            .await;
                        return Err(WsError::MaxReconnectsExceeded);
                    };

                    tracing::warn!(
                        error = %e,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "WebSocket connection error, reconnecting..."
                    );
                    increment(CounterMetric::ReconnectAttempts);

                    let _ = tx.send(WsMessage::Reconnecting { attempt, delay }).await;
                    sleep(delay).await;
                }
            }
        }
    }

    /// Connect to WebSocket and stream messages until the connection fails
    ///
    /// Returns `Ok(())` only when the local side is done (outbound sender or
    /// inbound receiver dropped). A server close is treated as a failure so
    /// the caller reconnects.
    async fn connect_and_stream(
        config: &WsConfig,
        tx: &mpsc::Sender<WsMessage>,
        send_rx: &mut mpsc::Receiver<String>,
        attempt: &mut u32,
    ) -> Result<(), WsError> {
        tracing::info!(url = %config.url, "Connecting to WebSocket");

        let (ws_stream, _response) = connect_async(&config.url)
            .await
            .map_err(|e| WsError::ConnectionFailed(e.to_string()))?;

        let (mut write, mut read) = ws_stream.split();

        tracing::info!("WebSocket connected");
        *attempt = 0;

        if tx.send(WsMessage::Connected).await.is_err() {
            return Ok(());
        }

        // zero disables keepalive; the timer still needs a non-zero period
        let keepalive = !config.ping_interval.is_zero();
        let mut ping_interval = tokio::time::interval(if keepalive {
            config.ping_interval
        } else {
            IDLE_PING_PERIOD
        });
        ping_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // first tick fires immediately
        ping_interval.tick().await;
        let mut waiting_for_pong = false;

        loop {
            tokio::select! {
                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            if tx.send(WsMessage::Text(text)).await.is_err() {
                                tracing::debug!("Receiver dropped, closing connection");
                                return Ok(());
                            }
                        }
                        Some(Ok(Message::Binary(data))) => {
                            if tx.send(WsMessage::Binary(data)).await.is_err() {
                                tracing::debug!("Receiver dropped, closing connection");
                                return Ok(());
                            }
                        }
                        Some(Ok(Message::Ping(data))) => {
                            write.send(Message::Pong(data)).await
                                .map_err(|e| WsError::SendFailed(e.to_string()))?;
                        }
                        Some(Ok(Message::Pong(_))) => {
                            waiting_for_pong = false;
                        }
                        Some(Ok(Message::Close(frame))) => {
                            tracing::info!(?frame, "Received close frame");
                            return Err(WsError::ConnectionFailed("Closed by server".into()));
                        }
                        Some(Err(e)) => {
                            return Err(WsError::ConnectionFailed(e.to_string()));
                        }
                        None => {
                            return Err(WsError::ConnectionFailed("Stream ended unexpectedly".into()));
                        }
                        _ => {}
                    }
                }

                msg = send_rx.recv() => {
                    match msg {
                        Some(text) => {
                            write.send(Message::Text(text)).await
                                .map_err(|e| WsError::SendFailed(e.to_string()))?;
                        }
                        None => {
                            let _ = write.send(Message::Close(None)).await;
                            return Ok(());
                        }
                    }
                }

                _ = ping_interval.tick(), if keepalive => {
                    if waiting_for_pong {
                        return Err(WsError::ConnectionFailed("Pong timeout".into()));
                    }
                    write.send(Message::Ping(vec![])).await
                        .map_err(|e| WsError::SendFailed(e.to_string()))?;
                    waiting_for_pong = true;
                }
            }
        }
    }
}
