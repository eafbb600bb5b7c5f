//! WebSocket client library
//!
//! Provides a reusable WebSocket client with automatic reconnection,
//! ping/pong handling, and linear backoff.

mod client;
mod types;

pub use client::WsClient;
pub use types::{ReconnectPolicy, WsConfig, WsError, WsMessage};

use tokio::sync::mpsc;

/// A bidirectional message transport
///
/// `open` starts the transport in the background and returns the inbound
/// event stream plus a sender for outbound text frames. Dropping the sender
/// closes the transport.
pub trait Transport: Send + Sync {
    fn open(&self) -> (mpsc::Receiver<WsMessage>, mpsc::Sender<String>);
}

impl Transport for WsClient {
    fn open(&self) -> (mpsc::Receiver<WsMessage>, mpsc::Sender<String>) {
        self.connect_bidirectional()
    }
}
