//! In-process quote feed speaking the JSON protocol over a real WebSocket

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tick_digits::config::FeedConfig;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{accept_async, tungstenite::Message};

pub const HISTORY_START: i64 = 1_700_000_000;

/// Quotes served for every history request, oldest first
pub const HISTORY: [&str; 5] = ["100.01", "100.02", "100.02", "100.05", "100.09"];

/// Quotes pushed after a tick subscription
pub const LIVE: [&str; 3] = ["100.11", "100.13", "100.13"];

pub struct FeedServer {
    pub url: String,
    /// Connections accepted so far
    pub connections: Arc<AtomicUsize>,
}

impl FeedServer {
    pub async fn spawn() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}", listener.local_addr().unwrap());
        let connections = Arc::new(AtomicUsize::new(0));

        let accepted = connections.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                accepted.fetch_add(1, Ordering::SeqCst);
                tokio::spawn(serve(stream));
            }
        });

        Self { url, connections }
    }

    pub fn feed_config(&self) -> FeedConfig {
        FeedConfig {
            url: self.url.clone(),
            symbols: vec!["R_100".into(), "R_50".into()],
            max_reconnect_attempts: 2,
            reconnect_base_delay_ms: 10,
            history_timeout_secs: 5,
            ping_interval_secs: 30,
        }
    }
}

async fn serve(stream: TcpStream) {
    let Ok(ws) = accept_async(stream).await else {
        return;
    };
    let (mut sink, mut source) = ws.split();

    while let Some(Ok(message)) = source.next().await {
        let Message::Text(text) = message else {
            continue;
        };
        let Ok(request) = serde_json::from_str::<Value>(&text) else {
            continue;
        };
        for reply in respond(&request) {
            if sink.send(Message::Text(reply.to_string())).await.is_err() {
                return;
            }
        }
    }
}

fn respond(request: &Value) -> Vec<Value> {
    let req_id = request["req_id"].clone();

    if let Some(symbol) = request["ticks_history"].as_str() {
        if symbol == "R_50" {
            return vec![json!({
                "msg_type": "history",
                "echo_req": request,
                "error": { "code": "MarketIsClosed", "message": "This market is presently closed." },
            })];
        }
        let count = request["count"].as_u64().unwrap_or(0) as usize;
        let quotes: Vec<&str> = HISTORY.iter().rev().take(count).rev().copied().collect();
        let offset = (HISTORY.len() - quotes.len()) as i64;
        let times: Vec<i64> = (0..quotes.len() as i64)
            .map(|i| HISTORY_START + offset + i)
            .collect();
        return vec![json!({
            "msg_type": "history",
            "echo_req": request,
            "req_id": req_id,
            "history": { "prices": quotes, "times": times },
        })];
    }

    if let Some(symbol) = request["ticks"].as_str() {
        return LIVE
            .iter()
            .enumerate()
            .map(|(i, quote)| {
                json!({
                    "msg_type": "tick",
                    "echo_req": request,
                    "req_id": req_id,
                    "subscription": { "id": format!("sub-{symbol}") },
                    "tick": {
                        "symbol": symbol,
                        "quote": quote.parse::<f64>().unwrap(),
                        "epoch": HISTORY_START + HISTORY.len() as i64 + i as i64,
                    },
                })
            })
            .collect();
    }

    vec![json!({ "msg_type": "forget", "echo_req": request, "forget": 1 })]
}
