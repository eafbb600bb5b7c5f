//! Integration tests for the quote feed client over a real WebSocket

use crate::common::{FeedServer, HISTORY, LIVE};
use std::sync::atomic::Ordering;
use std::time::Duration;
use tick_digits::config::FeedConfig;
use tick_digits::feed::{ConnectionState, FeedClient, FeedError, TickFeed};
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(5);

#[tokio::test]
async fn test_history_round_trip() {
    let server = FeedServer::spawn().await;
    let client = FeedClient::new(&server.feed_config());

    let ticks = timeout(WAIT, client.fetch_history("R_100", 3))
        .await
        .unwrap()
        .unwrap();

    let digits: Vec<u8> = ticks.iter().map(|t| t.digit).collect();
    assert_eq!(digits, vec![2, 5, 9]);
    assert!(ticks.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
    assert_eq!(client.state(), ConnectionState::Connected);
    client.shutdown().await;
}

#[tokio::test]
async fn test_concurrent_history_requests_share_one_connection() {
    let server = FeedServer::spawn().await;
    let client = FeedClient::new(&server.feed_config());

    let (a, b) = tokio::join!(
        client.fetch_history("R_100", 5),
        client.fetch_history("R_100", 2)
    );
    assert_eq!(a.unwrap().len(), HISTORY.len());
    assert_eq!(b.unwrap().len(), 2);
    assert_eq!(server.connections.load(Ordering::SeqCst), 1);
    client.shutdown().await;
}

#[tokio::test]
async fn test_feed_error_rejects_request() {
    let server = FeedServer::spawn().await;
    let client = FeedClient::new(&server.feed_config());

    let result = timeout(WAIT, client.fetch_history("R_50", 10)).await.unwrap();
    assert!(matches!(
        result,
        Err(FeedError::Rejected { ref code, .. }) if code == "MarketIsClosed"
    ));
    client.shutdown().await;
}

#[tokio::test]
async fn test_symbol_outside_allowlist() {
    let server = FeedServer::spawn().await;
    let client = FeedClient::new(&server.feed_config());

    let result = client.fetch_history("R_10", 10).await;
    assert_eq!(result, Err(FeedError::InvalidSymbol("R_10".into())));
    assert_eq!(server.connections.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_live_ticks_in_order() {
    let server = FeedServer::spawn().await;
    let client = FeedClient::new(&server.feed_config());
    client.connect().await.unwrap();

    let mut subscription = client.subscribe_ticks("R_100").await.unwrap();
    let mut prices = Vec::new();
    for _ in 0..LIVE.len() {
        let tick = timeout(WAIT, subscription.recv()).await.unwrap().unwrap();
        prices.push(tick.price.to_string());
    }
    assert_eq!(prices, LIVE);

    client.unsubscribe(&subscription.handle).await;
    assert!(timeout(WAIT, subscription.recv()).await.unwrap().is_none());
    client.shutdown().await;
}

#[tokio::test]
async fn test_unreachable_feed_exhausts() {
    let config = FeedConfig {
        url: "ws://127.0.0.1:1".into(),
        max_reconnect_attempts: 2,
        reconnect_base_delay_ms: 5,
        ..Default::default()
    };
    let client = FeedClient::new(&config);

    let result = timeout(WAIT, client.connect()).await.unwrap();
    assert_eq!(result, Err(FeedError::ReconnectExhausted));
    assert_eq!(client.state(), ConnectionState::Exhausted);

    let history = client.fetch_history("R_100", 10).await;
    assert_eq!(history, Err(FeedError::ReconnectExhausted));
}
