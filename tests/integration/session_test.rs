//! End-to-end: feed client, statistics and position tracking together

use crate::common::{FeedServer, HISTORY, LIVE};
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;
use tick_digits::contract::{DurationType, PositionStatus, Prediction};
use tick_digits::execution::{PaperExecutor, TradeRequest};
use tick_digits::feed::FeedClient;
use tick_digits::position::PositionTracker;
use tick_digits::session::Session;
use tick_digits::stats::{DigitStatsAggregator, StatsFilter};
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(5);

#[tokio::test]
async fn test_session_seeds_then_streams() {
    let server = FeedServer::spawn().await;
    let client = Arc::new(FeedClient::new(&server.feed_config()));
    client.connect().await.unwrap();

    let mut aggregator = DigitStatsAggregator::new(100, StatsFilter::Raw);
    let mut snapshots = aggregator.subscribe();
    let mut session = Session::new(client.clone(), "R_100", aggregator, PositionTracker::default());

    let mut subscription = session.start().await.unwrap();
    assert_eq!(session.aggregator().len(), HISTORY.len());
    // seed publishes one snapshot
    let seeded = snapshots.recv().await.unwrap();
    assert_eq!(seeded.window_len, HISTORY.len());

    // 100.01 100.02 100.02 100.05 100.09
    let stats = session.aggregator().stats();
    assert_eq!(stats[2].count, 2);
    assert!(stats[2].is_highest);
    assert!(stats[0].is_lowest);

    // Rise over two ticks, entered on the last history quote (100.09)
    let executor = PaperExecutor::new(dec!(1.95));
    let request = TradeRequest {
        symbol: "R_100".into(),
        prediction: Prediction::Rise,
        barrier: None,
        stake: dec!(10),
        duration: 2,
        duration_type: DurationType::Ticks,
    };
    let id = session.place_trade(&executor, request).await.unwrap();

    for _ in 0..LIVE.len() {
        let tick = timeout(WAIT, subscription.recv()).await.unwrap().unwrap();
        session.apply(tick);
    }

    assert_eq!(session.aggregator().len(), HISTORY.len() + LIVE.len());
    assert_eq!(session.aggregator().stats()[3].count, 2);

    // settled on 100.13; the third tick arrives after settlement
    let position = session.tracker().get(id).unwrap();
    assert_eq!(position.status, PositionStatus::Won);
    assert_eq!(position.ticks_elapsed, 2);
    assert_eq!(position.current_price, Some(dec!(100.13)));
    assert_eq!(session.tracker().total_pnl(), dec!(9.5));

    session.stop().await;
    client.shutdown().await;
}
