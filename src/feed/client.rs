//! Multiplexed feed client
//!
//! One transport carries every subscription and history request. All
//! registry mutation happens under a single lock; connection-state changes
//! that affect what gets sent (going Connected) happen under the same lock so
//! a subscribe racing a reconnect is sent exactly once.

use super::protocol::{self, FeedMessage, ALREADY_SUBSCRIBED};
use super::registry::{Registry, RouteOutcome};
use super::{
    ConnectionState, FeedError, StreamKind, SubscriptionHandle, SubscriptionKey, Tick, TickFeed,
};
use crate::config::FeedConfig;
use crate::telemetry::{increment, CounterMetric};
use crate::ws::{Transport, WsClient, WsMessage};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot, watch, Mutex, MutexGuard};
use tokio::task::JoinHandle;

/// Longest symbol accepted by pre-flight validation
const MAX_SYMBOL_LEN: usize = 32;

/// Settings the client needs beyond the transport
#[derive(Debug, Clone)]
pub struct FeedClientConfig {
    /// Deadline for a history request
    pub history_timeout: Duration,
    /// Allowed symbols; empty accepts any well-formed symbol
    pub symbols: Vec<String>,
}

impl Default for FeedClientConfig {
    fn default() -> Self {
        Self {
            history_timeout: Duration::from_secs(10),
            symbols: Vec::new(),
        }
    }
}

impl From<&FeedConfig> for FeedClientConfig {
    fn from(config: &FeedConfig) -> Self {
        Self {
            history_timeout: config.history_timeout(),
            symbols: config.symbols.clone(),
        }
    }
}

/// A live tick stream returned by `subscribe`
#[derive(Debug)]
pub struct Subscription {
    pub handle: SubscriptionHandle,
    receiver: mpsc::UnboundedReceiver<Tick>,
    active: Arc<AtomicBool>,
}

impl Subscription {
    pub fn new(handle: SubscriptionHandle, receiver: mpsc::UnboundedReceiver<Tick>) -> Self {
        Self {
            handle,
            receiver,
            active: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Flag the registry clears when this subscription is released
    pub(super) fn release_flag(&self) -> Arc<AtomicBool> {
        self.active.clone()
    }

    /// False once the subscription was removed, replaced or shut down
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Next tick, or `None` once the subscription is removed.
    ///
    /// Ticks still queued when the subscription is released are discarded.
    pub async fn recv(&mut self) -> Option<Tick> {
        if !self.is_active() {
            self.receiver.close();
            return None;
        }
        let tick = self.receiver.recv().await?;
        if !self.is_active() {
            self.receiver.close();
            return None;
        }
        Some(tick)
    }
}

/// State guarded by the client lock
struct Shared {
    registry: Registry,
    outbound: Option<mpsc::Sender<String>>,
    dispatcher: Option<JoinHandle<()>>,
}

impl Shared {
    /// Best-effort send on the current transport.
    ///
    /// Never waits: the lock is held here and the dispatcher needs it to
    /// drain inbound traffic.
    fn send(&self, text: String) {
        let Some(tx) = &self.outbound else {
            tracing::debug!("No transport, dropping outbound message");
            return;
        };
        match tx.try_send(text) {
            Ok(()) => {}
            Err(TrySendError::Full(text)) => {
                increment(CounterMetric::DroppedOutbound);
                tracing::warn!(%text, "Outbound queue full, dropping message");
            }
            Err(TrySendError::Closed(_)) => {
                tracing::debug!("Transport closed, dropping outbound message");
            }
        }
    }
}

struct Inner {
    config: FeedClientConfig,
    transport: Arc<dyn Transport>,
    shared: Mutex<Shared>,
    state: watch::Sender<ConnectionState>,
    next_req_id: AtomicU64,
}

/// Feed client handle; clones share one connection
#[derive(Clone)]
pub struct FeedClient {
    inner: Arc<Inner>,
}

impl FeedClient {
    /// Client over a WebSocket transport built from `config`
    pub fn new(config: &FeedConfig) -> Self {
        Self::with_transport(config.into(), Arc::new(WsClient::new(config.ws_config())))
    }

    /// Client over any transport
    pub fn with_transport(config: FeedClientConfig, transport: Arc<dyn Transport>) -> Self {
        let (state, _) = watch::channel(ConnectionState::Idle);
        Self {
            inner: Arc::new(Inner {
                config,
                transport,
                shared: Mutex::new(Shared {
                    registry: Registry::new(),
                    outbound: None,
                    dispatcher: None,
                }),
                state,
                next_req_id: AtomicU64::new(1),
            }),
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.inner.state.borrow()
    }

    /// Receiver notified on every connection-state change
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state.subscribe()
    }

    /// Pre-flight symbol check; never touches the network
    pub fn validate_symbol(&self, symbol: &str) -> Result<(), FeedError> {
        let well_formed = !symbol.is_empty()
            && symbol.len() <= MAX_SYMBOL_LEN
            && symbol
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_');
        let allowed = self.inner.config.symbols.is_empty()
            || self.inner.config.symbols.iter().any(|s| s == symbol);

        if well_formed && allowed {
            Ok(())
        } else {
            Err(FeedError::InvalidSymbol(symbol.to_string()))
        }
    }

    /// Start the transport and wait until it is open.
    ///
    /// Returns immediately when already connected; joins the in-flight attempt
    /// when connecting. From the exhausted state this starts a fresh transport.
    pub async fn connect(&self) -> Result<(), FeedError> {
        let mut state_rx = self.inner.state.subscribe();
        {
            let mut shared = self.inner.shared.lock().await;
            if matches!(
                self.state(),
                ConnectionState::Idle | ConnectionState::Exhausted
            ) {
                self.inner.start(&mut shared);
            }
        }

        loop {
            let state = *state_rx.borrow_and_update();
            match state {
                ConnectionState::Connected => return Ok(()),
                ConnectionState::Exhausted => return Err(FeedError::ReconnectExhausted),
                ConnectionState::Idle => return Err(FeedError::Shutdown),
                ConnectionState::Connecting | ConnectionState::Reconnecting { .. } => {}
            }
            if state_rx.changed().await.is_err() {
                return Err(FeedError::Shutdown);
            }
        }
    }

    /// Subscribe to live ticks for `symbol`.
    ///
    /// Replaces any existing subscription for the same (symbol, kind); the
    /// replaced stream ends.
    pub async fn subscribe(
        &self,
        symbol: &str,
        kind: StreamKind,
    ) -> Result<Subscription, FeedError> {
        self.validate_symbol(symbol)?;
        let req_id = self.inner.next_req_id();
        let key = SubscriptionKey::new(symbol, kind);
        let (tx, rx) = mpsc::unbounded_channel();
        let subscription = Subscription::new(SubscriptionHandle { key: key.clone(), req_id }, rx);

        let mut shared = self.lock_ready().await?;
        if let Some(previous) = shared.registry.insert_subscription(
            key.clone(),
            req_id,
            tx,
            subscription.release_flag(),
        ) {
            tracing::info!(%key, previous_req_id = previous.req_id, "Replacing subscription");
            if let Some(feed_id) = previous.feed_id {
                shared.send(protocol::forget(&feed_id));
            }
        }

        if self.state() == ConnectionState::Connected {
            shared.send(protocol::subscribe_ticks(symbol, req_id));
        }
        tracing::info!(%key, req_id, "Subscribed");

        Ok(subscription)
    }

    /// Remove a subscription. Safe to call repeatedly.
    pub async fn unsubscribe(&self, handle: &SubscriptionHandle) {
        let mut shared = self.inner.shared.lock().await;
        let Some(entry) = shared.registry.remove_subscription(handle) else {
            return;
        };
        tracing::info!(key = %handle.key, "Unsubscribed");

        if let Some(feed_id) = entry.feed_id {
            shared.send(protocol::forget(&feed_id));
        } else if !shared.registry.has_kind(handle.key.kind) {
            shared.send(protocol::forget_all(handle.key.kind.as_str()));
        }
    }

    /// Fetch the latest `count` ticks for `symbol`
    pub async fn fetch_history(&self, symbol: &str, count: usize) -> Result<Vec<Tick>, FeedError> {
        self.validate_symbol(symbol)?;
        let req_id = self.inner.next_req_id();
        let (reply_tx, reply_rx) = oneshot::channel();

        {
            let mut shared = self.lock_ready().await?;
            shared.registry.insert_pending(req_id, reply_tx);
            shared.send(protocol::ticks_history(symbol, count, req_id));
        }
        tracing::debug!(symbol, count, req_id, "History requested");

        match tokio::time::timeout(self.inner.config.history_timeout, reply_rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(FeedError::Shutdown),
            Err(_) => {
                self.inner.shared.lock().await.registry.cancel_pending(req_id);
                tracing::warn!(symbol, req_id, "History request timed out");
                Err(FeedError::RequestTimeout { req_id })
            }
        }
    }

    /// Tear down the transport and release every registry entry.
    ///
    /// Subscriber streams end and pending requests fail with `Shutdown`.
    pub async fn shutdown(&self) {
        let mut shared = self.inner.shared.lock().await;
        if shared.registry.has_kind(StreamKind::Ticks) {
            shared.send(protocol::forget_all(StreamKind::Ticks.as_str()));
        }
        shared.registry.clear_subscriptions();
        shared.registry.fail_all_pending(FeedError::Shutdown);
        shared.outbound = None;
        if let Some(dispatcher) = shared.dispatcher.take() {
            dispatcher.abort();
        }
        self.inner.state.send_replace(ConnectionState::Idle);
        tracing::info!("Feed client shut down");
    }

    /// Lock the registry with a transport running, starting one if idle
    async fn lock_ready(&self) -> Result<MutexGuard<'_, Shared>, FeedError> {
        let mut shared = self.inner.shared.lock().await;
        match self.state() {
            ConnectionState::Exhausted => return Err(FeedError::ReconnectExhausted),
            ConnectionState::Idle => self.inner.start(&mut shared),
            _ => {}
        }
        Ok(shared)
    }
}

impl Inner {
    fn next_req_id(&self) -> u64 {
        self.next_req_id.fetch_add(1, Ordering::Relaxed)
    }

    fn set_state(&self, state: ConnectionState) {
        self.state.send_replace(state);
    }

    /// Open the transport and spawn its dispatcher. Caller holds the lock.
    fn start(self: &Arc<Self>, shared: &mut Shared) {
        let (events, outbound) = self.transport.open();
        shared.outbound = Some(outbound);
        if let Some(old) = shared.dispatcher.take() {
            old.abort();
        }
        shared.dispatcher = Some(tokio::spawn(run_dispatcher(Arc::downgrade(self), events)));
        self.set_state(ConnectionState::Connecting);
        tracing::info!("Feed transport starting");
    }

    /// Handle one transport event. Returns false when the dispatcher should stop.
    async fn handle_event(&self, event: WsMessage) -> bool {
        match event {
            WsMessage::Text(text) => self.handle_text(&text).await,
            WsMessage::Binary(data) => {
                tracing::debug!(len = data.len(), "Ignoring binary frame");
            }
            WsMessage::Connected => self.on_connected().await,
            WsMessage::Reconnecting { attempt, delay } => {
                let _shared = self.shared.lock().await;
                tracing::warn!(attempt, delay_ms = delay.as_millis() as u64, "Feed reconnecting");
                self.set_state(ConnectionState::Reconnecting { attempt });
            }
            WsMessage::Exhausted { attempts } => {
                self.on_exhausted(attempts).await;
                return false;
            }
            WsMessage::Disconnected => {
                tracing::info!("Feed transport closed");
                return false;
            }
        }
        true
    }

    async fn on_connected(&self) {
        let mut shared = self.shared.lock().await;
        self.set_state(ConnectionState::Connected);
        shared.registry.forget_feed_ids();

        let resubscriptions = shared.registry.resubscriptions();
        tracing::info!(subscriptions = resubscriptions.len(), "Feed connected");
        for (key, req_id) in resubscriptions {
            match key.kind {
                StreamKind::Ticks => {
                    shared.send(protocol::subscribe_ticks(&key.symbol, req_id))
                }
            }
        }
    }

    async fn on_exhausted(&self, attempts: u32) {
        let mut shared = self.shared.lock().await;
        tracing::error!(
            attempts,
            subscriptions = shared.registry.subscription_count(),
            "Feed reconnection exhausted; manual connect required"
        );
        shared.registry.fail_all_pending(FeedError::ReconnectExhausted);
        shared.outbound = None;
        // this runs on the dispatcher task itself
        shared.dispatcher = None;
        self.set_state(ConnectionState::Exhausted);
    }

    async fn handle_text(&self, text: &str) {
        let message = match protocol::parse_message(text) {
            Ok(message) => message,
            Err(e) => {
                increment(CounterMetric::MalformedMessages);
                tracing::warn!(error = %e, "Dropping malformed feed message");
                return;
            }
        };

        let mut shared = self.shared.lock().await;
        match message {
            FeedMessage::Tick {
                symbol,
                subscription_id,
                tick,
            } => match shared.registry.route_tick(&symbol, subscription_id, tick) {
                RouteOutcome::Delivered => increment(CounterMetric::TicksReceived),
                RouteOutcome::Unmatched => {
                    increment(CounterMetric::UnmatchedMessages);
                    tracing::debug!(%symbol, "Dropping tick with no subscription");
                }
                RouteOutcome::ReceiverGone(entry) => {
                    tracing::info!(%symbol, "Subscriber gone, releasing subscription");
                    match entry.feed_id {
                        Some(feed_id) => shared.send(protocol::forget(&feed_id)),
                        None if !shared.registry.has_kind(StreamKind::Ticks) => {
                            shared.send(protocol::forget_all(StreamKind::Ticks.as_str()))
                        }
                        None => {}
                    }
                }
            },
            FeedMessage::History { req_id, ticks } => {
                let resolved = req_id.is_some_and(|id| shared.registry.resolve(id, Ok(ticks)));
                if !resolved {
                    increment(CounterMetric::UnmatchedMessages);
                    tracing::debug!(?req_id, "Dropping history with no pending request");
                }
            }
            FeedMessage::Error {
                req_id,
                code,
                message,
            } => {
                let Some(id) = req_id else {
                    tracing::warn!(%code, %message, "Uncorrelated feed error");
                    return;
                };
                if shared.registry.is_pending(id) {
                    shared
                        .registry
                        .resolve(id, Err(FeedError::Rejected { code, message }));
                } else if code == ALREADY_SUBSCRIBED {
                    tracing::debug!(req_id = id, "Stream already open on the feed");
                } else if let Some((key, _)) = shared.registry.remove_by_req_id(id) {
                    tracing::warn!(%key, %code, %message, "Subscription rejected by feed");
                } else {
                    increment(CounterMetric::UnmatchedMessages);
                    tracing::debug!(req_id = id, %code, "Dropping error for unknown request");
                }
            }
            FeedMessage::Other { msg_type, req_id } => {
                tracing::debug!(?msg_type, ?req_id, "Ignoring feed message");
            }
        }
    }
}

async fn run_dispatcher(inner: Weak<Inner>, mut events: mpsc::Receiver<WsMessage>) {
    while let Some(event) = events.recv().await {
        let Some(inner) = inner.upgrade() else {
            break;
        };
        if !inner.handle_event(event).await {
            break;
        }
    }
}

#[async_trait]
impl TickFeed for FeedClient {
    async fn subscribe_ticks(&self, symbol: &str) -> Result<Subscription, FeedError> {
        self.subscribe(symbol, StreamKind::Ticks).await
    }

    async fn fetch_history(&self, symbol: &str, count: usize) -> Result<Vec<Tick>, FeedError> {
        FeedClient::fetch_history(self, symbol, count).await
    }

    async fn unsubscribe(&self, handle: &SubscriptionHandle) {
        FeedClient::unsubscribe(self, handle).await
    }
}
