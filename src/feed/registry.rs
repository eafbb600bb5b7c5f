//! Subscription and pending-request registry
//!
//! Owned by the feed client and only mutated under its lock.

use super::{FeedError, StreamKind, SubscriptionHandle, SubscriptionKey, Tick};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

/// Completion slot for a correlated history request
pub type PendingReply = oneshot::Sender<Result<Vec<Tick>, FeedError>>;

/// A live subscription
#[derive(Debug)]
pub struct SubscriptionEntry {
    pub req_id: u64,
    pub sender: mpsc::UnboundedSender<Tick>,
    /// Stream id assigned by the feed, learned from the first tick
    pub feed_id: Option<String>,
    /// Shared with the subscriber; cleared once the entry leaves the registry
    pub active: Arc<AtomicBool>,
}

impl SubscriptionEntry {
    fn release(self) -> Self {
        self.active.store(false, Ordering::Release);
        self
    }
}

/// Result of routing a live tick
#[derive(Debug)]
pub enum RouteOutcome {
    Delivered,
    /// No subscription for the symbol
    Unmatched,
    /// Subscriber dropped its receiver; the entry was removed
    ReceiverGone(SubscriptionEntry),
}

#[derive(Debug, Default)]
pub struct Registry {
    subscriptions: HashMap<SubscriptionKey, SubscriptionEntry>,
    pending: HashMap<u64, PendingReply>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a subscription, returning the entry it replaced
    pub fn insert_subscription(
        &mut self,
        key: SubscriptionKey,
        req_id: u64,
        sender: mpsc::UnboundedSender<Tick>,
        active: Arc<AtomicBool>,
    ) -> Option<SubscriptionEntry> {
        self.subscriptions
            .insert(
                key,
                SubscriptionEntry {
                    req_id,
                    sender,
                    feed_id: None,
                    active,
                },
            )
            .map(SubscriptionEntry::release)
    }

    /// Remove the entry created for `handle`.
    ///
    /// A handle whose entry was since replaced removes nothing.
    pub fn remove_subscription(&mut self, handle: &SubscriptionHandle) -> Option<SubscriptionEntry> {
        match self.subscriptions.get(&handle.key) {
            Some(entry) if entry.req_id == handle.req_id => self
                .subscriptions
                .remove(&handle.key)
                .map(SubscriptionEntry::release),
            _ => None,
        }
    }

    /// Remove the subscription created by request `req_id`
    pub fn remove_by_req_id(&mut self, req_id: u64) -> Option<(SubscriptionKey, SubscriptionEntry)> {
        let key = self
            .subscriptions
            .iter()
            .find(|(_, entry)| entry.req_id == req_id)
            .map(|(key, _)| key.clone())?;
        self.subscriptions.remove(&key).map(|entry| (key, entry.release()))
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn has_kind(&self, kind: StreamKind) -> bool {
        self.subscriptions.keys().any(|key| key.kind == kind)
    }

    /// Every (symbol, kind, req_id) to re-send after a reconnect
    pub fn resubscriptions(&self) -> Vec<(SubscriptionKey, u64)> {
        self.subscriptions
            .iter()
            .map(|(key, entry)| (key.clone(), entry.req_id))
            .collect()
    }

    /// Clear feed-assigned stream ids; a new connection assigns fresh ones
    pub fn forget_feed_ids(&mut self) {
        for entry in self.subscriptions.values_mut() {
            entry.feed_id = None;
        }
    }

    /// Drop every subscription, ending all subscriber streams
    pub fn clear_subscriptions(&mut self) {
        for (_, entry) in self.subscriptions.drain() {
            entry.release();
        }
    }

    /// Deliver a live tick to the subscription for `symbol`
    pub fn route_tick(&mut self, symbol: &str, feed_id: Option<String>, tick: Tick) -> RouteOutcome {
        let key = SubscriptionKey::new(symbol, StreamKind::Ticks);
        let Some(entry) = self.subscriptions.get_mut(&key) else {
            return RouteOutcome::Unmatched;
        };

        if entry.feed_id.is_none() {
            entry.feed_id = feed_id;
        }

        if entry.sender.send(tick).is_err() {
            return match self.subscriptions.remove(&key) {
                Some(entry) => RouteOutcome::ReceiverGone(entry.release()),
                None => RouteOutcome::Unmatched,
            };
        }
        RouteOutcome::Delivered
    }

    pub fn insert_pending(&mut self, req_id: u64, reply: PendingReply) {
        self.pending.insert(req_id, reply);
    }

    pub fn is_pending(&self, req_id: u64) -> bool {
        self.pending.contains_key(&req_id)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Complete request `req_id`. Returns false when nothing was waiting.
    pub fn resolve(&mut self, req_id: u64, result: Result<Vec<Tick>, FeedError>) -> bool {
        match self.pending.remove(&req_id) {
            Some(reply) => {
                // caller may have given up already
                let _ = reply.send(result);
                true
            }
            None => false,
        }
    }

    /// Forget a request without completing it
    pub fn cancel_pending(&mut self, req_id: u64) {
        self.pending.remove(&req_id);
    }

    /// Fail every pending request with `error`
    pub fn fail_all_pending(&mut self, error: FeedError) {
        for (_, reply) in self.pending.drain() {
            let _ = reply.send(Err(error.clone()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tick(quote: &str) -> Tick {
        Tick::from_quote(quote, 1_700_000_000).unwrap()
    }

    fn key(symbol: &str) -> SubscriptionKey {
        SubscriptionKey::new(symbol, StreamKind::Ticks)
    }

    fn flag() -> Arc<AtomicBool> {
        Arc::new(AtomicBool::new(true))
    }

    #[test]
    fn test_insert_replaces_same_key() {
        let mut registry = Registry::new();
        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();

        assert!(registry.insert_subscription(key("R_100"), 1, tx1, flag()).is_none());
        let replaced = registry.insert_subscription(key("R_100"), 2, tx2, flag()).unwrap();
        assert_eq!(replaced.req_id, 1);
        drop(replaced);
        assert_eq!(registry.subscription_count(), 1);

        registry.route_tick("R_100", None, tick("1.23"));
        assert_eq!(rx2.try_recv().unwrap().digit, 3);
        // old stream ended with its entry
        assert!(rx1.try_recv().is_err());
    }

    #[test]
    fn test_remove_is_idempotent_and_handle_scoped() {
        let mut registry = Registry::new();
        let (tx1, _rx1) = mpsc::unbounded_channel();
        let (tx2, _rx2) = mpsc::unbounded_channel();
        let old = SubscriptionHandle {
            key: key("R_100"),
            req_id: 1,
        };
        let new = SubscriptionHandle {
            key: key("R_100"),
            req_id: 2,
        };

        registry.insert_subscription(key("R_100"), 1, tx1, flag());
        registry.insert_subscription(key("R_100"), 2, tx2, flag());

        assert!(registry.remove_subscription(&old).is_none());
        assert_eq!(registry.subscription_count(), 1);
        assert!(registry.remove_subscription(&new).is_some());
        assert!(registry.remove_subscription(&new).is_none());
        assert_eq!(registry.subscription_count(), 0);
    }

    #[test]
    fn test_leaving_registry_clears_active_flag() {
        let mut registry = Registry::new();
        let (replaced, removed, by_req, cleared, current) = (flag(), flag(), flag(), flag(), flag());
        let (tx, _rx) = mpsc::unbounded_channel();

        registry.insert_subscription(key("R_10"), 1, tx.clone(), replaced.clone());
        registry.insert_subscription(key("R_10"), 2, tx.clone(), current.clone());
        assert!(!replaced.load(Ordering::Acquire));
        assert!(current.load(Ordering::Acquire));

        registry.insert_subscription(key("R_25"), 3, tx.clone(), removed.clone());
        let handle = SubscriptionHandle {
            key: key("R_25"),
            req_id: 3,
        };
        registry.remove_subscription(&handle).unwrap();
        assert!(!removed.load(Ordering::Acquire));

        registry.insert_subscription(key("R_50"), 4, tx.clone(), by_req.clone());
        registry.remove_by_req_id(4).unwrap();
        assert!(!by_req.load(Ordering::Acquire));

        registry.insert_subscription(key("R_75"), 5, tx, cleared.clone());
        registry.clear_subscriptions();
        assert!(!cleared.load(Ordering::Acquire));
        assert!(!current.load(Ordering::Acquire));
        assert_eq!(registry.subscription_count(), 0);
    }

    #[test]
    fn test_route_unmatched() {
        let mut registry = Registry::new();
        assert!(matches!(
            registry.route_tick("R_10", None, tick("5.5")),
            RouteOutcome::Unmatched
        ));
    }

    #[test]
    fn test_route_records_feed_id_and_detects_dropped_receiver() {
        let mut registry = Registry::new();
        let (tx, rx) = mpsc::unbounded_channel();
        registry.insert_subscription(key("R_100"), 1, tx, flag());

        assert!(matches!(
            registry.route_tick("R_100", Some("abc".into()), tick("1.0")),
            RouteOutcome::Delivered
        ));
        drop(rx);

        match registry.route_tick("R_100", Some("xyz".into()), tick("1.1")) {
            RouteOutcome::ReceiverGone(entry) => assert_eq!(entry.feed_id.as_deref(), Some("abc")),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(registry.subscription_count(), 0);
    }

    #[test]
    fn test_route_preserves_order() {
        let mut registry = Registry::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        registry.insert_subscription(key("R_100"), 1, tx, flag());

        for quote in ["1.1", "1.2", "1.3"] {
            registry.route_tick("R_100", None, tick(quote));
        }
        let digits: Vec<u8> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|t| t.digit)
            .collect();
        assert_eq!(digits, vec![1, 2, 3]);
    }

    #[test]
    fn test_remove_by_req_id() {
        let mut registry = Registry::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        registry.insert_subscription(key("R_25"), 42, tx, flag());

        let (removed_key, _) = registry.remove_by_req_id(42).unwrap();
        assert_eq!(removed_key, key("R_25"));
        assert!(registry.remove_by_req_id(42).is_none());
    }

    #[tokio::test]
    async fn test_resolve_exactly_once() {
        let mut registry = Registry::new();
        let (tx, rx) = oneshot::channel();
        registry.insert_pending(7, tx);
        assert!(registry.is_pending(7));

        assert!(registry.resolve(7, Ok(vec![tick("2.5")])));
        assert!(!registry.resolve(7, Ok(vec![])));

        let ticks = rx.await.unwrap().unwrap();
        assert_eq!(ticks.len(), 1);
    }

    #[tokio::test]
    async fn test_fail_all_pending() {
        let mut registry = Registry::new();
        let (tx1, rx1) = oneshot::channel();
        let (tx2, rx2) = oneshot::channel();
        registry.insert_pending(1, tx1);
        registry.insert_pending(2, tx2);

        registry.fail_all_pending(FeedError::ReconnectExhausted);
        assert_eq!(registry.pending_count(), 0);
        assert_eq!(rx1.await.unwrap(), Err(FeedError::ReconnectExhausted));
        assert_eq!(rx2.await.unwrap(), Err(FeedError::ReconnectExhausted));
    }

    #[test]
    fn test_resubscriptions_and_kind() {
        let mut registry = Registry::new();
        assert!(!registry.has_kind(StreamKind::Ticks));
        let (tx, _rx) = mpsc::unbounded_channel();
        registry.insert_subscription(key("R_75"), 3, tx, flag());
        assert!(registry.has_kind(StreamKind::Ticks));
        assert_eq!(registry.resubscriptions(), vec![(key("R_75"), 3)]);
    }
}
