//! Live Channel Module
//!
//! The reference-counted subscription manager over the push transport. The
//! first subscriber for a topic opens the transport subscription, later
//! subscribers attach to the same broadcast channel, and the last one to
//! drop tears the transport topic down. Per topic the lifecycle is
//! `Unsubscribed → Subscribing → Active → Unsubscribed`.
//!
//! Transport and decode errors are logged and swallowed here; the push
//! stream is best-effort and must never throw into the render path.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::error::Result;
use crate::live::{EntityDelta, Topic};
use crate::transport::{PushHandlers, PushTransport, SubscriptionHandle};

/// Broadcast buffer per topic; a lagging surface drops old deltas rather
/// than blocking the stream.
const DELTA_BUFFER: usize = 64;

// == Subscription State ==
/// Lifecycle of one transport-level topic subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    Unsubscribed,
    Subscribing,
    Active,
}

// == Topic Entry ==
struct TopicEntry {
    handle: SubscriptionHandle,
    tx: broadcast::Sender<EntityDelta>,
    state: Arc<Mutex<SubscriptionState>>,
    subscribers: usize,
}

type TopicTable = Arc<Mutex<HashMap<Topic, TopicEntry>>>;

// == Live Bus ==
/// Fan-out hub between the push transport and UI surfaces.
pub struct LiveBus {
    transport: Arc<dyn PushTransport>,
    settle_delay: Duration,
    topics: TopicTable,
}

impl LiveBus {
    // == Constructor ==
    /// Creates a bus over the given transport.
    ///
    /// # Arguments
    /// * `transport` - The pub/sub client (owns its own reconnect logic)
    /// * `settle_delay` - Grace period before subscribing on a cold connection
    pub fn new(transport: Arc<dyn PushTransport>, settle_delay: Duration) -> Self {
        Self {
            transport,
            settle_delay,
            topics: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    // == Subscribe ==
    /// Attaches a surface to `topic`, opening the transport subscription if
    /// this is the first subscriber.
    ///
    /// When the transport connection has not finished its handshake yet,
    /// the subscribe call is delayed by the settle grace period instead of
    /// failing the mount; the transport queues or replays as it sees fit.
    pub async fn subscribe(&self, topic: &Topic) -> Result<LiveSubscription> {
        if let Some(subscription) = self.join_existing(topic) {
            return Ok(subscription);
        }

        if !self.transport.is_connected() {
            debug!(topic = %topic, delay_ms = self.settle_delay.as_millis() as u64,
                "connection not settled, delaying subscribe");
            tokio::time::sleep(self.settle_delay).await;
        }

        let (tx, _) = broadcast::channel(DELTA_BUFFER);
        let state = Arc::new(Mutex::new(SubscriptionState::Subscribing));
        let handle = self
            .transport
            .subscribe(topic.as_str(), self.make_handlers(topic, &tx, &state))?;

        let mut topics = self.topics.lock().expect("topic table lock poisoned");
        if let Some(entry) = topics.get_mut(topic) {
            // Another surface opened the topic while we waited for the
            // handshake. Join its entry under this same lock, so the
            // refcount is taken before anything can tear the entry down,
            // then discard our duplicate transport subscription.
            entry.subscribers += 1;
            let rx = entry.tx.subscribe();
            debug!(topic = %topic, subscribers = entry.subscribers, "joined racing topic");
            drop(topics);
            self.transport.unsubscribe(handle);
            return Ok(LiveSubscription {
                topic: topic.clone(),
                rx,
                topics: Arc::clone(&self.topics),
                transport: Arc::clone(&self.transport),
            });
        }

        debug!(topic = %topic, "transport topic opened");
        topics.insert(
            topic.clone(),
            TopicEntry {
                handle,
                tx: tx.clone(),
                state,
                subscribers: 1,
            },
        );
        drop(topics);

        Ok(LiveSubscription {
            topic: topic.clone(),
            rx: tx.subscribe(),
            topics: Arc::clone(&self.topics),
            transport: Arc::clone(&self.transport),
        })
    }

    /// Joins an already-open topic, bumping its refcount.
    fn join_existing(&self, topic: &Topic) -> Option<LiveSubscription> {
        let mut topics = self.topics.lock().expect("topic table lock poisoned");
        let entry = topics.get_mut(topic)?;
        entry.subscribers += 1;
        debug!(topic = %topic, subscribers = entry.subscribers, "joined open topic");
        Some(LiveSubscription {
            topic: topic.clone(),
            rx: entry.tx.subscribe(),
            topics: Arc::clone(&self.topics),
            transport: Arc::clone(&self.transport),
        })
    }

    fn make_handlers(
        &self,
        topic: &Topic,
        tx: &broadcast::Sender<EntityDelta>,
        state: &Arc<Mutex<SubscriptionState>>,
    ) -> PushHandlers {
        let update_tx = tx.clone();
        let update_topic = topic.clone();
        let subscribed_state = Arc::clone(state);
        let subscribed_topic = topic.clone();
        let error_topic = topic.clone();

        PushHandlers {
            on_update: Box::new(move |payload| match EntityDelta::from_payload(payload) {
                Ok(delta) => {
                    // No receivers just means every surface unmounted already
                    let _ = update_tx.send(delta);
                }
                Err(err) => {
                    warn!(topic = %update_topic, error = %err, "dropping malformed delta");
                }
            }),
            on_subscribed: Box::new(move || {
                *subscribed_state.lock().expect("state lock poisoned") = SubscriptionState::Active;
                debug!(topic = %subscribed_topic, "subscription active");
            }),
            on_error: Box::new(move |err| {
                // Local state stays as-is; the transport owns reconnection
                warn!(topic = %error_topic, error = %err, "push transport error");
            }),
        }
    }

    // == Topic State ==
    /// Lifecycle state of `topic`; `Unsubscribed` when no surface holds it.
    pub fn topic_state(&self, topic: &Topic) -> SubscriptionState {
        self.topics
            .lock()
            .expect("topic table lock poisoned")
            .get(topic)
            .map(|entry| *entry.state.lock().expect("state lock poisoned"))
            .unwrap_or(SubscriptionState::Unsubscribed)
    }

    // == Open Topics ==
    /// Number of transport-level topics currently open.
    pub fn open_topics(&self) -> usize {
        self.topics.lock().expect("topic table lock poisoned").len()
    }
}

// == Live Subscription ==
/// A surface's membership in one topic. Dropping it detaches the surface;
/// the last drop closes the transport subscription.
pub struct LiveSubscription {
    topic: Topic,
    rx: broadcast::Receiver<EntityDelta>,
    topics: TopicTable,
    transport: Arc<dyn PushTransport>,
}

impl LiveSubscription {
    /// The topic this subscription listens on.
    pub fn topic(&self) -> &Topic {
        &self.topic
    }

    // == Receive ==
    /// Waits for the next delta. Returns `None` once the topic is closed.
    ///
    /// A surface that falls behind the buffer skips the overwritten deltas
    /// and keeps going; a warning is logged, state is otherwise untouched.
    pub async fn recv(&mut self) -> Option<EntityDelta> {
        loop {
            match self.rx.recv().await {
                Ok(delta) => return Some(delta),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(topic = %self.topic, skipped, "surface lagged behind delta stream");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

impl Drop for LiveSubscription {
    fn drop(&mut self) {
        let mut topics = self.topics.lock().expect("topic table lock poisoned");
        let close = match topics.get_mut(&self.topic) {
            Some(entry) => {
                entry.subscribers -= 1;
                entry.subscribers == 0
            }
            None => false,
        };
        if close {
            if let Some(entry) = topics.remove(&self.topic) {
                debug!(topic = %self.topic, "last subscriber gone, closing transport topic");
                self.transport.unsubscribe(entry.handle);
            }
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyncError;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

    /// Captures handlers per subscription so tests can drive the stream.
    struct FakePushTransport {
        connected: AtomicBool,
        next_handle: AtomicU64,
        subscriptions: Mutex<HashMap<SubscriptionHandle, (String, PushHandlers)>>,
    }

    impl FakePushTransport {
        fn new(connected: bool) -> Arc<Self> {
            Arc::new(Self {
                connected: AtomicBool::new(connected),
                next_handle: AtomicU64::new(1),
                subscriptions: Mutex::new(HashMap::new()),
            })
        }

        fn open_count(&self) -> usize {
            self.subscriptions.lock().unwrap().len()
        }

        fn push(&self, topic: &str, payload: Value) {
            let subs = self.subscriptions.lock().unwrap();
            for (sub_topic, handlers) in subs.values() {
                if sub_topic == topic {
                    (handlers.on_update)(payload.clone());
                }
            }
        }

        fn confirm_all(&self) {
            let subs = self.subscriptions.lock().unwrap();
            for (_, handlers) in subs.values() {
                (handlers.on_subscribed)();
            }
        }

        fn fail_all(&self) {
            let subs = self.subscriptions.lock().unwrap();
            for (_, handlers) in subs.values() {
                (handlers.on_error)(SyncError::Subscription("socket dropped".to_string()));
            }
        }
    }

    impl PushTransport for FakePushTransport {
        fn subscribe(&self, topic: &str, handlers: PushHandlers) -> Result<SubscriptionHandle> {
            let handle = SubscriptionHandle(self.next_handle.fetch_add(1, Ordering::SeqCst));
            self.subscriptions
                .lock()
                .unwrap()
                .insert(handle.clone(), (topic.to_string(), handlers));
            Ok(handle)
        }

        fn unsubscribe(&self, handle: SubscriptionHandle) {
            self.subscriptions.lock().unwrap().remove(&handle);
        }

        fn is_connected(&self) -> bool {
            self.connected.load(Ordering::SeqCst)
        }
    }

    #[tokio::test]
    async fn test_subscribe_opens_transport_topic_once() {
        let transport = FakePushTransport::new(true);
        let bus = LiveBus::new(transport.clone(), Duration::from_millis(10));
        let topic = Topic::room_products(7);

        let _first = bus.subscribe(&topic).await.unwrap();
        let _second = bus.subscribe(&topic).await.unwrap();

        assert_eq!(transport.open_count(), 1);
        assert_eq!(bus.open_topics(), 1);
    }

    #[tokio::test]
    async fn test_state_machine_transitions() {
        let transport = FakePushTransport::new(true);
        let bus = LiveBus::new(transport.clone(), Duration::from_millis(10));
        let topic = Topic::store_products();

        assert_eq!(bus.topic_state(&topic), SubscriptionState::Unsubscribed);

        let subscription = bus.subscribe(&topic).await.unwrap();
        assert_eq!(bus.topic_state(&topic), SubscriptionState::Subscribing);

        transport.confirm_all();
        assert_eq!(bus.topic_state(&topic), SubscriptionState::Active);

        drop(subscription);
        assert_eq!(bus.topic_state(&topic), SubscriptionState::Unsubscribed);
    }

    #[tokio::test]
    async fn test_deltas_fan_out_to_all_subscribers() {
        let transport = FakePushTransport::new(true);
        let bus = LiveBus::new(transport.clone(), Duration::from_millis(10));
        let topic = Topic::room_products(5);

        let mut a = bus.subscribe(&topic).await.unwrap();
        let mut b = bus.subscribe(&topic).await.unwrap();

        transport.push(topic.as_str(), json!({"productId": 42, "current_stock": 3}));

        let delta_a = a.recv().await.unwrap();
        let delta_b = b.recv().await.unwrap();
        assert_eq!(delta_a.entity_id, json!(42));
        assert_eq!(delta_a.changed, delta_b.changed);
    }

    #[tokio::test]
    async fn test_malformed_delta_is_dropped_silently() {
        let transport = FakePushTransport::new(true);
        let bus = LiveBus::new(transport.clone(), Duration::from_millis(10));
        let topic = Topic::product(1);

        let mut subscription = bus.subscribe(&topic).await.unwrap();

        transport.push(topic.as_str(), json!("not an object"));
        transport.push(topic.as_str(), json!({"productId": 1, "current_stock": 9}));

        // Only the valid delta arrives
        let delta = subscription.recv().await.unwrap();
        assert_eq!(delta.changed.get("stock"), Some(&json!(9)));
    }

    #[tokio::test]
    async fn test_transport_error_leaves_subscription_alive() {
        let transport = FakePushTransport::new(true);
        let bus = LiveBus::new(transport.clone(), Duration::from_millis(10));
        let topic = Topic::room_products(2);

        let mut subscription = bus.subscribe(&topic).await.unwrap();
        transport.confirm_all();

        transport.fail_all();
        assert_eq!(bus.topic_state(&topic), SubscriptionState::Active);

        // Stream keeps working after the error
        transport.push(topic.as_str(), json!({"productId": 8, "current_stock": 1}));
        assert!(subscription.recv().await.is_some());
    }

    #[tokio::test]
    async fn test_last_drop_closes_transport_topic() {
        let transport = FakePushTransport::new(true);
        let bus = LiveBus::new(transport.clone(), Duration::from_millis(10));
        let topic = Topic::room_products(3);

        let first = bus.subscribe(&topic).await.unwrap();
        let second = bus.subscribe(&topic).await.unwrap();

        drop(first);
        assert_eq!(transport.open_count(), 1);

        drop(second);
        assert_eq!(transport.open_count(), 0);
        assert_eq!(bus.open_topics(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cold_connection_delays_subscribe() {
        let transport = FakePushTransport::new(false);
        let settle = Duration::from_millis(500);
        let bus = LiveBus::new(transport.clone(), settle);
        let topic = Topic::store_products();

        let started = tokio::time::Instant::now();
        let _subscription = bus.subscribe(&topic).await.unwrap();

        assert_eq!(started.elapsed(), settle);
        assert_eq!(transport.open_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_racing_cold_subscribes_share_one_topic() {
        let transport = FakePushTransport::new(false);
        let bus = Arc::new(LiveBus::new(transport.clone(), Duration::from_millis(500)));
        let topic = Topic::room_products(4);

        // Both callers miss the open-topic fast path, park in the settle
        // delay together, and race to register the transport topic; the
        // loser must end up attached to the winner's entry, not orphaned.
        let (first, second) = tokio::join!(bus.subscribe(&topic), bus.subscribe(&topic));
        let mut first = first.unwrap();
        let mut second = second.unwrap();

        assert_eq!(transport.open_count(), 1);
        assert_eq!(bus.open_topics(), 1);

        // Both receivers hang off the surviving channel
        transport.push(topic.as_str(), json!({"productId": 11, "current_stock": 6}));
        assert_eq!(first.recv().await.unwrap().entity_id, json!(11));
        assert_eq!(second.recv().await.unwrap().entity_id, json!(11));

        // Refcounts balance: neither drop closes a topic it never joined
        drop(first);
        assert_eq!(transport.open_count(), 1);
        drop(second);
        assert_eq!(transport.open_count(), 0);
        assert_eq!(bus.open_topics(), 0);
    }

    #[tokio::test]
    async fn test_lagged_surface_skips_and_keeps_receiving() {
        let transport = FakePushTransport::new(true);
        let bus = LiveBus::new(transport.clone(), Duration::from_millis(10));
        let topic = Topic::room_products(9);

        let mut subscription = bus.subscribe(&topic).await.unwrap();

        // Overflow the per-topic buffer before the surface reads anything
        let pushed = DELTA_BUFFER as i64 + 16;
        for stock in 0..pushed {
            transport.push(topic.as_str(), json!({"productId": 1, "current_stock": stock}));
        }

        // The overwritten deltas are skipped; the stream resumes at the
        // oldest retained one and drains through to the newest
        let mut received = Vec::new();
        for _ in 0..DELTA_BUFFER {
            received.push(subscription.recv().await.unwrap());
        }
        assert_eq!(
            received.first().unwrap().changed.get("stock"),
            Some(&json!(16))
        );
        assert_eq!(
            received.last().unwrap().changed.get("stock"),
            Some(&json!(pushed - 1))
        );
    }

    #[tokio::test]
    async fn test_distinct_topics_open_independently() {
        let transport = FakePushTransport::new(true);
        let bus = LiveBus::new(transport.clone(), Duration::from_millis(10));

        let _room = bus.subscribe(&Topic::room_products(1)).await.unwrap();
        let _store = bus.subscribe(&Topic::store_products()).await.unwrap();

        assert_eq!(transport.open_count(), 2);
        assert_eq!(bus.open_topics(), 2);
    }
}
