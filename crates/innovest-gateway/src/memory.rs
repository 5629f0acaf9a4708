use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{debug, trace};
use uuid::Uuid;

use innovest_types::api::SendMessageRequest;
use innovest_types::events::{deal_topic, parse_send_destination};
use innovest_types::models::Message;

use crate::error::GatewayError;
use crate::transport::{Connector, PubSub, Subscription};

/// In-process broker with the marketplace's chat semantics: a publish to a
/// deal's send destination is stamped with an id and timestamp and fanned
/// out on that deal's topic to every subscriber, the sender included.
#[derive(Clone, Default)]
pub struct MemoryBroker {
    inner: Arc<BrokerInner>,
}

#[derive(Default)]
struct BrokerInner {
    /// topic -> subscribers
    topics: RwLock<HashMap<String, Vec<Subscriber>>>,
    /// Every message the broker relayed, in publish order.
    relayed: Mutex<Vec<Message>>,
    next_id: AtomicU64,
}

struct Subscriber {
    id: u64,
    conn_id: u64,
    tx: mpsc::UnboundedSender<String>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a new client connection to this broker.
    pub fn connection(&self) -> MemoryConnection {
        MemoryConnection {
            broker: self.clone(),
            conn_id: self.inner.next_id.fetch_add(1, Ordering::Relaxed),
            connected: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn active_subscriptions(&self, topic: &str) -> usize {
        self.read_topics().get(topic).map_or(0, Vec::len)
    }

    pub fn total_subscriptions(&self) -> usize {
        self.read_topics().values().map(Vec::len).sum()
    }

    /// Delivers a raw payload to every subscriber of `topic`. Returns how
    /// many received it.
    pub fn deliver(&self, topic: &str, payload: &str) -> usize {
        let topics = self.read_topics();
        let Some(subs) = topics.get(topic) else {
            return 0;
        };
        subs.iter()
            .filter(|s| s.tx.send(payload.to_string()).is_ok())
            .count()
    }

    /// Pushes an already-persisted message onto its deal topic, as the
    /// server does for messages sent by other parties.
    pub fn deliver_message(&self, message: &Message) -> Result<usize, GatewayError> {
        let payload = serde_json::to_string(message)?;
        Ok(self.deliver(&deal_topic(message.deal_id), &payload))
    }

    pub fn relayed(&self) -> Vec<Message> {
        lock(&self.inner.relayed).clone()
    }

    fn read_topics(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, Vec<Subscriber>>> {
        self.inner.topics.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_topics(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, Vec<Subscriber>>> {
        self.inner.topics.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn add_subscriber(&self, topic: &str, conn_id: u64) -> (u64, mpsc::UnboundedReceiver<String>) {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        self.write_topics()
            .entry(topic.to_string())
            .or_default()
            .push(Subscriber { id, conn_id, tx });
        (id, rx)
    }

    fn remove_subscriber(&self, topic: &str, id: u64) {
        let mut topics = self.write_topics();
        if let Some(subs) = topics.get_mut(topic) {
            subs.retain(|s| s.id != id);
            if subs.is_empty() {
                topics.remove(topic);
            }
        }
    }

    fn drop_connection(&self, conn_id: u64) {
        let mut topics = self.write_topics();
        for subs in topics.values_mut() {
            subs.retain(|s| s.conn_id != conn_id);
        }
        topics.retain(|_, subs| !subs.is_empty());
    }

    fn relay(&self, deal_id: Uuid, body: &str) -> Result<(), GatewayError> {
        let req: SendMessageRequest = serde_json::from_str(body)?;
        let message = Message {
            id: Uuid::new_v4(),
            deal_id,
            sender_id: req.sender_id,
            recipient_id: req.recipient_id,
            content: req.content,
            created_at: Utc::now(),
        };
        lock(&self.inner.relayed).push(message.clone());
        let delivered = self.deliver_message(&message)?;
        trace!(%deal_id, delivered, "Relayed chat message");
        Ok(())
    }
}

/// One client's connection to a [`MemoryBroker`].
pub struct MemoryConnection {
    broker: MemoryBroker,
    conn_id: u64,
    connected: Arc<AtomicBool>,
}

impl MemoryConnection {
    /// Simulates the network dropping: the connection reports disconnected
    /// and every subscription it opened ends.
    pub fn disconnect(&self) {
        self.connected.store(false, Ordering::Release);
        self.broker.drop_connection(self.conn_id);
    }

    pub fn broker(&self) -> &MemoryBroker {
        &self.broker
    }
}

#[async_trait]
impl PubSub for MemoryConnection {
    async fn subscribe(&self, topic: &str) -> Result<Subscription, GatewayError> {
        if !self.is_connected() {
            return Err(GatewayError::NotConnected);
        }
        let (id, rx) = self.broker.add_subscriber(topic, self.conn_id);
        debug!(%topic, id, "Subscribed");

        let broker = self.broker.clone();
        let owned = topic.to_string();
        Ok(Subscription::new(topic, rx, move || {
            broker.remove_subscriber(&owned, id)
        }))
    }

    async fn publish(&self, destination: &str, body: String) -> Result<(), GatewayError> {
        if !self.is_connected() {
            return Err(GatewayError::NotConnected);
        }
        match parse_send_destination(destination) {
            Some(deal_id) => self.broker.relay(deal_id, &body),
            None => {
                self.broker.deliver(destination, &body);
                Ok(())
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    async fn close(&self) {
        self.disconnect();
    }
}

impl Drop for MemoryConnection {
    fn drop(&mut self) {
        self.disconnect();
    }
}

#[async_trait]
impl Connector for MemoryBroker {
    type Transport = MemoryConnection;

    async fn connect(&self) -> Result<MemoryConnection, GatewayError> {
        Ok(self.connection())
    }
}
