use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;

use crate::error::GatewayError;

/// A topic-addressed publish/subscribe connection.
#[async_trait]
pub trait PubSub: Send + Sync {
    async fn subscribe(&self, topic: &str) -> Result<Subscription, GatewayError>;

    /// Fire-and-forget. Fails with [`GatewayError::NotConnected`] instead of
    /// queueing when the connection is down.
    async fn publish(&self, destination: &str, body: String) -> Result<(), GatewayError>;

    fn is_connected(&self) -> bool;

    /// Releases the connection. Idempotent.
    async fn close(&self);
}

/// Opens one broker connection per deal room.
#[async_trait]
pub trait Connector: Send + Sync {
    type Transport: PubSub + 'static;

    async fn connect(&self) -> Result<Self::Transport, GatewayError>;
}

type Release = Box<dyn FnOnce() + Send + Sync>;

/// Raw payloads delivered on one topic. Dropping the subscription
/// unsubscribes, so release does not depend on anyone remembering to call
/// a cleanup method.
pub struct Subscription {
    topic: String,
    rx: mpsc::UnboundedReceiver<String>,
    release: Option<Release>,
}

impl Subscription {
    pub fn new(
        topic: impl Into<String>,
        rx: mpsc::UnboundedReceiver<String>,
        release: impl FnOnce() + Send + Sync + 'static,
    ) -> Self {
        Self {
            topic: topic.into(),
            rx,
            release: Some(Box::new(release)),
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// `None` once the connection that fed this subscription has gone away.
    pub async fn recv(&mut self) -> Option<String> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Result<String, TryRecvError> {
        self.rx.try_recv()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("topic", &self.topic)
            .finish_non_exhaustive()
    }
}
