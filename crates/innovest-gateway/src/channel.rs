use tokio::sync::mpsc::error::TryRecvError;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use innovest_api::ChatHistory;
use innovest_types::api::SendMessageRequest;
use innovest_types::events::{deal_topic, send_destination};
use innovest_types::models::Message;

use crate::error::GatewayError;
use crate::filter::ConversationScope;
use crate::transcript::Transcript;
use crate::transport::{PubSub, Subscription};

/// One deal room's conversation: history plus the live deal topic, filtered
/// down to `scope`.
///
/// The channel owns its connection. [`close`](Self::close) releases it
/// gracefully; dropping the channel releases it too.
pub struct ConversationChannel<T: PubSub> {
    scope: ConversationScope,
    transport: T,
    subscription: Option<Subscription>,
    transcript: Transcript,
}

impl<T: PubSub> ConversationChannel<T> {
    /// Subscribes to the deal topic while the history request is in flight,
    /// so nothing published after the history snapshot is missed. On any
    /// failure the connection is closed before returning.
    pub async fn open<H>(transport: T, history: &H, scope: ConversationScope) -> Result<Self, GatewayError>
    where
        H: ChatHistory + ?Sized,
    {
        let mut channel = Self {
            scope,
            transport,
            subscription: None,
            transcript: Transcript::new(),
        };
        if let Err(e) = channel.attach(history).await {
            channel.close().await;
            return Err(e);
        }
        info!(
            deal_id = %scope.deal_id,
            counterpart = ?scope.counterpart_id,
            history = channel.transcript.len(),
            "Conversation opened"
        );
        Ok(channel)
    }

    async fn attach<H>(&mut self, history: &H) -> Result<(), GatewayError>
    where
        H: ChatHistory + ?Sized,
    {
        let scope = self.scope;
        let topic = deal_topic(scope.deal_id);
        let (subscribed, loaded) = tokio::join!(
            self.transport.subscribe(&topic),
            history.load_history(scope.deal_id, scope.viewer_id, scope.counterpart_id),
        );
        let subscription = subscribed?;
        let loaded = loaded?;

        self.subscription = Some(subscription);
        self.merge_history(loaded);
        self.drain();
        Ok(())
    }

    /// Without a counterpart the server returns the whole deal thread, so
    /// history goes through the same filter as live deliveries.
    fn merge_history(&mut self, loaded: Vec<Message>) -> usize {
        let scope = self.scope;
        self.transcript
            .extend(loaded.into_iter().filter(|m| scope.admits(m)))
    }

    pub fn scope(&self) -> ConversationScope {
        self.scope
    }

    pub fn messages(&self) -> &[Message] {
        self.transcript.messages()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Whether a send would currently be attempted.
    pub fn is_live(&self) -> bool {
        self.subscription.is_some() && self.transport.is_connected()
    }

    /// Waits for the next message that belongs in this conversation and is
    /// new to the transcript. `None` once the subscription has ended.
    pub async fn recv(&mut self) -> Option<Message> {
        loop {
            let raw = self.subscription.as_mut()?.recv().await;
            match raw {
                Some(raw) => {
                    if let Some(message) = self.accept(&raw) {
                        return Some(message);
                    }
                }
                None => {
                    warn!(deal_id = %self.scope.deal_id, "Live subscription ended");
                    self.subscription = None;
                    return None;
                }
            }
        }
    }

    /// Applies every delivery already buffered, without waiting. Returns the
    /// messages that were appended.
    pub fn drain(&mut self) -> Vec<Message> {
        let mut appended = Vec::new();
        while let Some(subscription) = self.subscription.as_mut() {
            match subscription.try_recv() {
                Ok(raw) => appended.extend(self.accept(&raw)),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    warn!(deal_id = %self.scope.deal_id, "Live subscription ended");
                    self.subscription = None;
                }
            }
        }
        appended
    }

    fn accept(&mut self, raw: &str) -> Option<Message> {
        let message: Message = match serde_json::from_str(raw) {
            Ok(message) => message,
            Err(e) => {
                warn!("Dropping undecodable chat payload: {}", e);
                return None;
            }
        };
        if !self.scope.admits(&message) {
            trace!(id = %message.id, "Message belongs to another conversation");
            return None;
        }
        if !self.transcript.insert(message.clone()) {
            trace!(id = %message.id, "Duplicate delivery");
            return None;
        }
        Some(message)
    }

    /// Publishes to the deal's send destination. The message shows up in the
    /// transcript only when the broker echoes it back.
    pub async fn send(&self, content: &str) -> Result<(), GatewayError> {
        if content.trim().is_empty() {
            return Err(GatewayError::EmptyMessage);
        }
        if !self.is_live() {
            return Err(GatewayError::NotConnected);
        }
        let body = serde_json::to_string(&SendMessageRequest {
            deal_id: self.scope.deal_id,
            sender_id: self.scope.viewer_id,
            recipient_id: self.scope.counterpart_id,
            content: content.to_string(),
        })?;
        self.transport
            .publish(&send_destination(self.scope.deal_id), body)
            .await?;
        debug!(deal_id = %self.scope.deal_id, "Message sent");
        Ok(())
    }

    /// Re-reads history and merges it into the transcript, re-subscribing
    /// first if the live subscription was lost while the connection stayed
    /// up. Messages missed during a disconnect only come back this way.
    pub async fn resync<H>(&mut self, history: &H) -> Result<usize, GatewayError>
    where
        H: ChatHistory + ?Sized,
    {
        if self.subscription.is_none() {
            if !self.transport.is_connected() {
                return Err(GatewayError::NotConnected);
            }
            let topic = deal_topic(self.scope.deal_id);
            self.subscription = Some(self.transport.subscribe(&topic).await?);
        }
        let scope = self.scope;
        let loaded = history
            .load_history(scope.deal_id, scope.viewer_id, scope.counterpart_id)
            .await?;
        let added = self.merge_history(loaded);
        let live = self.drain().len();
        info!(deal_id = %scope.deal_id, added, live, "Conversation resynced");
        Ok(added + live)
    }

    /// Switches the conversation within the same deal: the old subscription
    /// is dropped before the new one is opened and the transcript is
    /// rebuilt for the new scope.
    pub async fn switch_counterpart<H>(
        &mut self,
        history: &H,
        counterpart_id: Option<Uuid>,
    ) -> Result<(), GatewayError>
    where
        H: ChatHistory + ?Sized,
    {
        self.subscription = None;
        self.transcript.clear();
        self.scope = self.scope.with_counterpart(counterpart_id);
        self.attach(history).await
    }

    /// Unsubscribes and closes the connection.
    pub async fn close(mut self) {
        self.subscription = None;
        self.transport.close().await;
        debug!(deal_id = %self.scope.deal_id, "Conversation closed");
    }
}
