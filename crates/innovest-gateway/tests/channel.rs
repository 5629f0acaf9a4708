//! Integration tests: conversation channels over the in-memory broker.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use uuid::Uuid;

use innovest_api::{ApiError, ChatHistory};
use innovest_gateway::{ConversationChannel, ConversationScope, GatewayError, MemoryBroker};
use innovest_types::events::deal_topic;
use innovest_types::models::Message;

/// Serves a fixed history and records the scopes it was asked for.
#[derive(Default)]
struct History {
    messages: Vec<Message>,
    fail: bool,
    calls: Mutex<Vec<Option<Uuid>>>,
}

#[async_trait]
impl ChatHistory for History {
    async fn load_history(
        &self,
        deal_id: Uuid,
        _viewer_id: Uuid,
        counterpart_id: Option<Uuid>,
    ) -> Result<Vec<Message>, ApiError> {
        self.calls.lock().unwrap().push(counterpart_id);
        if self.fail {
            return Err(ApiError::Timeout);
        }
        Ok(self
            .messages
            .iter()
            .filter(|m| m.deal_id == deal_id)
            .cloned()
            .collect())
    }
}

fn message(deal_id: Uuid, sender: Uuid, recipient: Option<Uuid>, secs_ago: i64) -> Message {
    Message {
        id: Uuid::new_v4(),
        deal_id,
        sender_id: sender,
        recipient_id: recipient,
        content: format!("sent {secs_ago}s ago"),
        created_at: Utc::now() - Duration::seconds(secs_ago),
    }
}

#[tokio::test]
async fn sent_message_appears_only_via_echo() {
    let broker = MemoryBroker::new();
    let deal = Uuid::new_v4();
    let viewer = Uuid::new_v4();
    let innovator = Uuid::new_v4();
    let history = History::default();

    let mut channel = ConversationChannel::open(
        broker.connection(),
        &history,
        ConversationScope::direct(deal, viewer, innovator),
    )
    .await
    .unwrap();

    channel.send("Interested in the Series A").await.unwrap();
    let echoed = channel.recv().await.unwrap();

    assert_eq!(echoed.sender_id, viewer);
    assert_eq!(echoed.recipient_id, Some(innovator));
    assert_eq!(channel.messages().len(), 1);
    assert_eq!(broker.relayed().len(), 1);
}

#[tokio::test]
async fn blank_message_is_refused() {
    let broker = MemoryBroker::new();
    let history = History::default();
    let channel = ConversationChannel::open(
        broker.connection(),
        &history,
        ConversationScope::group(Uuid::new_v4(), Uuid::new_v4()),
    )
    .await
    .unwrap();

    let err = channel.send("   \n").await.unwrap_err();
    assert!(matches!(err, GatewayError::EmptyMessage));
    assert!(broker.relayed().is_empty());
}

#[tokio::test]
async fn duplicate_delivery_is_shown_once() {
    let broker = MemoryBroker::new();
    let deal = Uuid::new_v4();
    let viewer = Uuid::new_v4();
    let history = History::default();
    let mut channel = ConversationChannel::open(
        broker.connection(),
        &history,
        ConversationScope::group(deal, viewer),
    )
    .await
    .unwrap();

    let m = message(deal, Uuid::new_v4(), None, 0);
    broker.deliver_message(&m).unwrap();
    broker.deliver_message(&m).unwrap();

    let appended = channel.drain();
    assert_eq!(appended, vec![m]);
    assert_eq!(channel.messages().len(), 1);
}

#[tokio::test]
async fn live_and_history_merge_in_timestamp_order() {
    let broker = MemoryBroker::new();
    let deal = Uuid::new_v4();
    let viewer = Uuid::new_v4();
    let older = message(deal, Uuid::new_v4(), None, 60);
    let newer = message(deal, Uuid::new_v4(), None, 30);
    let history = History {
        messages: vec![newer.clone()],
        ..History::default()
    };

    let mut channel = ConversationChannel::open(
        broker.connection(),
        &history,
        ConversationScope::group(deal, viewer),
    )
    .await
    .unwrap();

    // Arrives late over the live path but was created first.
    broker.deliver_message(&older).unwrap();
    channel.drain();
    // The history copy of `newer` echoed again live must not duplicate.
    broker.deliver_message(&newer).unwrap();
    channel.drain();

    let ids: Vec<_> = channel.messages().iter().map(|m| m.id).collect();
    assert_eq!(ids, vec![older.id, newer.id]);
}

#[tokio::test]
async fn other_conversations_are_filtered_out() {
    let broker = MemoryBroker::new();
    let deal = Uuid::new_v4();
    let viewer = Uuid::new_v4();
    let counterpart = Uuid::new_v4();
    let stranger = Uuid::new_v4();
    let history = History::default();
    let mut channel = ConversationChannel::open(
        broker.connection(),
        &history,
        ConversationScope::direct(deal, viewer, counterpart),
    )
    .await
    .unwrap();

    broker.deliver_message(&message(deal, stranger, Some(counterpart), 3)).unwrap();
    broker.deliver_message(&message(deal, viewer, None, 2)).unwrap();
    let reply = message(deal, counterpart, Some(viewer), 1);
    broker.deliver_message(&reply).unwrap();

    assert_eq!(channel.drain(), vec![reply]);
}

#[tokio::test]
async fn whole_thread_history_is_filtered_like_live_deliveries() {
    let broker = MemoryBroker::new();
    let deal = Uuid::new_v4();
    let viewer = Uuid::new_v4();
    let innovator = Uuid::new_v4();
    let other_investor = Uuid::new_v4();
    let broadcast = message(deal, innovator, None, 20);
    let private = message(deal, innovator, Some(other_investor), 10);
    let history = History {
        messages: vec![broadcast.clone(), private.clone()],
        ..History::default()
    };

    let mut channel = ConversationChannel::open(
        broker.connection(),
        &history,
        ConversationScope::group(deal, viewer),
    )
    .await
    .unwrap();
    assert_eq!(channel.messages(), std::slice::from_ref(&broadcast));

    broker.deliver_message(&private).unwrap();
    assert!(channel.drain().is_empty());

    let added = channel.resync(&history).await.unwrap();
    assert_eq!(added, 0);
    assert_eq!(channel.messages(), &[broadcast]);
}

#[tokio::test]
async fn failed_history_releases_the_subscription() {
    let broker = MemoryBroker::new();
    let deal = Uuid::new_v4();
    let history = History {
        fail: true,
        ..History::default()
    };

    let err = ConversationChannel::open(
        broker.connection(),
        &history,
        ConversationScope::group(deal, Uuid::new_v4()),
    )
    .await
    .err()
    .unwrap();

    assert_eq!(err.kind(), innovest_api::ErrorKind::Transport);
    assert_eq!(broker.total_subscriptions(), 0);
}

#[tokio::test]
async fn send_while_disconnected_is_not_queued() {
    let broker = MemoryBroker::new();
    let history = History::default();
    let mut channel = ConversationChannel::open(
        broker.connection(),
        &history,
        ConversationScope::group(Uuid::new_v4(), Uuid::new_v4()),
    )
    .await
    .unwrap();

    channel.transport().disconnect();
    assert!(channel.recv().await.is_none());

    let err = channel.send("hello?").await.unwrap_err();
    assert!(matches!(err, GatewayError::NotConnected));
    assert!(broker.relayed().is_empty());
}

#[tokio::test]
async fn resync_recovers_messages_missed_during_a_gap() {
    let broker = MemoryBroker::new();
    let deal = Uuid::new_v4();
    let viewer = Uuid::new_v4();
    let seen = message(deal, Uuid::new_v4(), None, 10);
    let missed = message(deal, Uuid::new_v4(), None, 5);

    let at_open = History {
        messages: vec![seen.clone()],
        ..History::default()
    };
    let mut channel = ConversationChannel::open(
        broker.connection(),
        &at_open,
        ConversationScope::group(deal, viewer),
    )
    .await
    .unwrap();

    // Published while this client was not listening; only history has it.
    let later = History {
        messages: vec![seen.clone(), missed.clone()],
        ..History::default()
    };
    let added = channel.resync(&later).await.unwrap();

    assert_eq!(added, 1);
    assert_eq!(channel.messages(), &[seen, missed]);
    assert_eq!(broker.active_subscriptions(&deal_topic(deal)), 1);
}

#[tokio::test]
async fn switching_counterpart_replaces_the_subscription() {
    let broker = MemoryBroker::new();
    let deal = Uuid::new_v4();
    let viewer = Uuid::new_v4();
    let first = Uuid::new_v4();
    let second = Uuid::new_v4();
    let history = History::default();

    let mut channel = ConversationChannel::open(
        broker.connection(),
        &history,
        ConversationScope::direct(deal, viewer, first),
    )
    .await
    .unwrap();
    channel.switch_counterpart(&history, Some(second)).await.unwrap();

    assert_eq!(broker.active_subscriptions(&deal_topic(deal)), 1);
    assert_eq!(channel.scope().counterpart_id, Some(second));
    assert_eq!(*history.calls.lock().unwrap(), vec![Some(first), Some(second)]);
}

#[tokio::test]
async fn closing_releases_the_connection() {
    let broker = MemoryBroker::new();
    let deal = Uuid::new_v4();
    let history = History::default();
    let channel = ConversationChannel::open(
        broker.connection(),
        &history,
        ConversationScope::group(deal, Uuid::new_v4()),
    )
    .await
    .unwrap();
    assert_eq!(broker.active_subscriptions(&deal_topic(deal)), 1);

    channel.close().await;
    assert_eq!(broker.total_subscriptions(), 0);
}

#[tokio::test]
async fn dropping_the_channel_releases_the_connection() {
    let broker = MemoryBroker::new();
    let history = History::default();
    let channel = ConversationChannel::open(
        broker.connection(),
        &history,
        ConversationScope::group(Uuid::new_v4(), Uuid::new_v4()),
    )
    .await
    .unwrap();
    assert_eq!(broker.total_subscriptions(), 1);

    drop(channel);
    assert_eq!(broker.total_subscriptions(), 0);
}
