use std::collections::HashSet;

use uuid::Uuid;

use innovest_types::models::Message;

/// The visible conversation: ordered by `(created_at, id)`, each id once,
/// regardless of whether a message arrived by history or live delivery.
#[derive(Debug, Default, Clone)]
pub struct Transcript {
    messages: Vec<Message>,
    seen: HashSet<Uuid>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` for an id already present.
    pub fn insert(&mut self, message: Message) -> bool {
        if !self.seen.insert(message.id) {
            return false;
        }
        let key = (message.created_at, message.id);
        let at = self
            .messages
            .partition_point(|m| (m.created_at, m.id) <= key);
        self.messages.insert(at, message);
        true
    }

    /// Merges a batch (typically a history page). Returns how many were new.
    pub fn extend(&mut self, messages: impl IntoIterator<Item = Message>) -> usize {
        messages
            .into_iter()
            .map(|m| self.insert(m))
            .filter(|new| *new)
            .count()
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.seen.contains(&id)
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
        self.seen.clear();
    }
}
