use uuid::Uuid;

use innovest_types::models::Message;

/// Whether a message on the shared deal topic belongs to the viewer's open
/// conversation. `counterpart_id == None` is the deal-wide group view.
pub fn is_relevant(message: &Message, viewer_id: Uuid, counterpart_id: Option<Uuid>) -> bool {
    let i_sent_it = message.sender_id == viewer_id;
    let sent_to_current_recipient = message.recipient_id == counterpart_id;
    let they_sent_it = counterpart_id.is_some_and(|c| message.sender_id == c);
    let sent_to_me = message.recipient_id == Some(viewer_id);
    let sent_to_group = message.recipient_id.is_none();

    (i_sent_it && sent_to_current_recipient)
        || (they_sent_it && (sent_to_me || sent_to_group))
        || (counterpart_id.is_none() && sent_to_group)
}

/// The conversation a channel is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConversationScope {
    pub deal_id: Uuid,
    pub viewer_id: Uuid,
    pub counterpart_id: Option<Uuid>,
}

impl ConversationScope {
    pub fn group(deal_id: Uuid, viewer_id: Uuid) -> Self {
        Self {
            deal_id,
            viewer_id,
            counterpart_id: None,
        }
    }

    pub fn direct(deal_id: Uuid, viewer_id: Uuid, counterpart_id: Uuid) -> Self {
        Self {
            deal_id,
            viewer_id,
            counterpart_id: Some(counterpart_id),
        }
    }

    pub fn with_counterpart(self, counterpart_id: Option<Uuid>) -> Self {
        Self {
            counterpart_id,
            ..self
        }
    }

    /// Relevance plus a guard against payloads that carry another deal's id.
    pub fn admits(&self, message: &Message) -> bool {
        message.deal_id == self.deal_id
            && is_relevant(message, self.viewer_id, self.counterpart_id)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn msg(sender: Uuid, recipient: Option<Uuid>) -> Message {
        Message {
            id: Uuid::new_v4(),
            deal_id: Uuid::nil(),
            sender_id: sender,
            recipient_id: recipient,
            content: "x".into(),
            created_at: Utc::now(),
        }
    }

    fn ids() -> (Uuid, Uuid, Uuid) {
        (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4())
    }

    #[test]
    fn direct_view_shows_my_message_to_counterpart() {
        let (u, c, _) = ids();
        assert!(is_relevant(&msg(u, Some(c)), u, Some(c)));
    }

    #[test]
    fn direct_view_hides_my_group_broadcast() {
        let (u, c, _) = ids();
        assert!(!is_relevant(&msg(u, None), u, Some(c)));
    }

    #[test]
    fn direct_view_shows_counterpart_message_to_me() {
        let (u, c, _) = ids();
        assert!(is_relevant(&msg(c, Some(u)), u, Some(c)));
    }

    #[test]
    fn direct_view_shows_counterpart_group_message() {
        let (u, c, _) = ids();
        assert!(is_relevant(&msg(c, None), u, Some(c)));
    }

    #[test]
    fn group_view_shows_every_group_message() {
        let (u, c, other) = ids();
        for sender in [u, c, other] {
            assert!(is_relevant(&msg(sender, None), u, None));
        }
    }

    #[test]
    fn group_view_hides_my_direct_message() {
        let (u, _, someone) = ids();
        assert!(!is_relevant(&msg(u, Some(someone)), u, None));
    }

    #[test]
    fn direct_view_hides_third_party_traffic() {
        let (u, c, other) = ids();
        assert!(!is_relevant(&msg(other, Some(c)), u, Some(c)));
        assert!(!is_relevant(&msg(other, None), u, Some(c)));
        assert!(!is_relevant(&msg(c, Some(other)), u, Some(c)));
    }

    #[test]
    fn scope_rejects_foreign_deal() {
        let (u, _, _) = ids();
        let scope = ConversationScope::group(Uuid::new_v4(), u);
        assert!(!scope.admits(&msg(u, None)));
        assert!(ConversationScope::group(Uuid::nil(), u).admits(&msg(u, None)));
    }
}
