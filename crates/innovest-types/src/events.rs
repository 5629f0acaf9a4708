use uuid::Uuid;

/// Broker topic carrying every message (group and direct) for one deal.
pub fn deal_topic(deal_id: Uuid) -> String {
    format!("/topic/deal/{deal_id}")
}

/// Application destination a client publishes chat messages to.
pub fn send_destination(deal_id: Uuid) -> String {
    format!("/app/chat/{deal_id}/sendMessage")
}

/// Extracts the deal id from a `/app/chat/{dealId}/sendMessage` destination.
pub fn parse_send_destination(destination: &str) -> Option<Uuid> {
    destination
        .strip_prefix("/app/chat/")?
        .strip_suffix("/sendMessage")?
        .parse()
        .ok()
}
