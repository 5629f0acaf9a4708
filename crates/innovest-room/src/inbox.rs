use std::collections::HashMap;

use async_trait::async_trait;
use uuid::Uuid;

use innovest_api::{AccessAuthority, DealSource};
use innovest_types::models::{AccessRequest, AccessStatus, Deal, Role};

use crate::error::RoomError;

/// A chat the viewer can open from the messages view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    pub deal_id: Uuid,
    pub title: String,
    pub counterpart_id: Uuid,
}

/// The "all my conversations" view. Innovators and investors find their
/// conversations differently, so each role has its own implementation.
#[async_trait]
pub trait Inbox: Send + Sync {
    async fn conversations(&self) -> Result<Vec<Conversation>, RoomError>;
}

fn chat_open(request: &AccessRequest) -> bool {
    request.status == AccessStatus::Approved && request.intro_requested
}

/// One conversation per investor who requested an intro on one of the
/// innovator's deals.
pub struct InnovatorInbox<'a, S: ?Sized> {
    source: &'a S,
    user_id: Uuid,
}

impl<'a, S: ?Sized> InnovatorInbox<'a, S> {
    pub fn new(source: &'a S, user_id: Uuid) -> Self {
        Self { source, user_id }
    }
}

#[async_trait]
impl<'a, S> Inbox for InnovatorInbox<'a, S>
where
    S: AccessAuthority + DealSource + ?Sized,
{
    async fn conversations(&self) -> Result<Vec<Conversation>, RoomError> {
        let deals = self.source.innovator_deals(self.user_id).await?;
        let requests = self.source.innovator_requests(self.user_id).await?;

        let mut conversations = Vec::new();
        for deal in &deals {
            conversations.extend(
                requests
                    .iter()
                    .filter(|r| r.deal_id == deal.id && chat_open(r))
                    .map(|r| Conversation {
                        deal_id: deal.id,
                        title: deal.title.clone(),
                        counterpart_id: r.investor_id,
                    }),
            );
        }
        Ok(conversations)
    }
}

/// One conversation with the innovator of each deal where the investor's
/// intro request went through.
pub struct InvestorInbox<'a, S: ?Sized> {
    source: &'a S,
    user_id: Uuid,
}

impl<'a, S: ?Sized> InvestorInbox<'a, S> {
    pub fn new(source: &'a S, user_id: Uuid) -> Self {
        Self { source, user_id }
    }
}

#[async_trait]
impl<'a, S> Inbox for InvestorInbox<'a, S>
where
    S: AccessAuthority + DealSource + ?Sized,
{
    async fn conversations(&self) -> Result<Vec<Conversation>, RoomError> {
        let requests = self.source.investor_requests(self.user_id).await?;
        let deals: HashMap<Uuid, Deal> = self
            .source
            .public_deals()
            .await?
            .into_iter()
            .map(|d| (d.id, d))
            .collect();

        // A deal that left the public listing has no innovator to talk to.
        Ok(requests
            .iter()
            .filter(|r| chat_open(r))
            .filter_map(|r| deals.get(&r.deal_id))
            .map(|deal| Conversation {
                deal_id: deal.id,
                title: deal.title.clone(),
                counterpart_id: deal.innovator_id,
            })
            .collect())
    }
}

/// Picks the inbox for the signed-in role. Admins have no conversations.
pub fn inbox_for<'a, S>(source: &'a S, role: Role, user_id: Uuid) -> Option<Box<dyn Inbox + 'a>>
where
    S: AccessAuthority + DealSource + ?Sized,
{
    match role {
        Role::Innovator => Some(Box::new(InnovatorInbox::new(source, user_id))),
        Role::Investor => Some(Box::new(InvestorInbox::new(source, user_id))),
        Role::Admin => None,
    }
}
