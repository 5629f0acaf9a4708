use bytes::Bytes;
use tracing::{debug, info, warn};
use uuid::Uuid;

use innovest_api::{AccessAuthority, ChatHistory, DealSource, DocumentStore};
use innovest_gateway::{Connector, ConversationChannel, ConversationScope, PubSub};
use innovest_types::TransitionError;
use innovest_types::models::{Deal, Document, Message, PrivateDeal};

use crate::access::{AccessMachine, Effect, Stage};
use crate::error::{Banner, RoomError};

/// Everything a deal room needs from the REST side.
pub trait Marketplace: AccessAuthority + DealSource + DocumentStore + ChatHistory {}

impl<T> Marketplace for T where T: AccessAuthority + DealSource + DocumentStore + ChatHistory + ?Sized {}

/// The primary action a room offers the viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Affordance {
    NotFound,
    /// Loading failed; the banner says why and [`DealRoom::reload`] retries.
    Unavailable,
    /// Anonymous viewer: public projection only.
    SignIn,
    /// The viewer created this deal.
    Owner,
    RequestAccess,
    Pending,
    Rejected,
    SignNda,
    /// Data room open; an intro request would unlock chat.
    ExpressInterest,
    /// Data room and chat open.
    Chat,
}

/// One open deal room.
///
/// Opening a room never fails: errors become a [`Banner`] and the
/// affordance reflects what could be loaded. Actions also return their
/// error for callers that handle it directly.
pub struct DealRoom<'a, M: Marketplace + ?Sized, C: Connector> {
    market: &'a M,
    connector: &'a C,
    viewer_id: Option<Uuid>,
    deal_id: Uuid,
    missing: bool,
    deal: Option<Deal>,
    access: Option<AccessMachine>,
    private: Option<PrivateDeal>,
    chat: Option<ConversationChannel<C::Transport>>,
    banner: Option<Banner>,
}

impl<'a, M, C> DealRoom<'a, M, C>
where
    M: Marketplace + ?Sized,
    C: Connector,
{
    pub async fn open(market: &'a M, connector: &'a C, viewer_id: Option<Uuid>, deal_id: Uuid) -> Self {
        let mut room = Self {
            market,
            connector,
            viewer_id,
            deal_id,
            missing: false,
            deal: None,
            access: None,
            private: None,
            chat: None,
            banner: None,
        };
        let loaded = room.load().await;
        let _ = room.surface(loaded);
        room
    }

    async fn load(&mut self) -> Result<(), RoomError> {
        let Some(deal) = self.market.public_deal(self.deal_id).await? else {
            info!(deal_id = %self.deal_id, "Deal not found");
            self.missing = true;
            return Ok(());
        };
        let owner = Some(deal.innovator_id) == self.viewer_id;
        self.deal = Some(deal);

        let Some(viewer_id) = self.viewer_id else {
            return Ok(());
        };
        if owner {
            return Ok(());
        }
        self.access = Some(AccessMachine::load(self.market, self.deal_id, viewer_id).await?);
        self.run_effects().await
    }

    /// Drops everything loaded, including the chat connection, and loads
    /// the room again.
    pub async fn reload(&mut self) {
        if let Some(chat) = self.chat.take() {
            chat.close().await;
        }
        self.missing = false;
        self.deal = None;
        self.access = None;
        self.private = None;
        let loaded = self.load().await;
        let _ = self.surface(loaded);
    }

    pub fn deal_id(&self) -> Uuid {
        self.deal_id
    }

    pub fn deal(&self) -> Option<&Deal> {
        self.deal.as_ref()
    }

    pub fn access(&self) -> Option<&AccessMachine> {
        self.access.as_ref()
    }

    pub fn stage(&self) -> Option<Stage> {
        self.access.as_ref().map(AccessMachine::stage)
    }

    pub fn private(&self) -> Option<&PrivateDeal> {
        self.private.as_ref()
    }

    /// Documents with download links. Empty until the data room is unlocked.
    pub fn documents(&self) -> &[Document] {
        self.private
            .as_ref()
            .map(|p| p.documents.as_slice())
            .unwrap_or_default()
    }

    pub fn banner(&self) -> Option<&Banner> {
        self.banner.as_ref()
    }

    pub fn dismiss_banner(&mut self) {
        self.banner = None;
    }

    pub fn chat(&self) -> Option<&ConversationChannel<C::Transport>> {
        self.chat.as_ref()
    }

    pub fn affordance(&self) -> Affordance {
        if self.missing {
            return Affordance::NotFound;
        }
        let Some(deal) = &self.deal else {
            return Affordance::Unavailable;
        };
        let Some(viewer_id) = self.viewer_id else {
            return Affordance::SignIn;
        };
        if deal.innovator_id == viewer_id {
            return Affordance::Owner;
        }
        match self.stage() {
            None => Affordance::Unavailable,
            Some(Stage::None) => Affordance::RequestAccess,
            Some(Stage::Pending) => Affordance::Pending,
            Some(Stage::Rejected) => Affordance::Rejected,
            Some(Stage::AwaitingNda) => Affordance::SignNda,
            Some(Stage::Unlocked {
                intro_requested: false,
            }) => Affordance::ExpressInterest,
            Some(Stage::Unlocked {
                intro_requested: true,
            }) => Affordance::Chat,
        }
    }

    fn surface<T>(&mut self, result: Result<T, RoomError>) -> Result<T, RoomError> {
        match &result {
            Ok(_) => self.banner = None,
            Err(e) => {
                warn!(deal_id = %self.deal_id, kind = ?e.kind(), "{}", e);
                self.banner = Some(Banner::from(e));
            }
        }
        result
    }

    fn machine(&mut self, action: &'static str) -> Result<&mut AccessMachine, RoomError> {
        if self.viewer_id.is_none() {
            return Err(RoomError::SignedOut(action));
        }
        let affordance = self.affordance();
        self.access
            .as_mut()
            .ok_or_else(|| TransitionError::new(action, affordance).into())
    }

    async fn run_effects(&mut self) -> Result<(), RoomError> {
        let effects = match self.access.as_mut() {
            Some(access) => access.take_effects(),
            None => return Ok(()),
        };

        let mut first_err = None;
        for effect in effects {
            debug!(deal_id = %self.deal_id, ?effect, "Running effect");
            let result = match effect {
                Effect::FetchPrivate => self.fetch_private().await,
                Effect::OpenChat => self.connect_chat(None).await,
            };
            if let Err(e) = result {
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    async fn fetch_private(&mut self) -> Result<(), RoomError> {
        let viewer_id = self.viewer_id.ok_or(RoomError::SignedOut("open the data room"))?;
        let private = self.market.private_deal(self.deal_id, viewer_id).await?;
        info!(deal_id = %self.deal_id, documents = private.documents.len(), "Data room unlocked");
        self.private = Some(private);
        Ok(())
    }

    /// Opens a fresh connection and conversation, closing any previous one
    /// first.
    async fn connect_chat(&mut self, counterpart_id: Option<Uuid>) -> Result<(), RoomError> {
        let viewer_id = self.viewer_id.ok_or(RoomError::SignedOut("chat"))?;
        if let Some(previous) = self.chat.take() {
            previous.close().await;
        }
        let transport = self.connector.connect().await?;
        let scope = ConversationScope {
            deal_id: self.deal_id,
            viewer_id,
            counterpart_id,
        };
        self.chat = Some(ConversationChannel::open(transport, self.market, scope).await?);
        Ok(())
    }

    // -- Access actions --

    pub async fn request_access(&mut self) -> Result<(), RoomError> {
        let result = self.request_access_inner().await;
        self.surface(result)
    }

    async fn request_access_inner(&mut self) -> Result<(), RoomError> {
        let market = self.market;
        self.machine("request access")?.request_access(market).await?;
        Ok(())
    }

    /// Signs the NDA and, once the server accepts, opens the data room.
    pub async fn sign_nda(&mut self) -> Result<(), RoomError> {
        let result = self.sign_nda_inner().await;
        self.surface(result)
    }

    async fn sign_nda_inner(&mut self) -> Result<(), RoomError> {
        let market = self.market;
        self.machine("sign the NDA")?.sign_nda(market).await?;
        self.run_effects().await
    }

    /// Requests an intro and, once recorded, opens the chat.
    pub async fn request_intro(&mut self) -> Result<(), RoomError> {
        let result = self.request_intro_inner().await;
        self.surface(result)
    }

    async fn request_intro_inner(&mut self) -> Result<(), RoomError> {
        let market = self.market;
        self.machine("request an intro")?.request_intro(market).await?;
        self.run_effects().await
    }

    /// Re-reads the access request, e.g. after the innovator decided.
    pub async fn refresh(&mut self) -> Result<(), RoomError> {
        let result = self.refresh_inner().await;
        self.surface(result)
    }

    async fn refresh_inner(&mut self) -> Result<(), RoomError> {
        let market = self.market;
        self.machine("refresh access")?.refresh(market).await?;
        self.run_effects().await
    }

    /// Retries the private projection after a failed unlock fetch.
    pub async fn load_private(&mut self) -> Result<(), RoomError> {
        let result = if self.stage().is_some_and(Stage::is_unlocked) {
            self.fetch_private().await
        } else {
            Err(TransitionError::new("open the data room", self.affordance()).into())
        };
        self.surface(result)
    }

    // -- Documents --

    /// Fetches a watermarked copy of a data-room document.
    pub async fn download(&mut self, doc_id: Uuid) -> Result<Bytes, RoomError> {
        let result = self.download_inner(doc_id).await;
        self.surface(result)
    }

    async fn download_inner(&self, doc_id: Uuid) -> Result<Bytes, RoomError> {
        let viewer_id = self.viewer_id.ok_or(RoomError::SignedOut("download documents"))?;
        if !self.stage().is_some_and(Stage::is_unlocked) {
            return Err(TransitionError::new("download documents", self.affordance()).into());
        }
        if self.private.as_ref().and_then(|p| p.document(doc_id)).is_none() {
            return Err(RoomError::DocumentNotFound(doc_id));
        }
        Ok(self.market.download_document(doc_id, viewer_id).await?)
    }

    // -- Chat --

    fn chat_allowed(&self) -> bool {
        matches!(self.affordance(), Affordance::Chat | Affordance::Owner)
    }

    /// Shows the conversation with `counterpart_id`, or the deal-wide group
    /// conversation for `None`.
    pub async fn chat_with(&mut self, counterpart_id: Option<Uuid>) -> Result<(), RoomError> {
        let result = self.chat_with_inner(counterpart_id).await;
        self.surface(result)
    }

    async fn chat_with_inner(&mut self, counterpart_id: Option<Uuid>) -> Result<(), RoomError> {
        if !self.chat_allowed() {
            return Err(RoomError::ChatUnavailable);
        }
        let market = self.market;
        if let Some(chat) = self.chat.as_mut()
            && chat.is_live()
        {
            chat.switch_counterpart(market, counterpart_id).await?;
            return Ok(());
        }
        self.connect_chat(counterpart_id).await
    }

    pub async fn send_message(&mut self, content: &str) -> Result<(), RoomError> {
        let result = match &self.chat {
            Some(chat) => chat.send(content).await.map_err(RoomError::from),
            None => Err(RoomError::ChatUnavailable),
        };
        self.surface(result)
    }

    /// Applies buffered live deliveries; returns the newly shown messages.
    pub fn poll_messages(&mut self) -> Vec<Message> {
        self.chat.as_mut().map(ConversationChannel::drain).unwrap_or_default()
    }

    /// Waits for the next message shown in the conversation. `None` when
    /// no chat is open or its connection ended.
    pub async fn next_message(&mut self) -> Option<Message> {
        self.chat.as_mut()?.recv().await
    }

    /// Brings the conversation up to date after a connection problem. A
    /// live connection is resynced in place; a dead one is replaced.
    pub async fn resync_chat(&mut self) -> Result<(), RoomError> {
        let result = self.resync_chat_inner().await;
        self.surface(result)
    }

    async fn resync_chat_inner(&mut self) -> Result<(), RoomError> {
        let market = self.market;
        if let Some(chat) = self.chat.as_mut()
            && chat.transport().is_connected()
        {
            chat.resync(market).await?;
            return Ok(());
        }
        let counterpart_id = match &self.chat {
            Some(chat) => chat.scope().counterpart_id,
            None if self.chat_allowed() => None,
            None => return Err(RoomError::ChatUnavailable),
        };
        self.connect_chat(counterpart_id).await
    }

    /// Releases the chat connection.
    pub async fn close(mut self) {
        if let Some(chat) = self.chat.take() {
            chat.close().await;
        }
        debug!(deal_id = %self.deal_id, "Deal room closed");
    }
}

/// Holds at most one open deal room. Opening another closes the current
/// one first, so navigation never accumulates subscriptions.
pub struct Navigator<'a, M: Marketplace + ?Sized, C: Connector> {
    market: &'a M,
    connector: &'a C,
    viewer_id: Option<Uuid>,
    current: Option<DealRoom<'a, M, C>>,
}

impl<'a, M, C> Navigator<'a, M, C>
where
    M: Marketplace + ?Sized,
    C: Connector,
{
    pub fn new(market: &'a M, connector: &'a C, viewer_id: Option<Uuid>) -> Self {
        Self {
            market,
            connector,
            viewer_id,
            current: None,
        }
    }

    pub async fn open(&mut self, deal_id: Uuid) -> &mut DealRoom<'a, M, C> {
        self.close().await;
        let room = DealRoom::open(self.market, self.connector, self.viewer_id, deal_id).await;
        self.current.insert(room)
    }

    pub fn current(&mut self) -> Option<&mut DealRoom<'a, M, C>> {
        self.current.as_mut()
    }

    pub async fn close(&mut self) {
        if let Some(room) = self.current.take() {
            room.close().await;
        }
    }
}
