//! In-memory marketplace server for the room tests.

#![allow(dead_code)]

use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use uuid::Uuid;

use innovest_api::{
    AccessAuthority, ApiError, ChatHistory, DealSource, DocumentStore, MandateDesk,
};
use innovest_types::models::{
    AccessRequest, AccessStatus, Deal, DealStatus, DocType, Document, MandateInterest,
    MandateInterestStatus, Message, PrivateDeal,
};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Calls {
    pub request_access: usize,
    pub private_fetches: usize,
    pub decisions: usize,
    pub downloads: usize,
    pub history: usize,
}

#[derive(Default)]
struct State {
    requests: Vec<AccessRequest>,
    interests: Vec<MandateInterest>,
    messages: Vec<Message>,
    calls: Calls,
    offline: bool,
    private_unavailable: bool,
}

pub struct FakeMarket {
    pub deals: Vec<Deal>,
    pub documents: Vec<Document>,
    state: Mutex<State>,
}

fn rejected(message: &str) -> ApiError {
    ApiError::Rejected {
        status: 500,
        message: message.into(),
    }
}

pub fn deal(innovator_id: Uuid) -> Deal {
    Deal {
        id: Uuid::new_v4(),
        title: "Solar Roofs".into(),
        industry: Some("Energy".into()),
        teaser_summary: Some("Cheaper panels".into()),
        target_amount: Some(250_000.0),
        status: DealStatus::Active,
        innovator_id,
    }
}

pub fn document() -> Document {
    Document {
        id: Uuid::new_v4(),
        file_type: DocType::Financials,
        private: true,
        name: Some("model.xlsx".into()),
    }
}

impl FakeMarket {
    pub fn new(deals: Vec<Deal>) -> Self {
        Self {
            deals,
            documents: vec![document()],
            state: Mutex::new(State::default()),
        }
    }

    pub fn calls(&self) -> Calls {
        self.state.lock().unwrap().calls
    }

    pub fn requests(&self) -> Vec<AccessRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    /// Every REST call fails with a timeout while offline.
    pub fn set_offline(&self, offline: bool) {
        self.state.lock().unwrap().offline = offline;
    }

    /// Only the private projection fails; every other call still works.
    pub fn set_private_unavailable(&self, unavailable: bool) {
        self.state.lock().unwrap().private_unavailable = unavailable;
    }

    pub fn add_message(&self, message: Message) {
        self.state.lock().unwrap().messages.push(message);
    }

    pub fn add_interest(&self, mandate_id: Uuid, innovator_id: Uuid) -> MandateInterest {
        let interest = MandateInterest {
            id: Uuid::new_v4(),
            mandate_id,
            innovator_id,
            innovator_name: None,
            status: MandateInterestStatus::Pending,
            created_at: None,
        };
        self.state.lock().unwrap().interests.push(interest.clone());
        interest
    }

    /// Stands in for the innovator acting in their own session.
    pub fn decide(&self, deal_id: Uuid, investor_id: Uuid, status: AccessStatus) {
        let mut state = self.state.lock().unwrap();
        if let Some(r) = state
            .requests
            .iter_mut()
            .find(|r| r.deal_id == deal_id && r.investor_id == investor_id)
        {
            r.status = status;
        }
    }

    pub fn seed_request(&self, request: AccessRequest) {
        self.state.lock().unwrap().requests.push(request);
    }

    fn online(&self) -> Result<std::sync::MutexGuard<'_, State>, ApiError> {
        let state = self.state.lock().unwrap();
        if state.offline {
            return Err(ApiError::Timeout);
        }
        Ok(state)
    }

    fn update(
        &self,
        request_id: Uuid,
        f: impl FnOnce(&mut AccessRequest) -> Result<(), ApiError>,
    ) -> Result<AccessRequest, ApiError> {
        let mut state = self.online()?;
        let request = state
            .requests
            .iter_mut()
            .find(|r| r.id == request_id)
            .ok_or_else(|| ApiError::NotFound("request".into()))?;
        f(request)?;
        Ok(request.clone())
    }
}

#[async_trait]
impl AccessAuthority for FakeMarket {
    async fn access_status(&self, deal_id: Uuid, user_id: Uuid) -> Result<Option<AccessRequest>, ApiError> {
        let state = self.online()?;
        Ok(state
            .requests
            .iter()
            .find(|r| r.deal_id == deal_id && r.investor_id == user_id)
            .cloned())
    }

    async fn request_access(&self, deal_id: Uuid, user_id: Uuid) -> Result<AccessRequest, ApiError> {
        let mut state = self.online()?;
        state.calls.request_access += 1;
        if state
            .requests
            .iter()
            .any(|r| r.deal_id == deal_id && r.investor_id == user_id)
        {
            return Err(rejected("Request already exists"));
        }
        let request = AccessRequest {
            id: Uuid::new_v4(),
            deal_id,
            investor_id: user_id,
            status: AccessStatus::Pending,
            nda_signed: false,
            intro_requested: false,
            nda_signed_at: None,
            created_at: None,
        };
        state.requests.push(request.clone());
        Ok(request)
    }

    async fn approve_request(&self, request_id: Uuid, _user_id: Uuid) -> Result<AccessRequest, ApiError> {
        self.state.lock().unwrap().calls.decisions += 1;
        self.update(request_id, |r| {
            if r.status != AccessStatus::Pending {
                return Err(rejected("Request is not pending"));
            }
            r.status = AccessStatus::Approved;
            Ok(())
        })
    }

    async fn reject_request(&self, request_id: Uuid, _user_id: Uuid) -> Result<AccessRequest, ApiError> {
        self.state.lock().unwrap().calls.decisions += 1;
        self.update(request_id, |r| {
            if r.status != AccessStatus::Pending {
                return Err(rejected("Request is not pending"));
            }
            r.status = AccessStatus::Rejected;
            Ok(())
        })
    }

    async fn sign_nda(&self, request_id: Uuid, _user_id: Uuid) -> Result<AccessRequest, ApiError> {
        self.update(request_id, |r| {
            if r.status != AccessStatus::Approved || r.nda_signed {
                return Err(rejected("Request must be APPROVED to sign NDA"));
            }
            r.nda_signed = true;
            Ok(())
        })
    }

    async fn request_intro(&self, request_id: Uuid, _user_id: Uuid) -> Result<(), ApiError> {
        self.update(request_id, |r| {
            if !r.nda_signed {
                return Err(rejected("NDA must be signed first"));
            }
            r.intro_requested = true;
            Ok(())
        })
        .map(|_| ())
    }

    async fn innovator_requests(&self, user_id: Uuid) -> Result<Vec<AccessRequest>, ApiError> {
        let owned: Vec<Uuid> = self
            .deals
            .iter()
            .filter(|d| d.innovator_id == user_id)
            .map(|d| d.id)
            .collect();
        let state = self.online()?;
        Ok(state
            .requests
            .iter()
            .filter(|r| owned.contains(&r.deal_id))
            .cloned()
            .collect())
    }

    async fn investor_requests(&self, user_id: Uuid) -> Result<Vec<AccessRequest>, ApiError> {
        let state = self.online()?;
        Ok(state
            .requests
            .iter()
            .filter(|r| r.investor_id == user_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl DealSource for FakeMarket {
    async fn public_deals(&self) -> Result<Vec<Deal>, ApiError> {
        self.online()?;
        Ok(self.deals.clone())
    }

    async fn private_deal(&self, deal_id: Uuid, user_id: Uuid) -> Result<PrivateDeal, ApiError> {
        let mut state = self.online()?;
        state.calls.private_fetches += 1;
        if state.private_unavailable {
            return Err(ApiError::Timeout);
        }
        let unlocked = state
            .requests
            .iter()
            .any(|r| r.deal_id == deal_id && r.investor_id == user_id && r.is_unlocked());
        if !unlocked {
            return Err(ApiError::Forbidden("NDA not signed".into()));
        }
        let deal = self
            .deals
            .iter()
            .find(|d| d.id == deal_id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound("deal".into()))?;
        Ok(PrivateDeal {
            deal,
            documents: self.documents.clone(),
        })
    }

    async fn innovator_deals(&self, user_id: Uuid) -> Result<Vec<Deal>, ApiError> {
        self.online()?;
        Ok(self
            .deals
            .iter()
            .filter(|d| d.innovator_id == user_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl DocumentStore for FakeMarket {
    async fn download_document(&self, doc_id: Uuid, user_id: Uuid) -> Result<Bytes, ApiError> {
        let mut state = self.online()?;
        state.calls.downloads += 1;
        Ok(Bytes::from(format!("{doc_id} watermarked for {user_id}")))
    }
}

#[async_trait]
impl ChatHistory for FakeMarket {
    async fn load_history(
        &self,
        deal_id: Uuid,
        _viewer_id: Uuid,
        counterpart_id: Option<Uuid>,
    ) -> Result<Vec<Message>, ApiError> {
        let mut state = self.online()?;
        state.calls.history += 1;
        Ok(state
            .messages
            .iter()
            .filter(|m| m.deal_id == deal_id)
            .filter(|m| {
                counterpart_id.is_none_or(|c| m.sender_id == c || m.recipient_id == Some(c))
            })
            .cloned()
            .collect())
    }
}

#[async_trait]
impl MandateDesk for FakeMarket {
    async fn express_interest(&self, mandate_id: Uuid) -> Result<(), ApiError> {
        let mut state = self.online()?;
        if state.interests.iter().any(|i| i.mandate_id == mandate_id) {
            return Err(rejected("Interest already expressed"));
        }
        state.interests.push(MandateInterest {
            id: Uuid::new_v4(),
            mandate_id,
            innovator_id: Uuid::nil(),
            innovator_name: None,
            status: MandateInterestStatus::Pending,
            created_at: None,
        });
        Ok(())
    }

    async fn has_interest(&self, mandate_id: Uuid) -> Result<bool, ApiError> {
        let state = self.online()?;
        Ok(state.interests.iter().any(|i| i.mandate_id == mandate_id))
    }

    async fn mandate_interests(&self, mandate_id: Uuid) -> Result<Vec<MandateInterest>, ApiError> {
        let state = self.online()?;
        Ok(state
            .interests
            .iter()
            .filter(|i| i.mandate_id == mandate_id)
            .cloned()
            .collect())
    }

    async fn set_interest_status(
        &self,
        interest_id: Uuid,
        status: MandateInterestStatus,
    ) -> Result<MandateInterest, ApiError> {
        let mut state = self.online()?;
        let interest = state
            .interests
            .iter_mut()
            .find(|i| i.id == interest_id)
            .ok_or_else(|| ApiError::NotFound("interest".into()))?;
        interest.status = status;
        Ok(interest.clone())
    }
}
