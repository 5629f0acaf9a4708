use std::fmt;

use tracing::{info, warn};
use uuid::Uuid;

use innovest_api::AccessAuthority;
use innovest_types::models::{AccessRequest, AccessStatus};
use innovest_types::{Decision, InterestStatus, TransitionError};

use crate::error::RoomError;

/// Where an investor stands on one deal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// No request yet.
    None,
    Pending,
    Rejected,
    /// Approved, NDA not yet signed.
    AwaitingNda,
    /// Approved and NDA signed.
    Unlocked { intro_requested: bool },
}

impl Stage {
    pub fn of(request: Option<&AccessRequest>) -> Self {
        let Some(request) = request else {
            return Self::None;
        };
        match request.status {
            AccessStatus::Pending => Self::Pending,
            AccessStatus::Rejected => Self::Rejected,
            AccessStatus::Approved if request.nda_signed => Self::Unlocked {
                intro_requested: request.intro_requested,
            },
            AccessStatus::Approved => Self::AwaitingNda,
        }
    }

    pub fn is_unlocked(self) -> bool {
        matches!(self, Self::Unlocked { .. })
    }

    pub fn has_chat(self) -> bool {
        self == Self::Unlocked {
            intro_requested: true,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::None => "NONE",
            Self::Pending => "PENDING",
            Self::Rejected => "REJECTED",
            Self::AwaitingNda => "APPROVED",
            Self::Unlocked {
                intro_requested: false,
            } => "NDA_SIGNED",
            Self::Unlocked {
                intro_requested: true,
            } => "INTRO_REQUESTED",
        })
    }
}

/// Follow-up work owed after a stage change. Each is emitted once, on the
/// transition into the stage that requires it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    FetchPrivate,
    OpenChat,
}

/// Client-side mirror of one (deal, investor) access request.
///
/// The server owns the request. Local state moves only when the server
/// accepts an action, and every action is checked against the current stage
/// first so a request that cannot succeed is never sent.
#[derive(Debug)]
pub struct AccessMachine {
    deal_id: Uuid,
    actor_id: Uuid,
    request: Option<AccessRequest>,
    effects: Vec<Effect>,
}

impl AccessMachine {
    /// Reads the viewer's current request for `deal_id`.
    pub async fn load<A>(authority: &A, deal_id: Uuid, viewer_id: Uuid) -> Result<Self, RoomError>
    where
        A: AccessAuthority + ?Sized,
    {
        let request = authority.access_status(deal_id, viewer_id).await?;
        Ok(Self::with_request(deal_id, viewer_id, request))
    }

    /// A machine seeded with a request already in hand. `actor_id` is the
    /// user performing actions: the investor, or the innovator reviewing.
    pub fn with_request(deal_id: Uuid, actor_id: Uuid, request: Option<AccessRequest>) -> Self {
        let mut machine = Self {
            deal_id,
            actor_id,
            request: None,
            effects: Vec::new(),
        };
        machine.apply(request);
        machine
    }

    pub fn deal_id(&self) -> Uuid {
        self.deal_id
    }

    pub fn stage(&self) -> Stage {
        Stage::of(self.request.as_ref())
    }

    pub fn request(&self) -> Option<&AccessRequest> {
        self.request.as_ref()
    }

    /// Drains the effects owed since the last call.
    pub fn take_effects(&mut self) -> Vec<Effect> {
        std::mem::take(&mut self.effects)
    }

    fn apply(&mut self, next: Option<AccessRequest>) {
        if let Some(request) = &next
            && !request.is_consistent()
        {
            warn!(request_id = %request.id, "Server sent an inconsistent access request");
        }

        let before = self.stage();
        self.request = next;
        let after = self.stage();
        if before == after {
            return;
        }

        info!(deal_id = %self.deal_id, %before, %after, "Access stage changed");
        if after.is_unlocked() && !before.is_unlocked() {
            self.effects.push(Effect::FetchPrivate);
        }
        if after.has_chat() && !before.has_chat() {
            self.effects.push(Effect::OpenChat);
        }
    }

    fn require(&self, action: &str, allowed: bool) -> Result<Uuid, TransitionError> {
        match &self.request {
            Some(request) if allowed => Ok(request.id),
            _ => Err(TransitionError::labelled(action, self.stage())),
        }
    }

    /// NONE → PENDING.
    pub async fn request_access<A>(&mut self, authority: &A) -> Result<Stage, RoomError>
    where
        A: AccessAuthority + ?Sized,
    {
        if self.stage() != Stage::None {
            return Err(TransitionError::labelled("request access", self.stage()).into());
        }
        let created = authority.request_access(self.deal_id, self.actor_id).await?;
        self.apply(Some(created));
        Ok(self.stage())
    }

    /// PENDING → APPROVED. Innovator only; the server checks ownership.
    pub async fn approve<A>(&mut self, authority: &A) -> Result<Stage, RoomError>
    where
        A: AccessAuthority + ?Sized,
    {
        self.decide(authority, Decision::Accept).await
    }

    /// PENDING → REJECTED. Innovator only; the server checks ownership.
    pub async fn reject<A>(&mut self, authority: &A) -> Result<Stage, RoomError>
    where
        A: AccessAuthority + ?Sized,
    {
        self.decide(authority, Decision::Decline).await
    }

    async fn decide<A>(&mut self, authority: &A, decision: Decision) -> Result<Stage, RoomError>
    where
        A: AccessAuthority + ?Sized,
    {
        let Some(request) = &self.request else {
            return Err(TransitionError::labelled(decision, Stage::None).into());
        };
        request.status.decide(decision)?;

        let id = request.id;
        let decided = match decision {
            Decision::Accept => authority.approve_request(id, self.actor_id).await?,
            Decision::Decline => authority.reject_request(id, self.actor_id).await?,
        };
        self.apply(Some(decided));
        Ok(self.stage())
    }

    /// APPROVED ∧ ¬ndaSigned → ndaSigned. Owes [`Effect::FetchPrivate`].
    pub async fn sign_nda<A>(&mut self, authority: &A) -> Result<Stage, RoomError>
    where
        A: AccessAuthority + ?Sized,
    {
        let id = self.require("sign the NDA", self.stage() == Stage::AwaitingNda)?;
        let signed = authority.sign_nda(id, self.actor_id).await?;
        self.apply(Some(signed));
        Ok(self.stage())
    }

    /// ndaSigned → introRequested. Owes [`Effect::OpenChat`].
    pub async fn request_intro<A>(&mut self, authority: &A) -> Result<Stage, RoomError>
    where
        A: AccessAuthority + ?Sized,
    {
        let allowed = self.stage()
            == Stage::Unlocked {
                intro_requested: false,
            };
        let id = self.require("request an intro", allowed)?;
        authority.request_intro(id, self.actor_id).await?;
        // The intro endpoint does not echo the request.
        self.refresh(authority).await
    }

    /// Re-reads the request from the server.
    pub async fn refresh<A>(&mut self, authority: &A) -> Result<Stage, RoomError>
    where
        A: AccessAuthority + ?Sized,
    {
        let investor_id = self
            .request
            .as_ref()
            .map_or(self.actor_id, |r| r.investor_id);
        let current = authority.access_status(self.deal_id, investor_id).await?;
        self.apply(current);
        Ok(self.stage())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(status: AccessStatus, nda_signed: bool, intro_requested: bool) -> AccessRequest {
        AccessRequest {
            id: Uuid::new_v4(),
            deal_id: Uuid::nil(),
            investor_id: Uuid::nil(),
            status,
            nda_signed,
            intro_requested,
            nda_signed_at: None,
            created_at: None,
        }
    }

    #[test]
    fn stages_follow_request_fields() {
        assert_eq!(Stage::of(None), Stage::None);
        assert_eq!(
            Stage::of(Some(&request(AccessStatus::Pending, false, false))),
            Stage::Pending
        );
        assert_eq!(
            Stage::of(Some(&request(AccessStatus::Approved, false, false))),
            Stage::AwaitingNda
        );
        assert_eq!(
            Stage::of(Some(&request(AccessStatus::Approved, true, true))),
            Stage::Unlocked {
                intro_requested: true
            }
        );
        assert_eq!(
            Stage::of(Some(&request(AccessStatus::Rejected, false, false))),
            Stage::Rejected
        );
    }

    #[test]
    fn entering_an_unlocked_room_owes_both_effects_once() {
        let mut machine = AccessMachine::with_request(
            Uuid::nil(),
            Uuid::nil(),
            Some(request(AccessStatus::Approved, true, true)),
        );
        assert_eq!(
            machine.take_effects(),
            vec![Effect::FetchPrivate, Effect::OpenChat]
        );
        assert!(machine.take_effects().is_empty());
    }

    #[test]
    fn same_stage_owes_nothing() {
        let unlocked = request(AccessStatus::Approved, true, false);
        let mut machine = AccessMachine::with_request(Uuid::nil(), Uuid::nil(), Some(unlocked.clone()));
        machine.take_effects();

        machine.apply(Some(unlocked));
        assert!(machine.take_effects().is_empty());
    }

    #[test]
    fn stage_labels_name_the_server_state() {
        let err = TransitionError::labelled("sign the NDA", Stage::Pending);
        assert_eq!(err.to_string(), "cannot sign the NDA while PENDING");
    }
}
