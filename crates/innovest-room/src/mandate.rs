use tracing::info;
use uuid::Uuid;

use innovest_api::MandateDesk;
use innovest_types::models::MandateInterest;
use innovest_types::{Decision, InterestStatus, TransitionError};

use crate::error::RoomError;

/// Interest in investor mandates, from both sides. Decisions go through the
/// same pending → decided lifecycle as deal access.
pub struct InterestDesk<'a, D: MandateDesk + ?Sized> {
    desk: &'a D,
}

impl<'a, D: MandateDesk + ?Sized> InterestDesk<'a, D> {
    pub fn new(desk: &'a D) -> Self {
        Self { desk }
    }

    /// Innovator side. Expressing interest twice is refused.
    pub async fn express_interest(&self, mandate_id: Uuid) -> Result<(), RoomError> {
        if self.desk.has_interest(mandate_id).await? {
            return Err(TransitionError::labelled("express interest", "INTERESTED").into());
        }
        self.desk.express_interest(mandate_id).await?;
        info!(%mandate_id, "Interest expressed");
        Ok(())
    }

    pub async fn has_interest(&self, mandate_id: Uuid) -> Result<bool, RoomError> {
        Ok(self.desk.has_interest(mandate_id).await?)
    }

    /// Investor side: everyone interested in one of their mandates.
    pub async fn list_interests(&self, mandate_id: Uuid) -> Result<Vec<MandateInterest>, RoomError> {
        Ok(self.desk.mandate_interests(mandate_id).await?)
    }

    pub async fn mark_contacted(&self, interest: &MandateInterest) -> Result<MandateInterest, RoomError> {
        self.decide(interest, Decision::Accept).await
    }

    pub async fn reject(&self, interest: &MandateInterest) -> Result<MandateInterest, RoomError> {
        self.decide(interest, Decision::Decline).await
    }

    async fn decide(&self, interest: &MandateInterest, decision: Decision) -> Result<MandateInterest, RoomError> {
        let next = interest.status.decide(decision)?;
        let updated = self.desk.set_interest_status(interest.id, next).await?;
        info!(interest_id = %interest.id, status = updated.status.as_str(), "Mandate interest decided");
        Ok(updated)
    }
}
