use async_trait::async_trait;
use uuid::Uuid;

use innovest_types::models::{Deal, PrivateDeal};

use crate::auth::Session;
use crate::error::ApiError;

#[async_trait]
pub trait DealSource: Send + Sync {
    /// GET /public/deals
    async fn public_deals(&self) -> Result<Vec<Deal>, ApiError>;

    /// The public projection of one deal. There is no single-deal public
    /// endpoint, so the default looks it up in the listing.
    async fn public_deal(&self, deal_id: Uuid) -> Result<Option<Deal>, ApiError> {
        Ok(self.public_deals().await?.into_iter().find(|d| d.id == deal_id))
    }

    /// GET /deals/{dealId}/full_details. Refused unless the caller's request
    /// is approved and NDA-signed.
    async fn private_deal(&self, deal_id: Uuid, user_id: Uuid) -> Result<PrivateDeal, ApiError>;

    /// GET /innovator/deals: every deal the innovator created.
    async fn innovator_deals(&self, user_id: Uuid) -> Result<Vec<Deal>, ApiError>;
}

#[async_trait]
impl DealSource for Session {
    async fn public_deals(&self) -> Result<Vec<Deal>, ApiError> {
        self.get_json("public/deals", &[]).await
    }

    async fn private_deal(&self, deal_id: Uuid, user_id: Uuid) -> Result<PrivateDeal, ApiError> {
        self.get_json(
            &format!("deals/{deal_id}/full_details"),
            &[("userId", user_id.to_string())],
        )
        .await
    }

    async fn innovator_deals(&self, user_id: Uuid) -> Result<Vec<Deal>, ApiError> {
        self.get_json("innovator/deals", &[("userId", user_id.to_string())])
            .await
    }
}
