use async_trait::async_trait;
use reqwest::Method;
use uuid::Uuid;

use innovest_types::models::{MandateInterest, MandateInterestStatus};

use crate::auth::Session;
use crate::error::ApiError;

/// Innovator-to-mandate interest endpoints. The caller is taken from the
/// bearer token, so none of these carry a `userId`.
#[async_trait]
pub trait MandateDesk: Send + Sync {
    /// POST /mandates/{id}/interest
    async fn express_interest(&self, mandate_id: Uuid) -> Result<(), ApiError>;

    /// GET /mandates/{id}/interest
    async fn has_interest(&self, mandate_id: Uuid) -> Result<bool, ApiError>;

    /// GET /mandates/{id}/interests, for the mandate's investor.
    async fn mandate_interests(&self, mandate_id: Uuid) -> Result<Vec<MandateInterest>, ApiError>;

    /// PUT /mandates/interests/{id}?status=
    async fn set_interest_status(
        &self,
        interest_id: Uuid,
        status: MandateInterestStatus,
    ) -> Result<MandateInterest, ApiError>;
}

#[async_trait]
impl MandateDesk for Session {
    async fn express_interest(&self, mandate_id: Uuid) -> Result<(), ApiError> {
        self.send_empty(Method::POST, &format!("mandates/{mandate_id}/interest"), &[])
            .await
    }

    async fn has_interest(&self, mandate_id: Uuid) -> Result<bool, ApiError> {
        self.get_json(&format!("mandates/{mandate_id}/interest"), &[]).await
    }

    async fn mandate_interests(&self, mandate_id: Uuid) -> Result<Vec<MandateInterest>, ApiError> {
        self.get_json(&format!("mandates/{mandate_id}/interests"), &[]).await
    }

    async fn set_interest_status(
        &self,
        interest_id: Uuid,
        status: MandateInterestStatus,
    ) -> Result<MandateInterest, ApiError> {
        self.send_json(
            Method::PUT,
            &format!("mandates/interests/{interest_id}"),
            &[("status", status.as_str().to_string())],
        )
        .await
    }
}
