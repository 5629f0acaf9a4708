use async_trait::async_trait;
use reqwest::Method;
use uuid::Uuid;

use innovest_types::models::AccessRequest;

use crate::auth::Session;
use crate::error::ApiError;

/// The external authority that owns access-request state. Every transition
/// is decided here; clients only mirror the accepted result.
#[async_trait]
pub trait AccessAuthority: Send + Sync {
    /// GET /access/status/{dealId}. `None` means no request exists yet.
    async fn access_status(&self, deal_id: Uuid, user_id: Uuid) -> Result<Option<AccessRequest>, ApiError>;

    /// POST /deals/{dealId}/request. NONE → PENDING.
    async fn request_access(&self, deal_id: Uuid, user_id: Uuid) -> Result<AccessRequest, ApiError>;

    /// Innovator approval. PENDING → APPROVED.
    async fn approve_request(&self, request_id: Uuid, user_id: Uuid) -> Result<AccessRequest, ApiError>;

    /// Innovator rejection. PENDING → REJECTED.
    async fn reject_request(&self, request_id: Uuid, user_id: Uuid) -> Result<AccessRequest, ApiError>;

    async fn sign_nda(&self, request_id: Uuid, user_id: Uuid) -> Result<AccessRequest, ApiError>;

    /// Sets `introRequested`. The server does not echo the updated request.
    async fn request_intro(&self, request_id: Uuid, user_id: Uuid) -> Result<(), ApiError>;

    /// Requests on every deal owned by the innovator.
    async fn innovator_requests(&self, user_id: Uuid) -> Result<Vec<AccessRequest>, ApiError>;

    /// Requests made by the investor.
    async fn investor_requests(&self, user_id: Uuid) -> Result<Vec<AccessRequest>, ApiError>;
}

fn user(user_id: Uuid) -> [(&'static str, String); 1] {
    [("userId", user_id.to_string())]
}

#[async_trait]
impl AccessAuthority for Session {
    async fn access_status(&self, deal_id: Uuid, user_id: Uuid) -> Result<Option<AccessRequest>, ApiError> {
        self.get_optional(&format!("access/status/{deal_id}"), &user(user_id)).await
    }

    async fn request_access(&self, deal_id: Uuid, user_id: Uuid) -> Result<AccessRequest, ApiError> {
        self.send_json(Method::POST, &format!("deals/{deal_id}/request"), &user(user_id))
            .await
    }

    async fn approve_request(&self, request_id: Uuid, user_id: Uuid) -> Result<AccessRequest, ApiError> {
        self.send_json(Method::PUT, &format!("innovator/requests/{request_id}"), &user(user_id))
            .await
    }

    async fn reject_request(&self, request_id: Uuid, user_id: Uuid) -> Result<AccessRequest, ApiError> {
        self.send_json(
            Method::PUT,
            &format!("innovator/requests/{request_id}/reject"),
            &user(user_id),
        )
        .await
    }

    async fn sign_nda(&self, request_id: Uuid, user_id: Uuid) -> Result<AccessRequest, ApiError> {
        self.send_json(
            Method::POST,
            &format!("investor/requests/{request_id}/sign-nda"),
            &user(user_id),
        )
        .await
    }

    async fn request_intro(&self, request_id: Uuid, user_id: Uuid) -> Result<(), ApiError> {
        self.send_empty(
            Method::POST,
            &format!("investor/requests/{request_id}/interest"),
            &user(user_id),
        )
        .await
    }

    async fn innovator_requests(&self, user_id: Uuid) -> Result<Vec<AccessRequest>, ApiError> {
        self.get_json("innovator/requests", &user(user_id)).await
    }

    async fn investor_requests(&self, user_id: Uuid) -> Result<Vec<AccessRequest>, ApiError> {
        self.get_json("investor/requests", &user(user_id)).await
    }
}
