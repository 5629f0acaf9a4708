use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Identity, Role};

// -- Auth --

#[derive(Debug, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    pub user_id: Uuid,
    pub email: String,
    pub role: Role,
    #[serde(default, alias = "isVerified")]
    pub verified: bool,
}

fn default_token_type() -> String {
    "Bearer".into()
}

impl AuthResponse {
    pub fn identity(&self) -> Identity {
        Identity {
            id: self.user_id,
            email: self.email.clone(),
            role: self.role,
            verified: self.verified,
        }
    }
}

// -- Chat --

/// Body published to `/app/chat/{dealId}/sendMessage`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub deal_id: Uuid,
    pub sender_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient_id: Option<Uuid>,
    pub content: String,
}
