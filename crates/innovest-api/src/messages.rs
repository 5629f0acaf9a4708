use async_trait::async_trait;
use uuid::Uuid;

use innovest_types::models::Message;

use crate::auth::Session;
use crate::error::ApiError;

#[async_trait]
pub trait ChatHistory: Send + Sync {
    /// GET /chat/messages. With a counterpart the server returns only the
    /// direct conversation; without one it returns the whole deal thread.
    async fn load_history(
        &self,
        deal_id: Uuid,
        viewer_id: Uuid,
        counterpart_id: Option<Uuid>,
    ) -> Result<Vec<Message>, ApiError>;
}

#[async_trait]
impl ChatHistory for Session {
    async fn load_history(
        &self,
        deal_id: Uuid,
        viewer_id: Uuid,
        counterpart_id: Option<Uuid>,
    ) -> Result<Vec<Message>, ApiError> {
        let mut query = vec![
            ("dealId", deal_id.to_string()),
            ("userId", viewer_id.to_string()),
        ];
        if let Some(counterpart) = counterpart_id {
            query.push(("recipientId", counterpart.to_string()));
        }
        self.get_json("chat/messages", &query).await
    }
}
