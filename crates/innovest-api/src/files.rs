use async_trait::async_trait;
use bytes::Bytes;
use tracing::info;
use uuid::Uuid;

use crate::auth::Session;
use crate::error::ApiError;

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// GET /documents/{docId}/download. The server watermarks the file with
    /// the caller's identity before returning it.
    async fn download_document(&self, doc_id: Uuid, user_id: Uuid) -> Result<Bytes, ApiError>;
}

#[async_trait]
impl DocumentStore for Session {
    async fn download_document(&self, doc_id: Uuid, user_id: Uuid) -> Result<Bytes, ApiError> {
        let bytes = self
            .get_bytes(
                &format!("documents/{doc_id}/download"),
                &[("userId", user_id.to_string())],
            )
            .await?;
        info!(%doc_id, size = bytes.len(), "Downloaded watermarked document");
        Ok(bytes)
    }
}
