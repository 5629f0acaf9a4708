use uuid::Uuid;

use innovest_api::{ApiError, ErrorKind};
use innovest_gateway::GatewayError;
use innovest_types::TransitionError;

#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// Rejected locally; nothing was sent to the server.
    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("deal {0} not found")]
    DealNotFound(Uuid),

    #[error("document {0} is not in this data room")]
    DocumentNotFound(Uuid),

    #[error("sign in to {0}")]
    SignedOut(&'static str),

    #[error("chat is not available for this deal")]
    ChatUnavailable,
}

impl RoomError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transition(_) | Self::ChatUnavailable => ErrorKind::InvalidState,
            Self::Api(e) => e.kind(),
            Self::Gateway(e) => e.kind(),
            Self::DealNotFound(_) | Self::DocumentNotFound(_) => ErrorKind::NotFound,
            Self::SignedOut(_) => ErrorKind::Auth,
        }
    }
}

/// Error state a room shows in place of propagating a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Banner {
    pub kind: ErrorKind,
    pub message: String,
}

impl Banner {
    /// Auth failures block the room until the user signs in again.
    pub fn is_blocking(&self) -> bool {
        self.kind == ErrorKind::Auth
    }
}

impl From<&RoomError> for Banner {
    fn from(e: &RoomError) -> Self {
        Self {
            kind: e.kind(),
            message: e.to_string(),
        }
    }
}
