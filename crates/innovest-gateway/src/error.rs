use innovest_api::{ApiError, ErrorKind};

use crate::stomp::FrameError;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Publishing or subscribing without a live broker connection. Nothing
    /// is queued for later delivery.
    #[error("not connected")]
    NotConnected,

    #[error("broker connection timed out")]
    Timeout,

    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("broker reported error: {0}")]
    Broker(String),

    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error("message is empty")]
    EmptyMessage,

    #[error("history unavailable: {0}")]
    History(#[from] ApiError),

    #[error("invalid payload: {0}")]
    Payload(#[from] serde_json::Error),
}

impl GatewayError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::History(e) => e.kind(),
            Self::EmptyMessage => ErrorKind::InvalidState,
            Self::NotConnected
            | Self::Timeout
            | Self::WebSocket(_)
            | Self::Broker(_)
            | Self::Frame(_)
            | Self::Payload(_) => ErrorKind::Transport,
        }
    }
}
