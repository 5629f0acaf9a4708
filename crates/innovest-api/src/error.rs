use reqwest::StatusCode;

/// How a failure should be surfaced to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid or expired session, or caller not entitled. Needs re-login.
    Auth,
    /// Action attempted from the wrong state. Recoverable, state unchanged.
    InvalidState,
    /// Connection, timeout or "not connected". Shown inline, never queued.
    Transport,
    /// Deal or document missing. Rendered as a not-found view.
    NotFound,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("session is not authenticated")]
    Unauthorized,

    #[error("not permitted: {0}")]
    Forbidden(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("rejected by server ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("request timed out")]
    Timeout,

    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("invalid response body: {0}")]
    Decode(String),

    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Unauthorized | Self::Forbidden(_) => ErrorKind::Auth,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Rejected { .. } | Self::Decode(_) | Self::Url(_) => ErrorKind::InvalidState,
            Self::Timeout | Self::Transport(_) => ErrorKind::Transport,
        }
    }

    /// Maps a non-success response. The server reports invalid transitions
    /// as 4xx or as a 500 carrying the reason in the body.
    pub fn from_status(status: StatusCode, body: String) -> Self {
        let message = if body.trim().is_empty() {
            status.canonical_reason().unwrap_or("error").to_string()
        } else {
            body
        };
        match status {
            StatusCode::UNAUTHORIZED => Self::Unauthorized,
            StatusCode::FORBIDDEN => Self::Forbidden(message),
            StatusCode::NOT_FOUND => Self::NotFound(message),
            _ => Self::Rejected {
                status: status.as_u16(),
                message,
            },
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_decode() {
            Self::Decode(e.to_string())
        } else {
            Self::Transport(e)
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        Self::Decode(e.to_string())
    }
}
