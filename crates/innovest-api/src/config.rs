use std::time::Duration;

use url::Url;

pub const DEFAULT_API_URL: &str = "http://localhost:8080/api/";

/// Network calls fail after this long instead of hanging.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: Url,
    pub request_timeout: Duration,
}

impl ApiConfig {
    pub fn new(base_url: &str) -> Result<Self, url::ParseError> {
        Ok(Self {
            base_url: normalize_base(base_url)?,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_API_URL).expect("default API url is valid"),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

/// `Url::join` drops the last path segment unless the base ends with `/`.
fn normalize_base(raw: &str) -> Result<Url, url::ParseError> {
    if raw.ends_with('/') {
        Url::parse(raw)
    } else {
        Url::parse(&format!("{raw}/"))
    }
}
