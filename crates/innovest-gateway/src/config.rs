use std::time::Duration;

use url::Url;

pub const DEFAULT_BROKER_URL: &str = "ws://localhost:8080/ws";

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub url: Url,
    /// Bound on the WebSocket upgrade plus the STOMP CONNECT handshake.
    pub connect_timeout: Duration,
    /// Interval we offer and send heart-beats at.
    pub heartbeat: Duration,
}

impl GatewayConfig {
    pub fn new(url: &str) -> Result<Self, url::ParseError> {
        Ok(Self {
            url: Url::parse(url)?,
            ..Self::default()
        })
    }

    /// Derives the broker endpoint from the REST base URL the way the web
    /// client did: drop a trailing `/api`, swap the scheme, append `/ws`.
    pub fn from_api_url(api: &Url) -> Result<Self, url::ParseError> {
        let base = api.as_str().trim_end_matches('/');
        let base = base.strip_suffix("/api").unwrap_or(base);
        let ws = match base.strip_prefix("https") {
            Some(rest) => format!("wss{rest}/ws"),
            None => format!("ws{}/ws", base.strip_prefix("http").unwrap_or(base)),
        };
        Self::new(&ws)
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            url: Url::parse(DEFAULT_BROKER_URL).expect("default broker url is valid"),
            connect_timeout: Duration::from_secs(10),
            heartbeat: Duration::from_secs(10),
        }
    }
}
