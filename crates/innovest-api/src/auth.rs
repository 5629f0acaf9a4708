use bytes::Bytes;
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

use innovest_types::api::{AuthResponse, LoginRequest};
use innovest_types::models::{Identity, Role};

use crate::config::ApiConfig;
use crate::error::ApiError;

/// Unauthenticated HTTP client bound to one API base URL.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
}

impl ApiClient {
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            http,
            base_url: config.base_url.clone(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    /// POST /auth/login and build a session from the issued token.
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, ApiError> {
        let req = self.http.post(self.url("auth/login")?).json(&LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        });
        let auth: AuthResponse = decode_json(execute(req).await?).await?;

        info!(user_id = %auth.user_id, role = ?auth.role, "Logged in");
        Ok(Session {
            client: self.clone(),
            identity: auth.identity(),
            token: auth.access_token,
        })
    }

    /// Re-establish a session from a stored token via GET /auth/verify.
    pub async fn resume(&self, token: String) -> Result<Session, ApiError> {
        let req = self.http.get(self.url("auth/verify")?).bearer_auth(&token);
        let identity: Identity = decode_json(execute(req).await?).await?;

        info!(user_id = %identity.id, role = ?identity.role, "Session verified");
        Ok(Session {
            client: self.clone(),
            identity,
            token,
        })
    }
}

/// The authenticated context. Identity is fixed for the session's lifetime;
/// only login, resume and logout create or destroy it.
#[derive(Debug, Clone)]
pub struct Session {
    client: ApiClient,
    identity: Identity,
    token: String,
}

impl Session {
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn user_id(&self) -> Uuid {
        self.identity.id
    }

    pub fn role(&self) -> Role {
        self.identity.role
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// Ends the session. The token is dropped; the plain client is handed
    /// back for a later login.
    pub fn logout(self) -> ApiClient {
        info!(user_id = %self.identity.id, "Logged out");
        self.client
    }

    fn request(&self, method: Method, path: &str, query: &[(&str, String)]) -> Result<RequestBuilder, ApiError> {
        debug!(%method, path, "API request");
        Ok(self
            .client
            .http
            .request(method, self.client.url(path)?)
            .bearer_auth(&self.token)
            .query(query))
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let resp = execute(self.request(Method::GET, path, query)?).await?;
        decode_json(resp).await
    }

    /// GET where an empty or `null` body means "absent".
    pub(crate) async fn get_optional<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Option<T>, ApiError> {
        let resp = execute(self.request(Method::GET, path, query)?).await?;
        let body = resp.bytes().await?;
        let trimmed = body.trim_ascii();
        if trimmed.is_empty() || trimmed == b"null" {
            return Ok(None);
        }
        Ok(Some(serde_json::from_slice(trimmed)?))
    }

    pub(crate) async fn send_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let resp = execute(self.request(method, path, query)?).await?;
        decode_json(resp).await
    }

    pub(crate) async fn send_empty(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<(), ApiError> {
        execute(self.request(method, path, query)?).await?;
        Ok(())
    }

    pub(crate) async fn get_bytes(&self, path: &str, query: &[(&str, String)]) -> Result<Bytes, ApiError> {
        let resp = execute(self.request(Method::GET, path, query)?).await?;
        Ok(resp.bytes().await?)
    }
}

async fn execute(req: RequestBuilder) -> Result<Response, ApiError> {
    let resp = req.send().await?;
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let url = resp.url().path().to_string();
    let body = resp.text().await.unwrap_or_default();
    warn!(status = status.as_u16(), path = %url, "API request failed");
    Err(ApiError::from_status(status, body))
}

async fn decode_json<T: DeserializeOwned>(resp: Response) -> Result<T, ApiError> {
    let body = resp.bytes().await?;
    Ok(serde_json::from_slice(&body)?)
}
