use std::time::Duration;

use anyhow::{Context, bail};
use clap::Args;
use tracing::info;

use innovest_api::config::DEFAULT_API_URL;
use innovest_api::{ApiClient, ApiConfig, Session};
use innovest_gateway::{GatewayConfig, StompConnector};

/// Where the marketplace lives and how to sign in. Every flag can also come
/// from the environment or a `.env` file.
#[derive(Debug, Args)]
pub struct ConnectArgs {
    /// REST base URL
    #[arg(long, env = "INNOVEST_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// STOMP broker URL; derived from the API URL when unset
    #[arg(long, env = "INNOVEST_WS_URL")]
    pub ws_url: Option<String>,

    /// Bearer token from an earlier login
    #[arg(long, env = "INNOVEST_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    #[arg(long, env = "INNOVEST_EMAIL")]
    pub email: Option<String>,

    #[arg(long, env = "INNOVEST_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Per-request timeout for REST calls
    #[arg(long, env = "INNOVEST_TIMEOUT_SECS", default_value_t = 15)]
    pub timeout_secs: u64,
}

impl ConnectArgs {
    pub fn api_config(&self) -> anyhow::Result<ApiConfig> {
        let config = ApiConfig::new(&self.api_url)
            .with_context(|| format!("invalid API url {}", self.api_url))?;
        Ok(config.with_timeout(Duration::from_secs(self.timeout_secs)))
    }

    pub fn gateway_config(&self, api: &ApiConfig) -> anyhow::Result<GatewayConfig> {
        let config = match &self.ws_url {
            Some(url) => GatewayConfig::new(url).with_context(|| format!("invalid broker url {url}"))?,
            None => GatewayConfig::from_api_url(&api.base_url).context("cannot derive broker url")?,
        };
        Ok(config)
    }

    /// Resumes the stored token if there is one, otherwise logs in.
    pub async fn session(&self, client: &ApiClient) -> anyhow::Result<Session> {
        if let Some(token) = &self.token {
            return client
                .resume(token.clone())
                .await
                .context("stored token was not accepted");
        }
        let (Some(email), Some(password)) = (&self.email, &self.password) else {
            bail!("set INNOVEST_TOKEN, or INNOVEST_EMAIL and INNOVEST_PASSWORD");
        };
        let session = client.login(email, password).await.context("login failed")?;
        info!(user_id = %session.user_id(), "Use INNOVEST_TOKEN to skip the login next time");
        Ok(session)
    }
}

/// Everything a command needs once signed in.
pub struct Connection {
    pub session: Session,
    pub connector: StompConnector,
}

impl Connection {
    pub async fn connect(args: &ConnectArgs) -> anyhow::Result<Self> {
        let api = args.api_config()?;
        let gateway = args.gateway_config(&api)?;
        let client = ApiClient::new(&api)?;
        let session = args.session(&client).await?;
        info!(api = %api.base_url, broker = %gateway.url, "Connected to marketplace");

        let connector = StompConnector::new(gateway, Some(session.token().to_string()));
        Ok(Self { session, connector })
    }
}
