mod auth;
mod error;
mod gateway;

use async_trait::async_trait;
use chrono::{TimeDelta, Utc};
use reqwest::{Client, StatusCode, Url};
use serde_json::Value;
use tokio::sync::OnceCell;

pub use self::{
    auth::{Credentials, TokenState},
    error::Error,
    gateway::GatewayId,
};
use crate::{api::gridx::auth::AuthClient, prelude::*, refresh::LiveSource};

/// GridX cloud session: token, gateway, and the live data.
pub struct Api {
    client: Client,
    base_url: Url,
    auth: AuthClient,
    gateway_id: OnceCell<GatewayId>,
}

impl Api {
    pub fn new(
        client: Client,
        auth_url: Url,
        base_url: Url,
        credentials: Credentials,
        token_refresh_margin: TimeDelta,
    ) -> Self {
        let auth = AuthClient::new(client.clone(), auth_url, credentials, token_refresh_margin);
        Self { client, base_url, auth, gateway_id: OnceCell::new() }
    }

    /// Authenticate and resolve the gateway, the way the setup does before the first fetch.
    #[instrument(skip_all)]
    pub async fn connect(&self) -> Result<(TokenState, GatewayId), Error> {
        let token = self.auth.authenticate().await?;
        let gateway_id = self.resolve_gateway(&token).await?;
        Ok((token, gateway_id))
    }

    pub async fn authenticate(&self) -> Result<TokenState, Error> {
        self.auth.authenticate().await
    }

    /// Resolved once, then cached for the lifetime of the session.
    async fn resolve_gateway(&self, token: &TokenState) -> Result<GatewayId, Error> {
        let id_token = token.id_token.as_deref().ok_or_else(|| Error::Configuration {
            reason: "no ID token to resolve the gateway with".to_string(),
        })?;
        self.gateway_id
            .get_or_try_init(|| gateway::resolve(&self.client, self.gateways_url(), id_token))
            .await
            .cloned()
    }

    /// Fetch the live payload, authenticating and resolving the gateway when needed.
    #[instrument(skip_all)]
    pub async fn fetch(&self) -> Result<Value, Error> {
        let now = Utc::now();

        let mut token = self.auth.token().await;
        if token.id_token.is_none() {
            token = self.auth.authenticate().await?;
        }
        let gateway_id = match self.gateway_id.get() {
            Some(gateway_id) => gateway_id.clone(),
            None => self.resolve_gateway(&token).await?,
        };
        if token.id_token.is_none() {
            return Err(Error::Configuration { reason: "still no ID token after authenticating".to_string() });
        }
        if token.is_expired_at(now) {
            info!(expires_at = ?token.expires_at, "the token has expired");
            token = self.auth.authenticate().await?;
        }

        let url = self.live_url(&gateway_id);
        match self.get_live(url.clone(), &token).await {
            Err(LiveError::Unauthorized) => {
                warn!("the token is rejected, re-authenticating…");
                token = self.auth.authenticate().await?;
                self.get_live(url, &token).await.map_err(Error::from)
            }
            result => result.map_err(Error::from),
        }
    }

    #[instrument(skip_all, fields(url = %url))]
    async fn get_live(&self, url: Url, token: &TokenState) -> Result<Value, LiveError> {
        debug!("fetching…");
        let response = self
            .client
            .get(url.clone())
            .bearer_auth(token.id_token.as_deref().unwrap_or_default())
            .send()
            .await
            .with_context(|| format!("failed to call `{url}`"))?;
        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(LiveError::Unauthorized);
        }
        let payload = response
            .error_for_status()
            .context("the live data request failed")?
            .json::<Value>()
            .await
            .context("failed to deserialize the live data")?;
        debug!("fetched");
        Ok(payload)
    }

    fn gateways_url(&self) -> Url {
        self.endpoint(&["gateways"])
    }

    fn live_url(&self, gateway_id: &GatewayId) -> Url {
        self.endpoint(&["systems", gateway_id.0.as_str(), "live"])
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }
}

#[async_trait]
impl LiveSource for Api {
    async fn fetch(&self) -> Result<Value, Error> {
        Self::fetch(self).await
    }
}

enum LiveError {
    Unauthorized,
    Other(anyhow::Error),
}

impl From<anyhow::Error> for LiveError {
    fn from(error: anyhow::Error) -> Self {
        Self::Other(error)
    }
}

impl From<LiveError> for Error {
    fn from(error: LiveError) -> Self {
        match error {
            LiveError::Unauthorized => Self::Fetch { reason: "401 Unauthorized".to_string() },
            LiveError::Other(error) => Self::fetch(&error),
        }
    }
}
