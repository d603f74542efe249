use std::sync::atomic::{AtomicU64, Ordering};

use bon::Builder;
use chrono::{DateTime, TimeDelta, Utc};
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};

use crate::{api::gridx::Error, prelude::*};

const GRANT_TYPE: &str = "http://auth0.com/oauth/grant-type/password-realm";
const SCOPE: &str = "email openid offline_access";

#[derive(Clone, Builder)]
pub struct Credentials {
    #[builder(into)]
    pub username: String,

    #[builder(into)]
    pub password: String,

    #[builder(into)]
    pub client_id: String,

    #[builder(into)]
    pub realm: String,

    #[builder(into)]
    pub audience: String,
}

#[must_use]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TokenState {
    pub id_token: Option<String>,

    /// Refresh the token once the time is past this instant.
    pub expires_at: Option<DateTime<Utc>>,
}

impl TokenState {
    /// Token issued at `issued_at`, to be refreshed `margin` before its actual expiry.
    ///
    /// A margin that does not fit into the lifetime would force re-authentication on every fetch,
    /// so it is cut down to half the lifetime.
    pub fn issued(
        id_token: String,
        issued_at: DateTime<Utc>,
        lifetime: TimeDelta,
        margin: TimeDelta,
    ) -> Result<Self> {
        let lifetime = lifetime.max(TimeDelta::zero());
        let margin = if margin >= lifetime {
            warn!(%lifetime, %margin, "the refresh margin exceeds the token lifetime, using half the lifetime");
            lifetime / 2
        } else {
            margin
        };
        let expires_at = issued_at
            .checked_add_signed(lifetime - margin)
            .with_context(|| format!("the token lifetime `{lifetime}` is out of range"))?;
        Ok(Self { id_token: Some(id_token), expires_at: Some(expires_at) })
    }

    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_none_or(|expires_at| now > expires_at)
    }
}

/// Exchanges the credentials for an ID token and keeps the latest one.
pub struct AuthClient {
    client: Client,
    url: Url,
    credentials: Credentials,
    margin: TimeDelta,
    token: RwLock<TokenState>,

    /// Serializes the authentication requests.
    lock: Mutex<()>,

    /// Bumped on every successful authentication.
    generation: AtomicU64,
}

impl AuthClient {
    pub fn new(client: Client, url: Url, credentials: Credentials, margin: TimeDelta) -> Self {
        Self {
            client,
            url,
            credentials,
            margin,
            token: RwLock::default(),
            lock: Mutex::new(()),
            generation: AtomicU64::new(0),
        }
    }

    pub async fn token(&self) -> TokenState {
        self.token.read().await.clone()
    }

    /// Request a new token.
    ///
    /// Callers that queue up behind an authentication already in progress receive its token instead
    /// of requesting yet another one.
    #[instrument(skip_all, fields(username = %self.credentials.username))]
    pub async fn authenticate(&self) -> Result<TokenState, Error> {
        let generation = self.generation.load(Ordering::Acquire);
        let _guard = self.lock.lock().await;
        if self.generation.load(Ordering::Acquire) != generation {
            debug!("authenticated concurrently");
            return Ok(self.token().await);
        }

        let token = self.request_token().await.map_err(|error| Error::authentication(&error))?;
        info!(expires_at = ?token.expires_at, "authenticated");
        self.token.write().await.clone_from(&token);
        self.generation.fetch_add(1, Ordering::AcqRel);
        Ok(token)
    }

    async fn request_token(&self) -> Result<TokenState> {
        #[derive(Serialize)]
        struct TokenRequest<'a> {
            grant_type: &'a str,
            username: &'a str,
            password: &'a str,
            audience: &'a str,
            client_id: &'a str,
            scope: &'a str,
            realm: &'a str,
        }

        #[derive(Deserialize)]
        struct TokenResponse {
            id_token: Option<String>,

            /// Seconds.
            expires_in: Option<i64>,
        }

        info!("authenticating…");
        let request = TokenRequest {
            grant_type: GRANT_TYPE,
            username: &self.credentials.username,
            password: &self.credentials.password,
            audience: &self.credentials.audience,
            client_id: &self.credentials.client_id,
            scope: SCOPE,
            realm: &self.credentials.realm,
        };
        let issued_at = Utc::now();
        let response: TokenResponse = self
            .client
            .post(self.url.clone())
            .json(&request)
            .send()
            .await
            .with_context(|| format!("failed to call `{}`", self.url))?
            .error_for_status()?
            .json()
            .await
            .context("failed to deserialize the token response")?;
        let id_token = response
            .id_token
            .filter(|id_token| !id_token.is_empty())
            .context("the response contains no `id_token`")?;
        let expires_in = response.expires_in.context("the response contains no `expires_in`")?;
        let lifetime = TimeDelta::try_seconds(expires_in)
            .with_context(|| format!("`expires_in` is out of range: {expires_in}"))?;
        TokenState::issued(id_token, issued_at, lifetime, self.margin)
    }
}
