use std::time::Duration;

use chrono::TimeDelta;
use clap::Parser;
use reqwest::Url;

use crate::{
    api::{
        client,
        gridx::{Api, Credentials},
    },
    prelude::*,
};

#[derive(Parser)]
pub struct GridxArgs {
    #[clap(long, env = "GRIDX_USERNAME")]
    username: String,

    #[clap(long, env = "GRIDX_PASSWORD", hide_env_values = true)]
    password: String,

    #[clap(long, env = "GRIDX_CLIENT_ID", default_value = "mG0Phmo7DmnvAqO7p6B0WOYBODppY3cc")]
    client_id: String,

    #[clap(long, env = "GRIDX_REALM", default_value = "eon-home-authentication-db")]
    realm: String,

    #[clap(long, env = "GRIDX_AUDIENCE", default_value = "my.gridx")]
    audience: String,

    #[clap(long, env = "GRIDX_AUTH_URL", default_value = "https://gridx.eu.auth0.com/oauth/token")]
    auth_url: Url,

    #[clap(long, env = "GRIDX_API_BASE_URL", default_value = "https://api.gridx.de/")]
    api_base_url: Url,

    /// Timeout of every request to the cloud.
    #[clap(long, env = "GRIDX_REQUEST_TIMEOUT", default_value = "30s")]
    request_timeout: humantime::Duration,

    /// Re-authenticate this long before the token actually expires.
    ///
    /// Cut down to half the token lifetime when it does not fit.
    #[clap(long, env = "GRIDX_TOKEN_REFRESH_MARGIN", default_value = "30min")]
    token_refresh_margin: humantime::Duration,
}

impl GridxArgs {
    pub fn new_api(self) -> Result<Api> {
        let credentials = Credentials::builder()
            .username(self.username)
            .password(self.password)
            .client_id(self.client_id)
            .realm(self.realm)
            .audience(self.audience)
            .build();
        let request_timeout: Duration = self.request_timeout.into();
        let token_refresh_margin = TimeDelta::from_std(self.token_refresh_margin.into())
            .context("the token refresh margin is too long")?;
        Ok(Api::new(
            client::try_new(request_timeout)?,
            self.auth_url,
            self.api_base_url,
            credentials,
            token_refresh_margin,
        ))
    }
}
