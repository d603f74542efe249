use std::time::Duration;

use reqwest::Client;

use crate::prelude::*;

/// Build a client that gives up on any request after the timeout.
pub fn try_new(timeout: Duration) -> Result<Client> {
    Ok(Client::builder()
        .user_agent(concat!("gridx-monitor/", env!("CARGO_PKG_VERSION")))
        .timeout(timeout)
        .build()?)
}
