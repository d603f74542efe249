use std::time::Duration;

use reqwest::Url;

use crate::{api::client, prelude::*};

/// Liveness pings to an external monitor, a no-op without the URL.
pub struct Client {
    url: Option<Url>,
    client: reqwest::Client,
}

impl Client {
    pub fn try_new(url: Option<Url>) -> Result<Self> {
        Ok(Self { url, client: client::try_new(Duration::from_secs(3))? })
    }

    /// Failures are only logged.
    pub async fn send(&self) {
        if let Some(url) = &self.url
            && let Err(error) = self.send_fallible(url).await
        {
            warn!("failed to send the heartbeat: {error:#}");
        }
    }

    #[instrument(skip_all, fields(host = url.host_str()))]
    async fn send_fallible(&self, url: &Url) -> Result {
        debug!("sending a heartbeat…");
        self.client.post(url.clone()).send().await?.error_for_status()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use mockito::Server;

    use super::*;

    #[tokio::test]
    async fn test_send_ok() -> Result {
        let mut server = Server::new_async().await;
        let mock = server.mock("POST", "/ping").with_status(200).expect(2).create_async().await;
        let heartbeat = Client::try_new(Some(Url::parse(&server.url())?.join("ping")?))?;
        heartbeat.send().await;
        heartbeat.send().await;
        mock.assert_async().await;
        Ok(())
    }

    #[tokio::test]
    async fn test_send_failure_is_swallowed() -> Result {
        let mut server = Server::new_async().await;
        let mock = server.mock("POST", "/ping").with_status(500).create_async().await;
        Client::try_new(Some(Url::parse(&server.url())?.join("ping")?))?.send().await;
        mock.assert_async().await;
        Ok(())
    }

    #[tokio::test]
    async fn test_send_without_url() -> Result {
        Client::try_new(None)?.send().await;
        Ok(())
    }
}
