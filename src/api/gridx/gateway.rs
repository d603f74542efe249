use reqwest::{Client, Url};
use serde_json::Value;

use crate::{api::gridx::Error, core::path::extract, prelude::*};

/// Vendor-assigned identifier of the monitored installation.
#[derive(Clone, Debug, Eq, PartialEq, derive_more::Display)]
pub struct GatewayId(pub String);

impl GatewayId {
    /// Take the first gateway of the account: multiple gateways are not supported.
    fn from_gateways(gateways: &[Value]) -> Result<Self> {
        let gateway = gateways.first().context("the account has no gateways")?;
        match extract(gateway, "system.id") {
            Some(Value::String(id)) if !id.is_empty() => Ok(Self(id.clone())),
            Some(Value::Number(id)) => Ok(Self(id.to_string())),
            _ => bail!("the gateway has no `system.id`"),
        }
    }
}

#[instrument(skip_all, fields(url = %url))]
pub async fn resolve(client: &Client, url: Url, id_token: &str) -> Result<GatewayId, Error> {
    try_resolve(client, url, id_token).await.map_err(|error| Error::gateway_resolution(&error))
}

async fn try_resolve(client: &Client, url: Url, id_token: &str) -> Result<GatewayId> {
    info!("resolving the gateway…");
    let gateways: Vec<Value> = client
        .get(url.clone())
        .bearer_auth(id_token)
        .send()
        .await
        .with_context(|| format!("failed to call `{url}`"))?
        .error_for_status()?
        .json()
        .await
        .context("failed to deserialize the gateway list")?;
    let gateway_id = GatewayId::from_gateways(&gateways)?;
    info!(n_gateways = gateways.len(), %gateway_id, "resolved");
    Ok(gateway_id)
}

#[cfg(test)]
mod tests {
    use mockito::Server;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_from_gateways_ok() -> Result {
        // language=json
        let gateways: Vec<Value> = serde_json::from_str(
            r#"[
                { "id": "gateway", "system": { "id": "e7f8a6c2-2c3b", "name": "Home" } },
                { "system": { "id": "other" } }
            ]"#,
        )?;
        assert_eq!(GatewayId::from_gateways(&gateways)?, GatewayId("e7f8a6c2-2c3b".to_string()));
        Ok(())
    }

    #[test]
    fn test_from_gateways_numeric_id() -> Result {
        let gateways = vec![json!({ "system": { "id": 42 } })];
        assert_eq!(GatewayId::from_gateways(&gateways)?.to_string(), "42");
        Ok(())
    }

    #[test]
    fn test_from_gateways_malformed() {
        assert!(GatewayId::from_gateways(&[]).is_err());
        assert!(GatewayId::from_gateways(&[json!({ "system": {} })]).is_err());
        assert!(GatewayId::from_gateways(&[json!({ "system": { "id": "" } })]).is_err());
        assert!(GatewayId::from_gateways(&[json!({ "system": { "id": null } })]).is_err());
    }

    #[tokio::test]
    async fn test_resolve_ok() -> Result {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/gateways")
            .match_header("authorization", "Bearer token-1")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!([{ "system": { "id": "gateway-1" } }]).to_string())
            .create_async()
            .await;

        let url = Url::parse(&server.url())?.join("gateways")?;
        let gateway_id = resolve(&Client::new(), url, "token-1").await?;
        assert_eq!(gateway_id.0, "gateway-1");
        mock.assert_async().await;
        Ok(())
    }

    #[tokio::test]
    async fn test_resolve_empty() -> Result {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/gateways")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body("[]")
            .create_async()
            .await;

        let url = Url::parse(&server.url())?.join("gateways")?;
        let result = resolve(&Client::new(), url, "token-1").await;
        assert!(matches!(result, Err(Error::GatewayResolution { .. })));
        mock.assert_async().await;
        Ok(())
    }

    #[tokio::test]
    async fn test_resolve_unauthorized() -> Result {
        let mut server = Server::new_async().await;
        let mock = server.mock("GET", "/gateways").with_status(401).create_async().await;

        let url = Url::parse(&server.url())?.join("gateways")?;
        let result = resolve(&Client::new(), url, "token-1").await;
        assert!(matches!(result, Err(Error::GatewayResolution { .. })));
        mock.assert_async().await;
        Ok(())
    }
}
