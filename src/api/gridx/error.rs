/// Failure of a single fetch attempt.
///
/// Carries the rendered error chain, so that it can be cloned into the refresh state.
#[derive(Clone, Debug, derive_more::Display, derive_more::Error)]
pub enum Error {
    #[display("authentication failed: {reason}")]
    Authentication { reason: String },

    #[display("failed to resolve the gateway: {reason}")]
    GatewayResolution { reason: String },

    #[display("misconfigured: {reason}")]
    Configuration { reason: String },

    #[display("failed to fetch the live data: {reason}")]
    Fetch { reason: String },
}

impl Error {
    pub fn authentication(error: &anyhow::Error) -> Self {
        Self::Authentication { reason: format!("{error:#}") }
    }

    pub fn gateway_resolution(error: &anyhow::Error) -> Self {
        Self::GatewayResolution { reason: format!("{error:#}") }
    }

    pub fn fetch(error: &anyhow::Error) -> Self {
        Self::Fetch { reason: format!("{error:#}") }
    }
}
