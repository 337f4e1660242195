//! Public IP lookup used when no static server address is configured.

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

/// Default lookup endpoint
pub const IPIFY_URL: &str = "https://api.ipify.org?format=json";

const LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum PublicIpError {
    #[error("public IP lookup failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("public IP lookup returned an empty address")]
    Empty,
}

#[derive(Debug, Deserialize)]
struct IpifyResponse {
    ip: String,
}

/// Resolves the host's public address through an ipify-compatible endpoint
pub struct PublicIpResolver {
    client: reqwest::Client,
    endpoint: String,
}

impl PublicIpResolver {
    pub fn new() -> Result<Self, PublicIpError> {
        Self::with_endpoint(IPIFY_URL)
    }

    pub fn with_endpoint(endpoint: impl Into<String>) -> Result<Self, PublicIpError> {
        let client = reqwest::Client::builder().timeout(LOOKUP_TIMEOUT).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    pub async fn resolve(&self) -> Result<String, PublicIpError> {
        let response: IpifyResponse = self
            .client
            .get(&self.endpoint)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let ip = response.ip.trim();
        if ip.is_empty() {
            return Err(PublicIpError::Empty);
        }
        Ok(ip.to_string())
    }
}
