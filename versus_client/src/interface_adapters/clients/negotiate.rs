use serde::Deserialize;
use std::time::Duration;
use url::Url;

use crate::domain::ConnectionError;

// Negotiation response: a short-lived, pre-authenticated relay URL.
#[derive(Debug, Clone, Deserialize)]
struct NegotiateResponse {
    #[serde(default)]
    url: Option<String>,
}

// Thin reqwest client for the relay credential fetch.
#[derive(Clone)]
pub struct NegotiateClient {
    http: reqwest::Client,
    endpoint: Url,
}

impl NegotiateClient {
    pub fn new(endpoint: Url, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Fetches the websocket URL; the credential is treated as opaque.
    pub async fn fetch_url(&self) -> Result<Url, ConnectionError> {
        let response = self
            .http
            .get(self.endpoint.clone())
            .send()
            .await
            .map_err(|e| ConnectionError::Negotiate(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ConnectionError::NegotiateStatus(status.as_u16()));
        }

        let body = response
            .json::<NegotiateResponse>()
            .await
            .map_err(|e| ConnectionError::Negotiate(e.to_string()))?;

        let raw = body
            .url
            .filter(|url| !url.trim().is_empty())
            .ok_or(ConnectionError::MissingUrl)?;

        Url::parse(&raw).map_err(|_| ConnectionError::InvalidUrl(raw))
    }
}
