//! HTTP client for the licensing server.
//!
//! All requests carry `User-Agent: StreamSauce-App` and a JSON content type,
//! which the server's CORS and logging setup expects.

use reqwest::Client;

use super::license::{HttpReply, LicenseError, LicenseTransport};

const USER_AGENT: &str = "StreamSauce-App";

/// HTTP client wrapper for licensing server communication.
///
/// Only a connect timeout is applied; a slow response keeps the caller waiting.
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// Create a new API client with the given base URL.
    pub fn new(base_url: &str) -> Self {
        let client = Client::builder()
            .connect_timeout(std::time::Duration::from_secs(10))
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl LicenseTransport for ApiClient {
    async fn get(&self, path: &str) -> Result<HttpReply, LicenseError> {
        let url = format!("{}{}", self.base_url, path);
        log::debug!("GET {}", url);

        let resp = self
            .client
            .get(&url)
            .header("Content-Type", "application/json")
            .send()
            .await
            .map_err(|e| LicenseError::Network(e.to_string()))?;

        let status = resp.status().as_u16();
        let body = resp
            .text()
            .await
            .map_err(|e| LicenseError::Network(e.to_string()))?;

        Ok(HttpReply { status, body })
    }
}
