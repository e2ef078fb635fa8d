//! Real HTTP transport backed by reqwest
//!
//! One pooled client per process. Sessions are never created per-request.

use std::time::Duration;

use crate::client::transport::HttpResponse;
use crate::errors::XrayError;

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Pooled HTTP transport with a per-request timeout.
#[derive(Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Create a transport with the default 30 second timeout.
    pub fn new() -> Result<Self, XrayError> {
        Self::with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Create a transport with a custom per-request timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self, XrayError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| XrayError::Network(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    pub async fn post_json(
        &self,
        url: &str,
        headers: &[(&str, String)],
        body: &str,
    ) -> Result<HttpResponse, XrayError> {
        let mut request = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .body(body.to_string());

        for (name, value) in headers {
            request = request.header(*name, value.as_str());
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                XrayError::Network(format!("Request to {url} timed out"))
            } else {
                XrayError::Network(format!("Request to {url} failed: {e}"))
            }
        })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| XrayError::Network(format!("Failed to read response body: {e}")))?;

        Ok(HttpResponse { status, body })
    }
}
