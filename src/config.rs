//! Environment-derived configuration
//!
//! Credentials and base URL are read once at startup and never mutated.
//! The client secret is redacted from `Debug` output.

use std::fmt;

use reqwest::Url;

use crate::errors::XrayError;

pub const ENV_CLIENT_ID: &str = "XRAY_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "XRAY_CLIENT_SECRET";
pub const ENV_BASE_URL: &str = "XRAY_BASE_URL";

pub const DEFAULT_BASE_URL: &str = "https://xray.cloud.getxray.app";

/// Immutable credential triple for the Xray cloud API.
#[derive(Clone)]
pub struct XrayConfig {
    pub client_id: String,
    pub client_secret: String,
    /// Normalized base URL, no trailing slash.
    pub base_url: String,
}

impl XrayConfig {
    /// Build configuration from an environment-like key/value source.
    ///
    /// Reads `XRAY_CLIENT_ID` and `XRAY_CLIENT_SECRET` (required) and
    /// `XRAY_BASE_URL` (optional, HTTPS only).
    pub fn from_env<I, K, V>(vars: I) -> Result<Self, XrayError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut client_id = None;
        let mut client_secret = None;
        let mut base_url = None;

        for (key, value) in vars {
            match key.as_ref() {
                ENV_CLIENT_ID => client_id = Some(value.into()),
                ENV_CLIENT_SECRET => client_secret = Some(value.into()),
                ENV_BASE_URL => base_url = Some(value.into()),
                _ => {}
            }
        }

        let client_id = require_nonempty(ENV_CLIENT_ID, client_id)?;
        let client_secret = require_nonempty(ENV_CLIENT_SECRET, client_secret)?;
        let base_url = validate_base_url(
            base_url
                .filter(|url| !url.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        )?;

        Ok(Self {
            client_id,
            client_secret,
            base_url,
        })
    }

    /// Build configuration from the process environment.
    pub fn from_process_env() -> Result<Self, XrayError> {
        Self::from_env(std::env::vars())
    }

    pub fn authenticate_url(&self) -> String {
        format!("{}/api/v2/authenticate", self.base_url)
    }

    pub fn graphql_url(&self) -> String {
        format!("{}/api/v2/graphql", self.base_url)
    }
}

impl fmt::Debug for XrayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("XrayConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

fn require_nonempty(key: &str, value: Option<String>) -> Result<String, XrayError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(XrayError::Config(format!(
            "{key} must be set and non-empty"
        ))),
    }
}

fn validate_base_url(raw: String) -> Result<String, XrayError> {
    let url = Url::parse(raw.trim())
        .map_err(|e| XrayError::Config(format!("{ENV_BASE_URL} is not a valid URL: {e}")))?;

    if url.scheme() != "https" {
        return Err(XrayError::Config(format!(
            "{ENV_BASE_URL} must use https, got '{}'",
            url.scheme()
        )));
    }
    if url.host_str().is_none() {
        return Err(XrayError::Config(format!(
            "{ENV_BASE_URL} is missing a host"
        )));
    }

    Ok(raw.trim().trim_end_matches('/').to_string())
}
