//! Bearer token lifecycle for the Xray API
//!
//! The token mutex doubles as the single-flight barrier: the first caller
//! holding the lock performs the refresh RPC; callers arriving during the
//! refresh park on the lock and observe the freshly stored token when they
//! acquire it, without issuing a second RPC.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::auth::claims;
use crate::client::transport::Transport;
use crate::config::XrayConfig;
use crate::errors::XrayError;

/// Tokens are treated as expired this long before their actual `exp`,
/// covering clock skew and long-running calls.
const EXPIRY_BUFFER_MINUTES: i64 = 5;

/// Assumed validity when the token carries no decodable `exp` claim.
const FALLBACK_VALIDITY_HOURS: i64 = 1;

#[derive(Debug, Clone)]
struct Token {
    value: String,
    expires_at: DateTime<Utc>,
}

impl Token {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now + Duration::minutes(EXPIRY_BUFFER_MINUTES)
    }
}

/// Manages authentication against `POST {base}/api/v2/authenticate`.
pub struct AuthManager {
    config: XrayConfig,
    transport: Arc<Transport>,
    token: Mutex<Option<Token>>,
}

impl AuthManager {
    pub fn new(config: XrayConfig, transport: Arc<Transport>) -> Self {
        Self {
            config,
            transport,
            token: Mutex::new(None),
        }
    }

    /// Return a valid bearer token, refreshing if the cached one is absent
    /// or within five minutes of expiry.
    ///
    /// Under concurrent callers exactly one refresh RPC is issued; every
    /// caller observes the same resulting token.
    pub async fn get_valid_token(&self) -> Result<String, XrayError> {
        let mut guard = self.token.lock().await;

        if let Some(token) = guard.as_ref() {
            if token.is_fresh(Utc::now()) {
                return Ok(token.value.clone());
            }
            debug!("cached token within expiry buffer, refreshing");
        }

        let token = self.authenticate().await?;
        let value = token.value.clone();
        *guard = Some(token);
        Ok(value)
    }

    /// Drop the cached token so the next call refreshes.
    ///
    /// Used by the GraphQL client after an upstream 401.
    pub async fn invalidate(&self) {
        let mut guard = self.token.lock().await;
        if guard.take().is_some() {
            debug!("cached token invalidated");
        }
    }

    /// Issue the refresh RPC. No internal retries; no partial state.
    async fn authenticate(&self) -> Result<Token, XrayError> {
        let url = self.config.authenticate_url();
        let body = serde_json::json!({
            "client_id": self.config.client_id,
            "client_secret": self.config.client_secret,
        })
        .to_string();

        let response = self
            .transport
            .post_json(&url, &[], &body)
            .await
            .map_err(|e| XrayError::Authentication(format!("Refresh request failed: {e}")))?;

        match response.status {
            200 => {
                let value = parse_token_body(&response.body)?;
                let expires_at = claims::decode_expiry(&value).unwrap_or_else(|| {
                    warn!("token has no decodable exp claim, assuming 1 hour validity");
                    Utc::now() + Duration::hours(FALLBACK_VALIDITY_HOURS)
                });
                debug!(expires_at = %expires_at, "authenticated with Xray");
                Ok(Token { value, expires_at })
            }
            400 => Err(XrayError::Authentication(
                "Bad request: wrong authenticate request syntax".to_string(),
            )),
            401 => Err(XrayError::Authentication(
                "Unauthorized: invalid Xray license or credentials".to_string(),
            )),
            500 => Err(XrayError::Authentication(
                "Internal server error during authentication".to_string(),
            )),
            status => Err(XrayError::Authentication(format!(
                "Authentication failed with status {status}: {}",
                truncate(&response.body, 256)
            ))),
        }
    }
}

/// Accept both response forms the upstream is known to produce: a bare
/// JSON string containing the token, or an object with a `token` field.
fn parse_token_body(body: &str) -> Result<String, XrayError> {
    let parsed: Value = serde_json::from_str(body).map_err(|_| {
        XrayError::Authentication("Authenticate response was not valid JSON".to_string())
    })?;

    match parsed {
        Value::String(token) if !token.is_empty() => Ok(token),
        Value::Object(ref obj) => match obj.get("token").and_then(Value::as_str) {
            Some(token) if !token.is_empty() => Ok(token.to_string()),
            _ => Err(XrayError::Authentication(
                "Authenticate response object is missing a token field".to_string(),
            )),
        },
        _ => Err(XrayError::Authentication(
            "Authenticate response did not contain a token".to_string(),
        )),
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
