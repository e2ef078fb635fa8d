//! Error taxonomy for the Xray bridge
//!
//! One variant per failure class. Errors raised deep in the stack propagate
//! unchanged until the tool facade, which converts them into the two-field
//! `{error, type}` envelope exactly once.

use serde_json::{json, Value};

/// Bridge errors
#[derive(Debug, thiserror::Error)]
pub enum XrayError {
    /// Missing or invalid credentials / base URL at startup
    #[error("Configuration error: {0}")]
    Config(String),

    /// Token refresh failed, credentials rejected, or two 401s in a row
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Transport-level failure (DNS, TCP, TLS, timeout, cancellation)
    #[error("Network error: {0}")]
    Network(String),

    /// Upstream returned non-2xx, or 2xx with an errors array
    #[error("GraphQL error: {message}")]
    GraphQL {
        message: String,
        /// Raw upstream errors array, when one was present
        errors: Option<Value>,
    },

    /// Malformed arguments, JQL failing the whitelist, or unparseable
    /// JSON-string argument
    #[error("Validation error: {0}")]
    Validation(String),

    /// Key resolution exhausted all resource kinds without a match
    #[error("Resolution error: {0}")]
    Resolution(String),

    /// Upstream reported that the entity does not exist
    #[error("Not found: {0}")]
    NotFound(String),
}

impl XrayError {
    /// Construct a GraphQL error without upstream context.
    pub fn graphql(message: impl Into<String>) -> Self {
        XrayError::GraphQL {
            message: message.into(),
            errors: None,
        }
    }

    /// The closed `type` identifier used in the error envelope.
    pub fn kind(&self) -> &'static str {
        match self {
            XrayError::Config(_) => "ConfigError",
            XrayError::Authentication(_) => "AuthenticationError",
            XrayError::Network(_) => "NetworkError",
            XrayError::GraphQL { .. } => "GraphQLError",
            XrayError::Validation(_) => "ValidationError",
            XrayError::Resolution(_) => "ResolutionError",
            XrayError::NotFound(_) => "NotFoundError",
        }
    }

    /// The uniform failure shape returned to callers: exactly two keys.
    pub fn envelope(&self) -> Value {
        json!({
            "error": self.to_string(),
            "type": self.kind(),
        })
    }
}

impl From<serde_json::Error> for XrayError {
    fn from(err: serde_json::Error) -> Self {
        XrayError::Validation(format!("Invalid JSON: {err}"))
    }
}
