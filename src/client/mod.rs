//! GraphQL dispatch against the Xray API
//!
//! Executes query/mutation strings with a valid bearer token, surfaces
//! transport and application-level errors uniformly, and re-authenticates
//! exactly once on a 401.

pub mod transport;
pub mod transport_fake;
pub mod transport_http;

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::auth::AuthManager;
use crate::client::transport::{HttpResponse, Transport};
use crate::errors::XrayError;

/// How much of a non-JSON upstream body makes it into an error message.
const BODY_PREFIX_LEN: usize = 256;

/// GraphQL client for the Xray API.
pub struct GraphQLClient {
    auth: Arc<AuthManager>,
    transport: Arc<Transport>,
    endpoint: String,
}

impl GraphQLClient {
    pub fn new(auth: Arc<AuthManager>, transport: Arc<Transport>, endpoint: String) -> Self {
        Self {
            auth,
            transport,
            endpoint,
        }
    }

    /// Execute a GraphQL operation and return its `data` subtree.
    ///
    /// A 401 invalidates the cached token and retries exactly once; a
    /// second 401 surfaces as `AuthenticationError`.
    pub async fn execute(&self, operation: &str, variables: Value) -> Result<Value, XrayError> {
        let payload = json!({
            "query": operation,
            "variables": variables,
        })
        .to_string();

        let response = self.post_authorized(&payload).await?;

        let response = if response.status == 401 {
            warn!("upstream rejected token with 401, re-authenticating once");
            self.auth.invalidate().await;
            let retry = self.post_authorized(&payload).await?;
            if retry.status == 401 {
                return Err(XrayError::Authentication(
                    "Upstream rejected the bearer token twice in a row".to_string(),
                ));
            }
            retry
        } else {
            response
        };

        parse_graphql_response(response)
    }

    async fn post_authorized(&self, payload: &str) -> Result<HttpResponse, XrayError> {
        let token = self.auth.get_valid_token().await?;
        let headers = [("Authorization", format!("Bearer {token}"))];
        self.transport
            .post_json(&self.endpoint, &headers, payload)
            .await
    }
}

fn parse_graphql_response(response: HttpResponse) -> Result<Value, XrayError> {
    if !response.is_success() {
        return Err(XrayError::GraphQL {
            message: format!(
                "GraphQL request failed with status {}: {}",
                response.status,
                truncate(&response.body, BODY_PREFIX_LEN)
            ),
            errors: None,
        });
    }

    let body: Value = serde_json::from_str(&response.body).map_err(|e| XrayError::GraphQL {
        message: format!("Upstream returned a non-JSON body: {e}"),
        errors: None,
    })?;

    // 200 OK can still carry GraphQL-level errors.
    if let Some(errors) = body.get("errors").filter(|e| !is_empty_array(e)) {
        let joined = errors
            .as_array()
            .map(|list| {
                list.iter()
                    .map(|e| {
                        e.get("message")
                            .and_then(Value::as_str)
                            .unwrap_or("Unknown error")
                            .to_string()
                    })
                    .collect::<Vec<_>>()
                    .join("; ")
            })
            .unwrap_or_else(|| "Unknown error".to_string());
        return Err(XrayError::GraphQL {
            message: format!("GraphQL errors: {joined}"),
            errors: Some(errors.clone()),
        });
    }

    match body.get("data") {
        Some(data) => {
            debug!("GraphQL dispatch succeeded");
            Ok(data.clone())
        }
        None => Err(XrayError::graphql(
            "Upstream response carried neither data nor errors",
        )),
    }
}

fn is_empty_array(value: &Value) -> bool {
    value.as_array().map(Vec::is_empty).unwrap_or(false)
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resp(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            body: body.to_string(),
        }
    }

    #[test]
    fn returns_data_subtree() {
        let data =
            parse_graphql_response(resp(200, r#"{"data":{"getTest":{"issueId":"1"}}}"#)).unwrap();
        assert_eq!(data["getTest"]["issueId"], "1");
    }

    #[test]
    fn graphql_errors_join_messages() {
        let err = parse_graphql_response(resp(
            200,
            r#"{"errors":[{"message":"first"},{"message":"second"}]}"#,
        ))
        .unwrap_err();
        assert_eq!(err.kind(), "GraphQLError");
        let text = err.to_string();
        assert!(text.contains("first; second"));
    }

    #[test]
    fn empty_errors_array_is_not_an_error() {
        let data = parse_graphql_response(resp(200, r#"{"data":{"ok":true},"errors":[]}"#)).unwrap();
        assert_eq!(data["ok"], true);
    }

    #[test]
    fn non_2xx_includes_status_and_body_prefix() {
        let err = parse_graphql_response(resp(503, "upstream melting")).unwrap_err();
        let text = err.to_string();
        assert!(text.contains("503"));
        assert!(text.contains("upstream melting"));
    }

    #[test]
    fn long_error_bodies_are_truncated() {
        let long = "x".repeat(5000);
        let err = parse_graphql_response(resp(500, &long)).unwrap_err();
        assert!(err.to_string().len() < 600);
    }

    #[test]
    fn non_json_2xx_is_a_graphql_error() {
        let err = parse_graphql_response(resp(200, "<html>gateway</html>")).unwrap_err();
        assert_eq!(err.kind(), "GraphQLError");
    }

    #[test]
    fn missing_data_is_a_graphql_error() {
        let err = parse_graphql_response(resp(200, r#"{"extensions":{}}"#)).unwrap_err();
        assert_eq!(err.kind(), "GraphQLError");
    }
}
