//! GraphQLClient integration tests
//!
//! Scripted conversations through the fake transport: bearer injection,
//! the single 401 re-auth retry, and uniform error surfacing.

mod support;

use serde_json::json;
use support::{auth_body, fake, fake_context, jwt_expiring_in, push_auth_ok};

const PING_QUERY: &str = "query Ping { getTests(limit: 1) { total } }";

// =============================================================================
// Happy path
// =============================================================================

#[tokio::test]
async fn returns_data_subtree_with_bearer_header() {
    let (ctx, transport) = fake_context();
    let token = push_auth_ok(&transport).await;
    fake(&transport).push_response(200, r#"{"data":{"getTests":{"total":3}}}"#).await;

    let data = ctx.client.execute(PING_QUERY, json!({})).await.unwrap();
    assert_eq!(data["getTests"]["total"], 3);

    let requests = fake(&transport).requests().await;
    assert_eq!(requests.len(), 2);
    let graphql = &requests[1];
    assert!(graphql.url.ends_with("/api/v2/graphql"));
    assert!(graphql
        .headers
        .iter()
        .any(|(name, value)| name == "Authorization" && *value == format!("Bearer {token}")));

    let body: serde_json::Value = serde_json::from_str(&graphql.body).unwrap();
    assert_eq!(body["query"], PING_QUERY);
}

#[tokio::test]
async fn variables_pass_through_verbatim() {
    let (ctx, transport) = fake_context();
    push_auth_ok(&transport).await;
    fake(&transport).push_response(200, r#"{"data":{}}"#).await;

    ctx.client
        .execute(PING_QUERY, json!({"issueId": "1162822", "limit": 25}))
        .await
        .unwrap();

    let body: serde_json::Value =
        serde_json::from_str(&fake(&transport).requests().await[1].body).unwrap();
    assert_eq!(body["variables"]["issueId"], "1162822");
    assert_eq!(body["variables"]["limit"], 25);
}

// =============================================================================
// 401 recovery
// =============================================================================

#[tokio::test]
async fn single_401_triggers_one_reauth_and_retry() {
    let (ctx, transport) = fake_context();
    // Cached token revoked server-side: first dispatch 401, then a fresh
    // auth and a successful retry.
    let revoked = jwt_expiring_in(3600);
    let fresh = jwt_expiring_in(3600);
    fake(&transport).push_response(200, &auth_body(&revoked)).await;
    fake(&transport).push_response(401, "token revoked").await;
    fake(&transport).push_response(200, &auth_body(&fresh)).await;
    fake(&transport).push_response(200, r#"{"data":{"ok":true}}"#).await;

    let data = ctx.client.execute(PING_QUERY, json!({})).await.unwrap();
    assert_eq!(data["ok"], true);

    assert_eq!(fake(&transport).request_count_to("/api/v2/authenticate").await, 2);
    assert_eq!(fake(&transport).request_count_to("/api/v2/graphql").await, 2);

    // The retry went out under the fresh token.
    let requests = fake(&transport).requests().await;
    assert!(requests[3]
        .headers
        .iter()
        .any(|(name, value)| name == "Authorization" && *value == format!("Bearer {fresh}")));
}

#[tokio::test]
async fn second_401_surfaces_as_authentication_error() {
    let (ctx, transport) = fake_context();
    fake(&transport).push_response(200, &auth_body(&jwt_expiring_in(3600))).await;
    fake(&transport).push_response(401, "no").await;
    fake(&transport).push_response(200, &auth_body(&jwt_expiring_in(3600))).await;
    fake(&transport).push_response(401, "still no").await;

    let err = ctx.client.execute(PING_QUERY, json!({})).await.unwrap_err();
    assert_eq!(err.kind(), "AuthenticationError");

    // Exactly one retry: two graphql attempts, no third.
    assert_eq!(fake(&transport).request_count_to("/api/v2/graphql").await, 2);
}

// =============================================================================
// Error surfacing
// =============================================================================

#[tokio::test]
async fn graphql_errors_array_is_surfaced_with_context() {
    let (ctx, transport) = fake_context();
    push_auth_ok(&transport).await;
    fake(&transport).push_response(
        200,
        r#"{"errors":[{"message":"Field does not exist"},{"message":"Syntax error"}]}"#,
    ).await;

    let err = ctx.client.execute(PING_QUERY, json!({})).await.unwrap_err();
    assert_eq!(err.kind(), "GraphQLError");
    let text = err.to_string();
    assert!(text.contains("Field does not exist"));
    assert!(text.contains("Syntax error"));
}

#[tokio::test]
async fn http_error_status_is_surfaced_without_retry() {
    let (ctx, transport) = fake_context();
    push_auth_ok(&transport).await;
    fake(&transport).push_response(429, "rate limited").await;

    let err = ctx.client.execute(PING_QUERY, json!({})).await.unwrap_err();
    assert_eq!(err.kind(), "GraphQLError");
    assert!(err.to_string().contains("429"));
    // 429 and 5xx are not retried; only 401 is.
    assert_eq!(fake(&transport).request_count_to("/api/v2/graphql").await, 1);
}

#[tokio::test]
async fn transport_failure_surfaces_as_network_error() {
    let (ctx, transport) = fake_context();
    push_auth_ok(&transport).await;
    fake(&transport).push_network_error("connection reset by peer").await;

    let err = ctx.client.execute(PING_QUERY, json!({})).await.unwrap_err();
    assert_eq!(err.kind(), "NetworkError");
}

#[tokio::test]
async fn auth_failure_short_circuits_dispatch() {
    let (ctx, transport) = fake_context();
    fake(&transport).push_response(401, "bad credentials").await;

    let err = ctx.client.execute(PING_QUERY, json!({})).await.unwrap_err();
    assert_eq!(err.kind(), "AuthenticationError");
    // The GraphQL endpoint was never contacted.
    assert_eq!(fake(&transport).request_count_to("/api/v2/graphql").await, 0);
}
