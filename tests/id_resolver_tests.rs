//! IssueIdResolver integration tests
//!
//! Hint ordering, the cross-kind fallback chain, numeric passthrough, and
//! cache behavior, all against scripted GraphQL conversations.

mod support;

use serde_json::json;
use support::{fake, fake_context, push_auth_ok};
use xray_mcp::ResourceKind;

fn hit(entrypoint: &str, issue_id: &str) -> String {
    json!({
        "data": { entrypoint: { "results": [{ "issueId": issue_id }] } }
    })
    .to_string()
}

fn miss(entrypoint: &str) -> String {
    json!({
        "data": { entrypoint: { "results": [] } }
    })
    .to_string()
}

// =============================================================================
// Passthrough and key validation
// =============================================================================

#[tokio::test]
async fn numeric_keys_pass_through_with_zero_upstream_calls() {
    let (ctx, transport) = fake_context();

    let resolved = ctx.resolver.resolve("1162822", None).await.unwrap();
    assert_eq!(resolved, "1162822");

    let resolved = ctx
        .resolver
        .resolve("42", Some(ResourceKind::TestPlan))
        .await
        .unwrap();
    assert_eq!(resolved, "42");

    assert!(fake(&transport).requests().await.is_empty());
}

#[tokio::test]
async fn malformed_keys_are_rejected_before_any_call() {
    let (ctx, transport) = fake_context();

    for bad in ["lowercase-1", "PROJ-", "PROJ 123", "key = \"X\"", "-7"] {
        let err = ctx.resolver.resolve(bad, None).await.unwrap_err();
        assert_eq!(err.kind(), "ValidationError", "{bad} should be rejected");
    }
    assert!(fake(&transport).requests().await.is_empty());
}

// =============================================================================
// Hint ordering and fallback
// =============================================================================

#[tokio::test]
async fn test_kind_lookup_uses_key_scoped_jql() {
    let (ctx, transport) = fake_context();
    push_auth_ok(&transport).await;
    fake(&transport).push_response(200, &hit("getTests", "1162822")).await;

    let resolved = ctx
        .resolver
        .resolve("PROJ-123", Some(ResourceKind::Test))
        .await
        .unwrap();
    assert_eq!(resolved, "1162822");

    let lookup = &fake(&transport).requests().await[1];
    let body: serde_json::Value = serde_json::from_str(&lookup.body).unwrap();
    assert!(body["query"].as_str().unwrap().contains("getTests"));
    assert_eq!(body["variables"]["jql"], r#"key = "PROJ-123""#);
    assert_eq!(body["variables"]["limit"], 1);
}

#[tokio::test]
async fn execution_hint_queries_execution_entrypoint_first() {
    let (ctx, transport) = fake_context();
    push_auth_ok(&transport).await;
    // FRAMED-1670 is a TestExecution; with the hint the first lookup
    // already hits, where a Test-only resolver would have failed.
    fake(&transport).push_response(200, &hit("getTestExecutions", "2236471")).await;

    let resolved = ctx
        .resolver
        .resolve("FRAMED-1670", Some(ResourceKind::TestExecution))
        .await
        .unwrap();
    assert_eq!(resolved, "2236471");

    assert_eq!(fake(&transport).request_count_to("/api/v2/graphql").await, 1);
    let body = &fake(&transport).requests().await[1].body;
    assert!(body.contains("getTestExecutions"));
    assert!(!body.contains("getTests("));
}

#[tokio::test]
async fn unhinted_resolution_falls_back_in_fixed_order() {
    let (ctx, transport) = fake_context();
    push_auth_ok(&transport).await;
    fake(&transport).push_response(200, &miss("getTests")).await;
    fake(&transport).push_response(200, &miss("getTestSets")).await;
    fake(&transport).push_response(200, &miss("getTestExecutions")).await;
    fake(&transport).push_response(200, &hit("getTestPlans", "9001")).await;

    let resolved = ctx.resolver.resolve("PLAN-7", None).await.unwrap();
    assert_eq!(resolved, "9001");

    let entrypoint_order: Vec<&str> = fake(&transport)
        .requests().await
        .iter()
        .skip(1)
        .map(|r| {
            if r.body.contains("getTestSets") {
                "getTestSets"
            } else if r.body.contains("getTestExecutions") {
                "getTestExecutions"
            } else if r.body.contains("getTestPlans") {
                "getTestPlans"
            } else {
                "getTests"
            }
        })
        .collect();
    assert_eq!(
        entrypoint_order,
        vec!["getTests", "getTestSets", "getTestExecutions", "getTestPlans"]
    );
    // The chain stopped at the first hit.
    assert_eq!(fake(&transport).request_count_to("/api/v2/graphql").await, 4);
}

#[tokio::test]
async fn hinted_miss_continues_into_remaining_kinds() {
    let (ctx, transport) = fake_context();
    push_auth_ok(&transport).await;
    // Hint says TestPlan, but the key is actually a Test.
    fake(&transport).push_response(200, &miss("getTestPlans")).await;
    fake(&transport).push_response(200, &hit("getTests", "555")).await;

    let resolved = ctx
        .resolver
        .resolve("PROJ-9", Some(ResourceKind::TestPlan))
        .await
        .unwrap();
    assert_eq!(resolved, "555");
    assert_eq!(fake(&transport).request_count_to("/api/v2/graphql").await, 2);
}

#[tokio::test]
async fn per_kind_graphql_refusal_counts_as_miss() {
    let (ctx, transport) = fake_context();
    push_auth_ok(&transport).await;
    fake(&transport).push_response(200, r#"{"errors":[{"message":"unsupported"}]}"#).await;
    fake(&transport).push_response(200, &hit("getTestSets", "321")).await;

    let resolved = ctx.resolver.resolve("SET-1", None).await.unwrap();
    assert_eq!(resolved, "321");
}

#[tokio::test]
async fn exhausted_fallback_raises_resolution_error() {
    let (ctx, transport) = fake_context();
    push_auth_ok(&transport).await;
    for entrypoint in [
        "getTests",
        "getTestSets",
        "getTestExecutions",
        "getTestPlans",
        "getCoverableIssues",
    ] {
        fake(&transport).push_response(200, &miss(entrypoint)).await;
    }

    let err = ctx.resolver.resolve("GHOST-404", None).await.unwrap_err();
    assert_eq!(err.kind(), "ResolutionError");
    assert!(err.to_string().contains("GHOST-404"));
    assert_eq!(fake(&transport).request_count_to("/api/v2/graphql").await, 5);
}

// =============================================================================
// Caching
// =============================================================================

#[tokio::test]
async fn second_resolution_is_served_from_cache() {
    let (ctx, transport) = fake_context();
    push_auth_ok(&transport).await;
    fake(&transport).push_response(200, &hit("getTests", "777")).await;

    let first = ctx
        .resolver
        .resolve("PROJ-5", Some(ResourceKind::Test))
        .await
        .unwrap();
    let second = ctx
        .resolver
        .resolve("PROJ-5", Some(ResourceKind::Test))
        .await
        .unwrap();

    assert_eq!(first, "777");
    assert_eq!(second, "777");
    assert_eq!(fake(&transport).request_count_to("/api/v2/graphql").await, 1);
}

#[tokio::test]
async fn resolved_ids_are_fixed_points() {
    let (ctx, transport) = fake_context();
    push_auth_ok(&transport).await;
    fake(&transport).push_response(200, &hit("getTests", "888")).await;

    let once = ctx.resolver.resolve("PROJ-8", None).await.unwrap();
    // Resolving the result again is the identity and costs nothing.
    let calls_before = fake(&transport).requests().await.len();
    let twice = ctx.resolver.resolve(&once, None).await.unwrap();
    assert_eq!(once, twice);
    assert_eq!(fake(&transport).requests().await.len(), calls_before);
}

#[tokio::test]
async fn resolve_many_preserves_order_and_reuses_cache() {
    let (ctx, transport) = fake_context();
    push_auth_ok(&transport).await;
    fake(&transport).push_response(200, &hit("getTests", "101")).await;
    fake(&transport).push_response(200, &hit("getTests", "102")).await;

    let keys = vec![
        "A-1".to_string(),
        "1234".to_string(),
        "A-2".to_string(),
        "A-1".to_string(),
    ];
    let resolved = ctx
        .resolver
        .resolve_many(&keys, Some(ResourceKind::Test))
        .await
        .unwrap();

    assert_eq!(resolved, vec!["101", "1234", "102", "101"]);
    // Two lookups: numeric passthrough and the repeated key cost nothing.
    assert_eq!(fake(&transport).request_count_to("/api/v2/graphql").await, 2);
}
