//! Utility tools
//!
//! Ad-hoc JQL execution (behind the whitelist validator) and connection
//! diagnostics.

use serde_json::{json, Value};

use crate::errors::XrayError;
use crate::facade::args;
use crate::facade::ToolContext;
use crate::jql::validate_jql;

const JQL_TESTS: &str = r#"
query ExecuteTestJql($jql: String!, $limit: Int!) {
    getTests(jql: $jql, limit: $limit) {
        total
        start
        limit
        results {
            issueId
            testType {
                name
            }
            jira(fields: ["key", "summary", "status", "priority"])
        }
    }
}
"#;

const JQL_TEST_EXECUTIONS: &str = r#"
query ExecuteTestExecutionJql($jql: String!, $limit: Int!) {
    getTestExecutions(jql: $jql, limit: $limit) {
        total
        start
        limit
        results {
            issueId
            testEnvironments
            jira(fields: ["key", "summary", "status"])
        }
    }
}
"#;

/// Execute a validated JQL query against one of the searchable entity types.
pub async fn execute_jql_query(ctx: &ToolContext, tool_args: &Value) -> Result<Value, XrayError> {
    let jql = args::required_str(tool_args, "jql")?;
    let entity_type = args::optional_str(tool_args, "entity_type")?.unwrap_or("test");
    let limit = args::clamp_limit(tool_args)?;

    let safe_jql = validate_jql(jql)?;

    let (query, entrypoint) = match entity_type.to_ascii_lowercase().as_str() {
        "test" => (JQL_TESTS, "getTests"),
        "testexecution" => (JQL_TEST_EXECUTIONS, "getTestExecutions"),
        other => {
            return Err(XrayError::Validation(format!(
                "Unsupported entity type '{other}': expected 'test' or 'testexecution'"
            )))
        }
    };

    let data = ctx
        .client
        .execute(query, json!({ "jql": safe_jql, "limit": limit }))
        .await?;

    match data.get(entrypoint) {
        Some(page) if !page.is_null() => Ok(page.clone()),
        _ => Err(XrayError::graphql(format!(
            "JQL query against {entrypoint} returned no payload"
        ))),
    }
}

/// Check that credentials work by forcing a token refresh.
pub async fn validate_connection(ctx: &ToolContext, _tool_args: &Value) -> Result<Value, XrayError> {
    ctx.auth.invalidate().await;
    ctx.auth.get_valid_token().await?;
    Ok(json!({
        "authenticated": true,
        "status": "connected",
    }))
}
