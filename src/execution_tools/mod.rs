//! Test execution tools
//!
//! Wrappers around the upstream execution operations: retrieval, creation,
//! deletion, and test membership management. Execution identifiers resolve
//! with a TestExecution hint so keys naming executions hit the right
//! lookup entrypoint first; member test ids resolve with a Test hint.

use serde_json::{json, Map, Value};
use tracing::debug;

use crate::errors::XrayError;
use crate::facade::args;
use crate::facade::ToolContext;
use crate::jql::validate_jql;
use crate::resolve::ResourceKind;

const GET_TEST_EXECUTION: &str = r#"
query GetTestExecution($issueId: String!) {
    getTestExecution(issueId: $issueId) {
        issueId
        testEnvironments
        tests(limit: 100) {
            total
            results {
                issueId
                testType {
                    name
                }
            }
        }
        jira(fields: ["key", "summary", "assignee", "reporter", "status"])
    }
}
"#;

const GET_TEST_EXECUTIONS: &str = r#"
query GetTestExecutions($jql: String, $limit: Int!) {
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

const CREATE_TEST_EXECUTION: &str = r#"
mutation CreateTestExecution($testIssueIds: [String!], $testEnvironments: [String!], $jira: JSON!) {
    createTestExecution(testIssueIds: $testIssueIds, testEnvironments: $testEnvironments, jira: $jira) {
        testExecution {
            issueId
            jira(fields: ["key", "summary"])
        }
        warnings
        createdTestEnvironments
    }
}
"#;

const DELETE_TEST_EXECUTION: &str = r#"
mutation DeleteTestExecution($issueId: String!) {
    deleteTestExecution(issueId: $issueId)
}
"#;

const ADD_TESTS_TO_EXECUTION: &str = r#"
mutation AddTestsToTestExecution($issueId: String!, $testIssueIds: [String!]!) {
    addTestsToTestExecution(issueId: $issueId, testIssueIds: $testIssueIds) {
        addedTests
        warning
    }
}
"#;

const REMOVE_TESTS_FROM_EXECUTION: &str = r#"
mutation RemoveTestsFromTestExecution($issueId: String!, $testIssueIds: [String!]!) {
    removeTestsFromTestExecution(issueId: $issueId, testIssueIds: $testIssueIds)
}
"#;

/// Retrieve a single test execution by issue id or Jira key.
pub async fn get_test_execution(ctx: &ToolContext, tool_args: &Value) -> Result<Value, XrayError> {
    let issue_id = args::required_str(tool_args, "issue_id")?;
    let resolved = ctx
        .resolver
        .resolve(issue_id, Some(ResourceKind::TestExecution))
        .await?;

    let data = ctx
        .client
        .execute(GET_TEST_EXECUTION, json!({ "issueId": resolved }))
        .await?;

    match data.get("getTestExecution") {
        Some(execution) if !execution.is_null() => Ok(execution.clone()),
        _ => Err(XrayError::NotFound(format!(
            "Test execution {issue_id} does not exist"
        ))),
    }
}

/// Retrieve test executions, optionally filtered by a validated JQL query.
pub async fn get_test_executions(
    ctx: &ToolContext,
    tool_args: &Value,
) -> Result<Value, XrayError> {
    let jql = match args::optional_str(tool_args, "jql")? {
        Some(raw) => Value::String(validate_jql(raw)?),
        None => Value::Null,
    };
    let limit = args::clamp_limit(tool_args)?;

    let data = ctx
        .client
        .execute(GET_TEST_EXECUTIONS, json!({ "jql": jql, "limit": limit }))
        .await?;

    match data.get("getTestExecutions") {
        Some(page) if !page.is_null() => Ok(page.clone()),
        _ => Err(XrayError::graphql("Failed to retrieve test executions")),
    }
}

/// Create a test execution, optionally seeding member tests and environments.
pub async fn create_test_execution(
    ctx: &ToolContext,
    tool_args: &Value,
) -> Result<Value, XrayError> {
    let project_key = args::required_str(tool_args, "project_key")?;
    let summary = args::required_str(tool_args, "summary")?;
    let description = args::optional_str(tool_args, "description")?;
    let test_issue_ids = args::optional_string_list(tool_args, "test_issue_ids")?;
    let test_environments =
        args::optional_string_list(tool_args, "test_environments")?.unwrap_or_default();

    let member_ids = match test_issue_ids {
        Some(keys) => {
            ctx.resolver
                .resolve_many(&keys, Some(ResourceKind::Test))
                .await?
        }
        None => Vec::new(),
    };

    let mut fields = Map::new();
    fields.insert("summary".to_string(), json!(summary));
    fields.insert("project".to_string(), json!({ "key": project_key }));
    if let Some(desc) = description {
        fields.insert("description".to_string(), json!(desc));
    }

    debug!(project_key, members = member_ids.len(), "creating test execution");
    let data = ctx
        .client
        .execute(
            CREATE_TEST_EXECUTION,
            json!({
                "testIssueIds": member_ids,
                "testEnvironments": test_environments,
                "jira": { "fields": Value::Object(fields) },
            }),
        )
        .await?;

    match data.get("createTestExecution") {
        Some(created) if !created.is_null() => Ok(created.clone()),
        _ => Err(XrayError::graphql(format!(
            "Failed to create test execution in {project_key}"
        ))),
    }
}

/// Delete a test execution permanently.
pub async fn delete_test_execution(
    ctx: &ToolContext,
    tool_args: &Value,
) -> Result<Value, XrayError> {
    let issue_id = args::required_str(tool_args, "issue_id")?;
    let resolved = ctx
        .resolver
        .resolve(issue_id, Some(ResourceKind::TestExecution))
        .await?;

    let data = ctx
        .client
        .execute(DELETE_TEST_EXECUTION, json!({ "issueId": resolved }))
        .await?;

    match data.get("deleteTestExecution") {
        Some(outcome) => Ok(json!({ "success": outcome, "issueId": resolved })),
        None => Err(XrayError::graphql(format!(
            "Failed to delete test execution {issue_id}"
        ))),
    }
}

/// Add tests to an existing execution.
pub async fn add_tests_to_execution(
    ctx: &ToolContext,
    tool_args: &Value,
) -> Result<Value, XrayError> {
    let execution_id = args::required_str(tool_args, "execution_issue_id")?;
    let test_keys = args::required_string_list(tool_args, "test_issue_ids")?;

    let resolved_execution = ctx
        .resolver
        .resolve(execution_id, Some(ResourceKind::TestExecution))
        .await?;
    let resolved_tests = ctx
        .resolver
        .resolve_many(&test_keys, Some(ResourceKind::Test))
        .await?;

    let data = ctx
        .client
        .execute(
            ADD_TESTS_TO_EXECUTION,
            json!({
                "issueId": resolved_execution,
                "testIssueIds": resolved_tests,
            }),
        )
        .await?;

    match data.get("addTestsToTestExecution") {
        Some(outcome) if !outcome.is_null() => Ok(outcome.clone()),
        _ => Err(XrayError::graphql(format!(
            "Failed to add tests to execution {execution_id}"
        ))),
    }
}

/// Remove tests from an existing execution.
pub async fn remove_tests_from_execution(
    ctx: &ToolContext,
    tool_args: &Value,
) -> Result<Value, XrayError> {
    let execution_id = args::required_str(tool_args, "execution_issue_id")?;
    let test_keys = args::required_string_list(tool_args, "test_issue_ids")?;

    let resolved_execution = ctx
        .resolver
        .resolve(execution_id, Some(ResourceKind::TestExecution))
        .await?;
    let resolved_tests = ctx
        .resolver
        .resolve_many(&test_keys, Some(ResourceKind::Test))
        .await?;

    let data = ctx
        .client
        .execute(
            REMOVE_TESTS_FROM_EXECUTION,
            json!({
                "issueId": resolved_execution,
                "testIssueIds": resolved_tests,
            }),
        )
        .await?;

    match data.get("removeTestsFromTestExecution") {
        Some(outcome) => Ok(json!({
            "success": outcome,
            "executionId": resolved_execution,
        })),
        None => Err(XrayError::graphql(format!(
            "Failed to remove tests from execution {execution_id}"
        ))),
    }
}
