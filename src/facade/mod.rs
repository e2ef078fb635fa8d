//! Tool facade
//!
//! The single boundary between the tool-call transport and the core. Tools
//! are plain fallible async functions; this module routes calls to them and
//! converts any error into the uniform `{error, type}` envelope exactly
//! once. Nothing below this layer shapes errors for callers.

pub mod args;

use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::auth::AuthManager;
use crate::client::transport::Transport;
use crate::client::GraphQLClient;
use crate::config::XrayConfig;
use crate::errors::XrayError;
use crate::resolve::IssueIdResolver;
use crate::{execution_tools, test_tools, utility_tools};

/// Shared component graph handed to every tool call.
pub struct ToolContext {
    pub auth: Arc<AuthManager>,
    pub client: Arc<GraphQLClient>,
    pub resolver: Arc<IssueIdResolver>,
}

impl ToolContext {
    /// Wire the full component graph from configuration and a transport.
    pub fn new(config: XrayConfig, transport: Arc<Transport>) -> Self {
        let graphql_url = config.graphql_url();
        let auth = Arc::new(AuthManager::new(config, Arc::clone(&transport)));
        let client = Arc::new(GraphQLClient::new(
            Arc::clone(&auth),
            transport,
            graphql_url,
        ));
        let resolver = Arc::new(IssueIdResolver::new(Arc::clone(&client)));
        Self {
            auth,
            client,
            resolver,
        }
    }
}

/// A tool as advertised over the transport.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

fn tool(name: &str, description: &str, input_schema: Value) -> ToolDefinition {
    ToolDefinition {
        name: name.to_string(),
        description: description.to_string(),
        input_schema,
    }
}

fn object_schema(properties: Value, required: &[&str]) -> Value {
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

/// Everything the server advertises under `tools/list`.
pub fn tool_definitions() -> Vec<ToolDefinition> {
    let issue_id = json!({"type": "string", "description": "Jira issue ID or key, e.g. \"1162822\" or \"PROJ-123\""});
    let jql = json!({"type": "string", "description": "JQL filter, validated against the field whitelist"});
    let limit = json!({"type": "integer", "description": "Maximum results, clamped to 1-100", "default": 100});

    vec![
        tool(
            "get_test",
            "Retrieve a single test with steps, Gherkin, and Jira fields",
            object_schema(json!({"issue_id": issue_id.clone()}), &["issue_id"]),
        ),
        tool(
            "get_tests",
            "Retrieve tests, optionally filtered by JQL",
            object_schema(json!({"jql": jql.clone(), "limit": limit.clone()}), &[]),
        ),
        tool(
            "get_expanded_test",
            "Retrieve detailed test information including version data",
            object_schema(
                json!({"issue_id": issue_id.clone(), "test_version_id": {"type": "integer"}}),
                &["issue_id"],
            ),
        ),
        tool(
            "create_test",
            "Create a Manual, Cucumber, or Generic test",
            object_schema(
                json!({
                    "project_key": {"type": "string"},
                    "summary": {"type": "string"},
                    "test_type": {"type": "string", "enum": ["Manual", "Cucumber", "Generic"], "default": "Generic"},
                    "description": {"type": "string"},
                    "steps": {"type": "array", "description": "Manual test steps; array or JSON-encoded string"},
                    "gherkin": {"type": "string"},
                    "unstructured": {"type": "string"},
                }),
                &["project_key", "summary"],
            ),
        ),
        tool(
            "update_test",
            "Update test type, content, steps, or Jira fields",
            object_schema(
                json!({
                    "issue_id": issue_id.clone(),
                    "test_type": {"type": "string"},
                    "gherkin": {"type": "string"},
                    "unstructured": {"type": "string"},
                    "steps": {"type": "array", "description": "Array or JSON-encoded string"},
                    "jira_fields": {"type": "object", "description": "Object or JSON-encoded string"},
                    "version_id": {"type": "integer"},
                }),
                &["issue_id"],
            ),
        ),
        tool(
            "update_test_type",
            "Change the type of an existing test",
            object_schema(
                json!({"issue_id": issue_id.clone(), "test_type": {"type": "string"}}),
                &["issue_id", "test_type"],
            ),
        ),
        tool(
            "delete_test",
            "Delete a test permanently",
            object_schema(json!({"issue_id": issue_id.clone()}), &["issue_id"]),
        ),
        tool(
            "get_test_execution",
            "Retrieve a single test execution",
            object_schema(json!({"issue_id": issue_id.clone()}), &["issue_id"]),
        ),
        tool(
            "get_test_executions",
            "Retrieve test executions, optionally filtered by JQL",
            object_schema(json!({"jql": jql.clone(), "limit": limit.clone()}), &[]),
        ),
        tool(
            "create_test_execution",
            "Create a test execution with optional member tests and environments",
            object_schema(
                json!({
                    "project_key": {"type": "string"},
                    "summary": {"type": "string"},
                    "description": {"type": "string"},
                    "test_issue_ids": {"type": "array", "items": {"type": "string"}},
                    "test_environments": {"type": "array", "items": {"type": "string"}},
                }),
                &["project_key", "summary"],
            ),
        ),
        tool(
            "delete_test_execution",
            "Delete a test execution permanently",
            object_schema(json!({"issue_id": issue_id.clone()}), &["issue_id"]),
        ),
        tool(
            "add_tests_to_execution",
            "Add tests to an existing test execution",
            object_schema(
                json!({
                    "execution_issue_id": issue_id.clone(),
                    "test_issue_ids": {"type": "array", "items": {"type": "string"}},
                }),
                &["execution_issue_id", "test_issue_ids"],
            ),
        ),
        tool(
            "remove_tests_from_execution",
            "Remove tests from an existing test execution",
            object_schema(
                json!({
                    "execution_issue_id": issue_id.clone(),
                    "test_issue_ids": {"type": "array", "items": {"type": "string"}},
                }),
                &["execution_issue_id", "test_issue_ids"],
            ),
        ),
        tool(
            "execute_jql_query",
            "Run a validated JQL query against tests or test executions",
            object_schema(
                json!({
                    "jql": jql.clone(),
                    "entity_type": {"type": "string", "enum": ["test", "testexecution"], "default": "test"},
                    "limit": limit.clone(),
                }),
                &["jql"],
            ),
        ),
        tool(
            "validate_connection",
            "Verify Xray credentials by forcing a token refresh",
            object_schema(json!({}), &[]),
        ),
    ]
}

/// Run a tool call and shape the outcome.
///
/// This is the only place errors become caller-visible: whatever the chain
/// raised is rendered as the two-field envelope here.
pub async fn dispatch(ctx: &ToolContext, name: &str, tool_args: &Value) -> Value {
    info!(tool = name, "tool call");
    match route(ctx, name, tool_args).await {
        Ok(value) => value,
        Err(error) => {
            warn!(tool = name, kind = error.kind(), "tool call failed: {error}");
            error.envelope()
        }
    }
}

async fn route(ctx: &ToolContext, name: &str, tool_args: &Value) -> Result<Value, XrayError> {
    match name {
        "get_test" => test_tools::get_test(ctx, tool_args).await,
        "get_tests" => test_tools::get_tests(ctx, tool_args).await,
        "get_expanded_test" => test_tools::get_expanded_test(ctx, tool_args).await,
        "create_test" => test_tools::create_test(ctx, tool_args).await,
        "update_test" => test_tools::update_test(ctx, tool_args).await,
        "update_test_type" => test_tools::update_test_type(ctx, tool_args).await,
        "delete_test" => test_tools::delete_test(ctx, tool_args).await,
        "get_test_execution" => execution_tools::get_test_execution(ctx, tool_args).await,
        "get_test_executions" => execution_tools::get_test_executions(ctx, tool_args).await,
        "create_test_execution" => execution_tools::create_test_execution(ctx, tool_args).await,
        "delete_test_execution" => execution_tools::delete_test_execution(ctx, tool_args).await,
        "add_tests_to_execution" => execution_tools::add_tests_to_execution(ctx, tool_args).await,
        "remove_tests_from_execution" => {
            execution_tools::remove_tests_from_execution(ctx, tool_args).await
        }
        "execute_jql_query" => utility_tools::execute_jql_query(ctx, tool_args).await,
        "validate_connection" => utility_tools::validate_connection(ctx, tool_args).await,
        unknown => Err(XrayError::Validation(format!("Unknown tool: {unknown}"))),
    }
}
