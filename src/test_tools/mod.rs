//! Test management tools
//!
//! CRUD wrappers around the upstream test operations: retrieval (single,
//! filtered, expanded), creation for the three test types, updates, and
//! deletion. Each tool is a constant GraphQL template plus argument
//! shaping; identifier arguments go through the resolver with a Test hint.

use serde_json::{json, Map, Value};
use tracing::debug;

use crate::errors::XrayError;
use crate::facade::args;
use crate::facade::ToolContext;
use crate::jql::validate_jql;
use crate::resolve::ResourceKind;

const GET_TEST: &str = r#"
query GetTest($issueId: String!) {
    getTest(issueId: $issueId) {
        issueId
        testType {
            name
        }
        steps {
            id
            action
            data
            result
            attachments {
                id
                filename
            }
        }
        gherkin
        unstructured
        jira(fields: ["key", "summary", "assignee", "reporter", "status", "priority"])
    }
}
"#;

const GET_TESTS: &str = r#"
query GetTests($jql: String, $limit: Int!) {
    getTests(jql: $jql, limit: $limit) {
        total
        start
        limit
        results {
            issueId
            testType {
                name
            }
            jira(fields: ["key", "summary", "status", "priority", "labels"])
        }
    }
}
"#;

const GET_EXPANDED_TEST: &str = r#"
query GetExpandedTest($issueId: String!, $versionId: Int) {
    getExpandedTest(issueId: $issueId, versionId: $versionId) {
        issueId
        versionId
        testType {
            name
        }
        steps {
            id
            action
            data
            result
            parentTestIssueId
            calledTestIssueId
            attachments {
                id
                filename
            }
        }
        gherkin
        unstructured
        warnings
        jira(fields: ["key", "summary", "assignee", "reporter", "status", "priority"])
    }
}
"#;

const CREATE_TEST_WITH_STEPS: &str = r#"
mutation CreateTest($testType: UpdateTestTypeInput!, $steps: [CreateStepInput!], $fields: JSON!) {
    createTest(testType: $testType, steps: $steps, jira: { fields: $fields }) {
        test {
            issueId
            testType {
                name
            }
            steps {
                action
                data
                result
            }
            jira(fields: ["key", "summary"])
        }
        warnings
    }
}
"#;

const CREATE_TEST_WITH_GHERKIN: &str = r#"
mutation CreateTest($testType: UpdateTestTypeInput!, $gherkin: String!, $fields: JSON!) {
    createTest(testType: $testType, gherkin: $gherkin, jira: { fields: $fields }) {
        test {
            issueId
            testType {
                name
            }
            gherkin
            jira(fields: ["key", "summary"])
        }
        warnings
    }
}
"#;

const CREATE_TEST_UNSTRUCTURED: &str = r#"
mutation CreateTest($testType: UpdateTestTypeInput!, $unstructured: String, $fields: JSON!) {
    createTest(testType: $testType, unstructured: $unstructured, jira: { fields: $fields }) {
        test {
            issueId
            testType {
                name
            }
            unstructured
            jira(fields: ["key", "summary"])
        }
        warnings
    }
}
"#;

const UPDATE_TEST_TYPE: &str = r#"
mutation UpdateTestType($issueId: String!, $testType: UpdateTestTypeInput!, $versionId: Int) {
    updateTestType(issueId: $issueId, testType: $testType, versionId: $versionId) {
        issueId
        testType {
            name
            kind
        }
    }
}
"#;

const UPDATE_GHERKIN: &str = r#"
mutation UpdateGherkinDefinition($issueId: String!, $gherkin: String!, $versionId: Int) {
    updateGherkinTestDefinition(issueId: $issueId, gherkin: $gherkin, versionId: $versionId) {
        issueId
        gherkin
    }
}
"#;

const UPDATE_UNSTRUCTURED: &str = r#"
mutation UpdateUnstructuredDefinition($issueId: String!, $unstructured: String!, $versionId: Int) {
    updateUnstructuredTestDefinition(issueId: $issueId, unstructured: $unstructured, versionId: $versionId) {
        issueId
        unstructured
    }
}
"#;

const DELETE_TEST: &str = r#"
mutation DeleteTest($issueId: String!) {
    deleteTest(issueId: $issueId)
}
"#;

/// Retrieve a single test by issue id or Jira key.
pub async fn get_test(ctx: &ToolContext, tool_args: &Value) -> Result<Value, XrayError> {
    let issue_id = args::required_str(tool_args, "issue_id")?;
    let resolved = ctx
        .resolver
        .resolve(issue_id, Some(ResourceKind::Test))
        .await?;

    let data = ctx
        .client
        .execute(GET_TEST, json!({ "issueId": resolved }))
        .await?;

    match data.get("getTest") {
        Some(test) if !test.is_null() => Ok(test.clone()),
        _ => Err(XrayError::NotFound(format!("Test {issue_id} does not exist"))),
    }
}

/// Retrieve tests, optionally filtered by a validated JQL query.
pub async fn get_tests(ctx: &ToolContext, tool_args: &Value) -> Result<Value, XrayError> {
    let jql = match args::optional_str(tool_args, "jql")? {
        Some(raw) => Value::String(validate_jql(raw)?),
        None => Value::Null,
    };
    let limit = args::clamp_limit(tool_args)?;

    let data = ctx
        .client
        .execute(GET_TESTS, json!({ "jql": jql, "limit": limit }))
        .await?;

    match data.get("getTests") {
        Some(page) if !page.is_null() => Ok(page.clone()),
        _ => Err(XrayError::graphql("Failed to retrieve tests")),
    }
}

/// Retrieve detailed test information with version support.
pub async fn get_expanded_test(ctx: &ToolContext, tool_args: &Value) -> Result<Value, XrayError> {
    let issue_id = args::required_str(tool_args, "issue_id")?;
    let version_id = args::optional_i64(tool_args, "test_version_id")?;
    let resolved = ctx
        .resolver
        .resolve(issue_id, Some(ResourceKind::Test))
        .await?;

    let mut variables = Map::new();
    variables.insert("issueId".to_string(), json!(resolved));
    if let Some(version) = version_id {
        variables.insert("versionId".to_string(), json!(version));
    }

    let data = ctx
        .client
        .execute(GET_EXPANDED_TEST, Value::Object(variables))
        .await?;

    match data.get("getExpandedTest") {
        Some(test) if !test.is_null() => Ok(test.clone()),
        _ => Err(XrayError::NotFound(format!(
            "Expanded test {issue_id} does not exist"
        ))),
    }
}

/// Create a test of the given type (Manual, Cucumber, or Generic).
pub async fn create_test(ctx: &ToolContext, tool_args: &Value) -> Result<Value, XrayError> {
    let project_key = args::required_str(tool_args, "project_key")?;
    let summary = args::required_str(tool_args, "summary")?;
    let test_type = args::optional_str(tool_args, "test_type")?.unwrap_or("Generic");
    let description = args::optional_str(tool_args, "description")?;
    let gherkin = args::optional_str(tool_args, "gherkin")?.map(str::to_string);
    let unstructured = args::optional_str(tool_args, "unstructured")?;
    let steps = args::structured_array(tool_args, "steps")?;

    let mut fields = Map::new();
    fields.insert("summary".to_string(), json!(summary));
    fields.insert("project".to_string(), json!({ "key": project_key }));
    if let Some(desc) = description {
        fields.insert("description".to_string(), json!(desc));
    }
    let fields = Value::Object(fields);

    let (mutation, variables) = match test_type.to_ascii_lowercase().as_str() {
        "manual" => {
            let steps = shape_steps(steps.unwrap_or_default())?;
            (
                CREATE_TEST_WITH_STEPS,
                json!({
                    "testType": { "name": test_type },
                    "steps": steps,
                    "fields": fields,
                }),
            )
        }
        "cucumber" => {
            let gherkin = gherkin.ok_or_else(|| {
                XrayError::Validation(
                    "Cucumber tests require a 'gherkin' argument".to_string(),
                )
            })?;
            (
                CREATE_TEST_WITH_GHERKIN,
                json!({
                    "testType": { "name": test_type },
                    "gherkin": gherkin,
                    "fields": fields,
                }),
            )
        }
        _ => (
            CREATE_TEST_UNSTRUCTURED,
            json!({
                "testType": { "name": test_type },
                "unstructured": unstructured.unwrap_or(""),
                "fields": fields,
            }),
        ),
    };

    debug!(test_type, project_key, "creating test");
    let data = ctx.client.execute(mutation, variables).await?;

    match data.get("createTest") {
        Some(created) if !created.is_null() => Ok(created.clone()),
        _ => Err(XrayError::graphql(format!(
            "Failed to create {test_type} test in {project_key}"
        ))),
    }
}

/// Update test type, content, and Jira fields in one call.
///
/// Operations run in sequence (type, then content); per-step failures are
/// collected rather than aborting the remainder, and the final test state
/// is fetched when anything succeeded.
pub async fn update_test(ctx: &ToolContext, tool_args: &Value) -> Result<Value, XrayError> {
    let issue_id = args::required_str(tool_args, "issue_id")?;
    let test_type = args::optional_str(tool_args, "test_type")?.map(str::to_string);
    let gherkin = args::optional_str(tool_args, "gherkin")?.map(str::to_string);
    let unstructured = args::optional_str(tool_args, "unstructured")?.map(str::to_string);
    let steps = args::structured_array(tool_args, "steps")?;
    let jira_fields = args::structured_object(tool_args, "jira_fields")?;
    let version_id = args::optional_i64(tool_args, "version_id")?;

    if test_type.is_none()
        && gherkin.is_none()
        && unstructured.is_none()
        && steps.is_none()
        && jira_fields.is_none()
    {
        return Err(XrayError::Validation(
            "At least one update argument is required: \
             test_type, gherkin, unstructured, steps, or jira_fields"
                .to_string(),
        ));
    }

    let resolved = ctx
        .resolver
        .resolve(issue_id, Some(ResourceKind::Test))
        .await?;

    let mut updated_fields: Vec<&str> = Vec::new();
    let mut warnings: Vec<String> = Vec::new();
    let mut update_errors: Vec<String> = Vec::new();

    if let Some(ref new_type) = test_type {
        let mut variables = Map::new();
        variables.insert("issueId".to_string(), json!(resolved));
        variables.insert("testType".to_string(), json!({ "name": new_type }));
        if let Some(version) = version_id {
            variables.insert("versionId".to_string(), json!(version));
        }
        match ctx
            .client
            .execute(UPDATE_TEST_TYPE, Value::Object(variables))
            .await
        {
            Ok(_) => updated_fields.push("test_type"),
            Err(e) => update_errors.push(format!("Test type update failed: {e}")),
        }
    }

    if let Some(ref gherkin) = gherkin {
        let mut variables = Map::new();
        variables.insert("issueId".to_string(), json!(resolved));
        variables.insert("gherkin".to_string(), json!(gherkin));
        if let Some(version) = version_id {
            variables.insert("versionId".to_string(), json!(version));
        }
        match ctx
            .client
            .execute(UPDATE_GHERKIN, Value::Object(variables))
            .await
        {
            Ok(_) => updated_fields.push("gherkin"),
            Err(e) => update_errors.push(format!("Gherkin update failed: {e}")),
        }
    }

    if let Some(ref unstructured) = unstructured {
        let mut variables = Map::new();
        variables.insert("issueId".to_string(), json!(resolved));
        variables.insert("unstructured".to_string(), json!(unstructured));
        if let Some(version) = version_id {
            variables.insert("versionId".to_string(), json!(version));
        }
        match ctx
            .client
            .execute(UPDATE_UNSTRUCTURED, Value::Object(variables))
            .await
        {
            Ok(_) => updated_fields.push("unstructured"),
            Err(e) => update_errors.push(format!("Unstructured content update failed: {e}")),
        }
    }

    if steps.is_some() {
        warnings.push(
            "Step updates require individual step management and are not supported here"
                .to_string(),
        );
    }

    if jira_fields.is_some() {
        // The upstream GraphQL schema has no mutation for Jira fields on
        // existing tests; those go through the Jira REST API instead.
        warnings.push(
            "Jira field updates are not supported by the Xray GraphQL API; \
             use the Jira REST API for fields like summary or description"
                .to_string(),
        );
    }

    let test_state = if update_errors.is_empty() || !updated_fields.is_empty() {
        match get_test(ctx, &json!({ "issue_id": resolved })).await {
            Ok(test) => Some(test),
            Err(e) => {
                warnings.push(format!("Could not retrieve updated test state: {e}"));
                None
            }
        }
    } else {
        None
    };

    Ok(json!({
        "success": update_errors.is_empty(),
        "updated_fields": updated_fields,
        "test": test_state,
        "warnings": warnings,
        "errors": update_errors,
    }))
}

/// Change the test type of an existing test.
pub async fn update_test_type(ctx: &ToolContext, tool_args: &Value) -> Result<Value, XrayError> {
    let issue_id = args::required_str(tool_args, "issue_id")?;
    let test_type = args::required_str(tool_args, "test_type")?;
    let resolved = ctx
        .resolver
        .resolve(issue_id, Some(ResourceKind::Test))
        .await?;

    let data = ctx
        .client
        .execute(
            UPDATE_TEST_TYPE,
            json!({
                "issueId": resolved,
                "testType": { "name": test_type },
            }),
        )
        .await?;

    match data.get("updateTestType") {
        Some(updated) if !updated.is_null() => Ok(updated.clone()),
        _ => Err(XrayError::graphql(format!(
            "Failed to update test type of {issue_id} to {test_type}"
        ))),
    }
}

/// Delete a test permanently.
pub async fn delete_test(ctx: &ToolContext, tool_args: &Value) -> Result<Value, XrayError> {
    let issue_id = args::required_str(tool_args, "issue_id")?;
    let resolved = ctx
        .resolver
        .resolve(issue_id, Some(ResourceKind::Test))
        .await?;

    let data = ctx
        .client
        .execute(DELETE_TEST, json!({ "issueId": resolved }))
        .await?;

    match data.get("deleteTest") {
        Some(outcome) => Ok(json!({ "success": outcome, "issueId": resolved })),
        None => Err(XrayError::graphql(format!("Failed to delete test {issue_id}"))),
    }
}

/// Shape step inputs into CreateStepInput form, requiring action + result.
fn shape_steps(steps: Vec<Value>) -> Result<Vec<Value>, XrayError> {
    let mut shaped = Vec::with_capacity(steps.len());
    for step in steps {
        let obj = step.as_object().ok_or_else(|| {
            XrayError::Validation("Each step must be a JSON object".to_string())
        })?;
        let action = obj.get("action").and_then(Value::as_str).ok_or_else(|| {
            XrayError::Validation("Each step must have 'action' and 'result' fields".to_string())
        })?;
        let result = obj.get("result").and_then(Value::as_str).ok_or_else(|| {
            XrayError::Validation("Each step must have 'action' and 'result' fields".to_string())
        })?;

        let mut entry = Map::new();
        entry.insert("action".to_string(), json!(action));
        entry.insert("result".to_string(), json!(result));
        if let Some(data) = obj.get("data").and_then(Value::as_str) {
            if !data.is_empty() {
                entry.insert("data".to_string(), json!(data));
            }
        }
        shaped.push(Value::Object(entry));
    }
    Ok(shaped)
}
