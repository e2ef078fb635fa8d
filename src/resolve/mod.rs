//! Jira key to issue-id resolution
//!
//! The upstream GraphQL schema wants numeric issue ids, but users hand us
//! project-scoped keys like `PROJ-123`, and the key alone does not reveal
//! which resource kind it names. Resolution tries the hinted kind first,
//! then falls back across the remaining kinds, caching whatever wins for
//! the life of the process (upstream ids are stable).

use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::{debug, trace};

use crate::client::GraphQLClient;
use crate::errors::XrayError;

static KEY_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z][A-Z0-9_]*-\d+$").unwrap());
static NUMERIC_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+$").unwrap());

/// The resource kinds the upstream exposes separate lookup entrypoints for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Test,
    TestSet,
    TestExecution,
    TestPlan,
    CoverableIssue,
}

impl ResourceKind {
    /// Order tried when no hint narrows the search.
    pub const FALLBACK_ORDER: [ResourceKind; 5] = [
        ResourceKind::Test,
        ResourceKind::TestSet,
        ResourceKind::TestExecution,
        ResourceKind::TestPlan,
        ResourceKind::CoverableIssue,
    ];

    /// GraphQL query entrypoint that searches this kind.
    pub fn entrypoint(&self) -> &'static str {
        match self {
            ResourceKind::Test => "getTests",
            ResourceKind::TestSet => "getTestSets",
            ResourceKind::TestExecution => "getTestExecutions",
            ResourceKind::TestPlan => "getTestPlans",
            ResourceKind::CoverableIssue => "getCoverableIssues",
        }
    }
}

/// A key resolved to its numeric id, remembering the kind that matched.
#[derive(Debug, Clone)]
pub struct ResolvedId {
    pub id: String,
    pub kind: ResourceKind,
}

/// Resolves user-facing keys to the numeric ids GraphQL operations expect.
pub struct IssueIdResolver {
    client: Arc<GraphQLClient>,
    cache: RwLock<HashMap<String, ResolvedId>>,
}

impl IssueIdResolver {
    pub fn new(client: Arc<GraphQLClient>) -> Self {
        Self {
            client,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Resolve a key or numeric id to a numeric id string.
    ///
    /// Numeric input is returned unchanged with no upstream call and no
    /// cache write. The hinted kind is queried first, then the remaining
    /// kinds in the fixed fallback order; the first hit wins and is cached.
    pub async fn resolve(
        &self,
        key: &str,
        hint: Option<ResourceKind>,
    ) -> Result<String, XrayError> {
        if NUMERIC_PATTERN.is_match(key) {
            trace!(key, "already numeric, passing through");
            return Ok(key.to_string());
        }

        if !KEY_PATTERN.is_match(key) {
            return Err(XrayError::Validation(format!(
                "'{key}' is neither a numeric id nor a valid issue key"
            )));
        }

        if let Some(hit) = self.cache.read().await.get(key) {
            trace!(key, id = %hit.id, "resolution cache hit");
            return Ok(hit.id.clone());
        }

        for kind in lookup_order(hint) {
            if let Some(id) = self.lookup(key, kind).await? {
                debug!(key, id = %id, entrypoint = kind.entrypoint(), "resolved issue key");
                self.cache
                    .write()
                    .await
                    .insert(key.to_string(), ResolvedId { id: id.clone(), kind });
                return Ok(id);
            }
        }

        Err(XrayError::Resolution(format!(
            "Could not resolve issue key {key} as any known resource kind"
        )))
    }

    /// Resolve a list of keys, preserving order.
    pub async fn resolve_many(
        &self,
        keys: &[String],
        hint: Option<ResourceKind>,
    ) -> Result<Vec<String>, XrayError> {
        let mut resolved = Vec::with_capacity(keys.len());
        for key in keys {
            resolved.push(self.resolve(key, hint).await?);
        }
        Ok(resolved)
    }

    /// Query one kind's entrypoint for the key. `Ok(None)` means this kind
    /// does not know the key; GraphQL-level refusals count as misses so the
    /// fallback chain keeps going, while auth/network failures abort it.
    async fn lookup(&self, key: &str, kind: ResourceKind) -> Result<Option<String>, XrayError> {
        let entrypoint = kind.entrypoint();
        let query = format!(
            "query ResolveIssueKey($jql: String!, $limit: Int!) {{\n    \
             {entrypoint}(jql: $jql, limit: $limit) {{\n        \
             results {{\n            issueId\n        }}\n    }}\n}}"
        );
        // The key matched KEY_PATTERN above; nothing else user-controlled
        // enters the JQL string.
        let variables = json!({
            "jql": format!("key = \"{key}\""),
            "limit": 1,
        });

        let data = match self.client.execute(&query, variables).await {
            Ok(data) => data,
            Err(XrayError::GraphQL { .. }) => return Ok(None),
            Err(other) => return Err(other),
        };

        Ok(extract_issue_id(&data, entrypoint))
    }
}

fn lookup_order(hint: Option<ResourceKind>) -> Vec<ResourceKind> {
    match hint {
        Some(hinted) => {
            let mut order = vec![hinted];
            order.extend(
                ResourceKind::FALLBACK_ORDER
                    .iter()
                    .copied()
                    .filter(|kind| *kind != hinted),
            );
            order
        }
        None => ResourceKind::FALLBACK_ORDER.to_vec(),
    }
}

/// Pull `results[0].issueId` out of the entrypoint's payload. The upstream
/// serializes issue ids as strings, but numbers are tolerated.
fn extract_issue_id(data: &Value, entrypoint: &str) -> Option<String> {
    let first = data.get(entrypoint)?.get("results")?.get(0)?;
    match first.get("issueId")? {
        Value::String(id) => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}
