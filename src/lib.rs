//! xray-mcp: MCP bridge for Jira Xray test management
//!
//! Exposes Xray's GraphQL API to tool-calling agents over stdio. The core
//! is the shared infrastructure every tool rides on: credential config,
//! bearer-token lifecycle with single-flight refresh, GraphQL dispatch
//! with one 401 retry, whitelist JQL validation, and issue-key resolution
//! with a cross-kind fallback chain.

pub mod auth;
pub mod client;
pub mod config;
pub mod errors;
pub mod execution_tools;
pub mod facade;
pub mod jql;
pub mod resolve;
pub mod server;
pub mod test_tools;
pub mod utility_tools;

// Re-export the pieces the binary and tests wire together.
pub use auth::AuthManager;
pub use client::transport::{FakeTransport, HttpTransport, Transport};
pub use client::GraphQLClient;
pub use config::XrayConfig;
pub use errors::XrayError;
pub use facade::{dispatch, tool_definitions, ToolContext};
pub use jql::validate_jql;
pub use resolve::{IssueIdResolver, ResourceKind};
