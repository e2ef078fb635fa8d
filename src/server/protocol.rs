//! JSON-RPC 2.0 message types for the stdio transport

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::facade::ToolDefinition;

pub const JSONRPC_VERSION: &str = "2.0";
pub const PROTOCOL_VERSION: &str = "2024-11-05";

pub const PARSE_ERROR: i32 = -32700;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;

#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: Option<String>,
    pub id: Option<Value>,
    pub method: String,
    pub params: Option<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RpcError {
    pub code: i32,
    pub message: String,
}

impl JsonRpcResponse {
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: id.unwrap_or(Value::Null),
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: Option<Value>, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: id.unwrap_or(Value::Null),
            result: None,
            error: Some(RpcError {
                code,
                message: message.into(),
            }),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    pub protocol_version: String,
    pub capabilities: ServerCapabilities,
    pub server_info: ServerInfo,
}

#[derive(Debug, Serialize)]
pub struct ServerCapabilities {
    pub tools: ToolsCapability,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolsCapability {
    pub list_changed: bool,
}

#[derive(Debug, Serialize)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Serialize)]
pub struct ToolsListResult {
    pub tools: Vec<ToolDefinition>,
}

#[derive(Debug, Deserialize)]
pub struct ToolCallParams {
    pub name: String,
    pub arguments: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_parses_without_jsonrpc_field() {
        let request: JsonRpcRequest =
            serde_json::from_str(r#"{"id": 1, "method": "ping"}"#).unwrap();
        assert_eq!(request.method, "ping");
        assert_eq!(request.id, Some(json!(1)));
    }

    #[test]
    fn success_response_omits_error_field() {
        let response = JsonRpcResponse::success(Some(json!(3)), json!({"ok": true}));
        let text = serde_json::to_string(&response).unwrap();
        assert!(!text.contains("\"error\""));
        assert!(text.contains("\"jsonrpc\":\"2.0\""));
    }

    #[test]
    fn error_response_omits_result_field() {
        let response = JsonRpcResponse::error(None, METHOD_NOT_FOUND, "nope");
        let text = serde_json::to_string(&response).unwrap();
        assert!(!text.contains("\"result\""));
        assert!(text.contains("-32601"));
    }

    #[test]
    fn tool_call_params_accept_missing_arguments() {
        let params: ToolCallParams =
            serde_json::from_value(json!({"name": "get_test"})).unwrap();
        assert!(params.arguments.is_none());
    }
}
