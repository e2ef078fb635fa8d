//! stdio JSON-RPC loop
//!
//! Reads newline-delimited JSON-RPC messages from stdin and writes
//! responses to stdout. stdout carries protocol traffic only; all logging
//! goes to stderr. Tool results are wrapped as MCP text content whose
//! payload is either the success projection or the error envelope.

pub mod protocol;

use serde_json::{json, Value};
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, info};

use crate::facade::{self, ToolContext};
use crate::server::protocol::{
    InitializeResult, JsonRpcRequest, JsonRpcResponse, ServerCapabilities, ServerInfo,
    ToolCallParams, ToolsCapability, ToolsListResult, INVALID_PARAMS, METHOD_NOT_FOUND,
    PARSE_ERROR, PROTOCOL_VERSION,
};

const SERVER_NAME: &str = "xray-mcp";
const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Run the stdio loop until stdin closes.
pub async fn run(ctx: ToolContext) -> io::Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let reader = BufReader::new(stdin);
    let mut lines = reader.lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        debug!("<- {line}");

        let request: JsonRpcRequest = match serde_json::from_str(line) {
            Ok(request) => request,
            Err(e) => {
                let response =
                    JsonRpcResponse::error(None, PARSE_ERROR, format!("Parse error: {e}"));
                write_response(&mut stdout, &response).await?;
                continue;
            }
        };

        let is_notification = request.id.is_none();
        let response = handle_request(&ctx, request).await;

        if is_notification {
            continue;
        }
        if let Some(response) = response {
            write_response(&mut stdout, &response).await?;
        }
    }

    info!("stdin closed, shutting down");
    Ok(())
}

async fn handle_request(ctx: &ToolContext, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
    let id = request.id.clone();

    match request.method.as_str() {
        "initialize" => {
            info!("client connected");
            let result = InitializeResult {
                protocol_version: PROTOCOL_VERSION.to_string(),
                capabilities: ServerCapabilities {
                    tools: ToolsCapability {
                        list_changed: false,
                    },
                },
                server_info: ServerInfo {
                    name: SERVER_NAME.to_string(),
                    version: SERVER_VERSION.to_string(),
                },
            };
            Some(JsonRpcResponse::success(
                id,
                serde_json::to_value(result).expect("initialize result serializes"),
            ))
        }

        "notifications/initialized" => None,

        "tools/list" => {
            let result = ToolsListResult {
                tools: facade::tool_definitions(),
            };
            Some(JsonRpcResponse::success(
                id,
                serde_json::to_value(result).expect("tool list serializes"),
            ))
        }

        "tools/call" => {
            let params: ToolCallParams = match request
                .params
                .and_then(|p| serde_json::from_value(p).ok())
            {
                Some(params) => params,
                None => {
                    return Some(JsonRpcResponse::error(
                        id,
                        INVALID_PARAMS,
                        "Invalid params: expected {name, arguments}",
                    ))
                }
            };

            let arguments = params.arguments.unwrap_or_else(|| json!({}));
            let outcome = facade::dispatch(ctx, &params.name, &arguments).await;
            Some(JsonRpcResponse::success(id, wrap_tool_result(&outcome)))
        }

        "ping" => Some(JsonRpcResponse::success(id, json!({}))),

        other => {
            debug!("unknown method: {other}");
            Some(JsonRpcResponse::error(
                id,
                METHOD_NOT_FOUND,
                format!("Method not found: {other}"),
            ))
        }
    }
}

/// Wrap a tool outcome as MCP text content. The payload text is the JSON
/// the facade produced: either the success projection or the envelope.
fn wrap_tool_result(outcome: &Value) -> Value {
    let is_error = outcome
        .as_object()
        .map(|obj| obj.len() == 2 && obj.contains_key("error") && obj.contains_key("type"))
        .unwrap_or(false);

    json!({
        "content": [{
            "type": "text",
            "text": outcome.to_string(),
        }],
        "isError": is_error,
    })
}

async fn write_response(stdout: &mut io::Stdout, response: &JsonRpcResponse) -> io::Result<()> {
    let text = serde_json::to_string(response).expect("response serializes");
    debug!("-> {text}");
    stdout.write_all(text.as_bytes()).await?;
    stdout.write_all(b"\n").await?;
    stdout.flush().await
}
