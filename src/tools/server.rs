//! Tool server - JSON-RPC over HTTP in front of the tool registry
//!
//! `POST /rpc` accepts `initialize`, `tools/list` and `tools/call`. Call
//! results use the MCP content shape: the tool's envelope serialized into a
//! single text item.

use super::registry::ToolRegistry;
use super::ToolError;
use crate::protocol::{
    JsonRpcError, JsonRpcRequest, JsonRpcResponse, INTERNAL_ERROR, INVALID_PARAMS,
    INVALID_REQUEST, METHOD_NOT_FOUND, PARSE_ERROR,
};
use axum::{body::Bytes, extract::State, routing::post, Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;

pub const RPC_PATH: &str = "/rpc";
pub const SERVER_NAME: &str = "CustomerSupportTools";

#[derive(Debug, Deserialize)]
struct CallParams {
    name: String,
    #[serde(default)]
    arguments: Value,
}

pub fn router(registry: Arc<ToolRegistry>) -> Router {
    Router::new()
        .route(RPC_PATH, post(rpc))
        .layer(TraceLayer::new_for_http())
        .with_state(registry)
}

/// Serve the tool registry on an already bound listener in the background.
pub fn serve(
    listener: TcpListener,
    registry: Arc<ToolRegistry>,
) -> std::io::Result<(SocketAddr, JoinHandle<()>)> {
    let address = listener.local_addr()?;

    tracing::info!(
        address = %address,
        tools = registry.tool_names().len(),
        "[ToolServer] Listening"
    );

    let handle = tokio::spawn(async move {
        if let Err(error) = axum::serve(listener, router(registry)).await {
            tracing::error!(error = %error, "[ToolServer] Terminated unexpectedly");
        }
    });

    Ok((address, handle))
}

async fn rpc(State(registry): State<Arc<ToolRegistry>>, body: Bytes) -> Json<JsonRpcResponse> {
    let request: JsonRpcRequest = match serde_json::from_slice::<Value>(&body) {
        Err(error) => {
            return Json(JsonRpcResponse::failure(
                Value::Null,
                JsonRpcError::new(PARSE_ERROR, format!("parse error: {}", error)),
            ))
        }
        Ok(value) => {
            let id = value.get("id").cloned().unwrap_or(Value::Null);
            match serde_json::from_value(value) {
                Ok(request) => request,
                Err(error) => {
                    return Json(JsonRpcResponse::failure(
                        id,
                        JsonRpcError::new(INVALID_REQUEST, format!("invalid request: {}", error)),
                    ))
                }
            }
        }
    };

    let id = request.id.clone();
    let reply = match request.method.as_str() {
        "initialize" => Ok(json!({
            "serverInfo": { "name": SERVER_NAME, "version": env!("CARGO_PKG_VERSION") },
            "capabilities": { "tools": {} }
        })),
        "tools/list" => Ok(list_tools(&registry)),
        "tools/call" => call_tool(&registry, request.params).await,
        other => Err(JsonRpcError::new(
            METHOD_NOT_FOUND,
            format!("method '{}' not found", other),
        )),
    };

    Json(match reply {
        Ok(result) => JsonRpcResponse::success(id, result),
        Err(error) => JsonRpcResponse::failure(id, error),
    })
}

fn list_tools(registry: &ToolRegistry) -> Value {
    let tools: Vec<Value> = registry
        .list_tools()
        .iter()
        .map(|metadata| {
            json!({
                "name": metadata.name,
                "description": metadata.description,
                "inputSchema": metadata.input_schema(),
            })
        })
        .collect();

    json!({ "tools": tools })
}

async fn call_tool(registry: &ToolRegistry, params: Value) -> Result<Value, JsonRpcError> {
    let params: CallParams = serde_json::from_value(params)
        .map_err(|e| JsonRpcError::new(INVALID_PARAMS, format!("invalid params: {}", e)))?;

    tracing::info!("[ToolServer] tools/call {}", params.name);

    let result = registry
        .call(&params.name, params.arguments)
        .await
        .map_err(|error| {
            tracing::warn!("[ToolServer] {} failed: {}", params.name, error);
            match error {
                ToolError::UnknownTool(_) | ToolError::InvalidArguments(_) => {
                    JsonRpcError::new(INVALID_PARAMS, error.to_string())
                }
                other => JsonRpcError::new(INTERNAL_ERROR, other.to_string()),
            }
        })?;

    let text = serde_json::to_string(&result)
        .map_err(|e| JsonRpcError::new(INTERNAL_ERROR, e.to_string()))?;

    Ok(json!({
        "content": [ { "type": "text", "text": text } ],
        "isError": !result.success,
    }))
}
