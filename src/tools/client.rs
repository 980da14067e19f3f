//! Tool client - JSON-RPC over HTTP to the tool server
//!
//! Information Hiding:
//! - Request id counter hidden
//! - MCP content unwrapping hidden; callers get the tool's envelope back

use super::server::RPC_PATH;
use super::{ToolError, ToolResult};
use crate::client::TransportError;
use crate::protocol::{JsonRpcRequest, JsonRpcResponse};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_input_schema", rename = "inputSchema")]
    pub input_schema: Value,
}

fn default_input_schema() -> Value {
    json!({
        "type": "object",
        "properties": {}
    })
}

pub struct ToolClient {
    client: Client,
    endpoint: String,
    request_id: AtomicU64,
}

impl ToolClient {
    pub fn new(
        base_url: &str,
        connect_timeout: Duration,
        request_timeout: Duration,
    ) -> Result<Self, ToolError> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .build()
            .map_err(TransportError::from)?;

        Ok(Self {
            client,
            endpoint: format!("{}{}", base_url.trim_end_matches('/'), RPC_PATH),
            request_id: AtomicU64::new(0),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, ToolError> {
        let result = self.request("tools/list", json!({})).await?;
        let tools = result.get("tools").cloned().unwrap_or_else(|| json!([]));
        serde_json::from_value(tools).map_err(|e| ToolError::Malformed(e.to_string()))
    }

    /// Call `name` and return its envelope. A `success: false` envelope is
    /// returned as `Ok`.
    pub async fn call_tool(&self, name: &str, arguments: Value) -> Result<ToolResult, ToolError> {
        tracing::debug!("[ToolClient] tools/call {} {}", name, arguments);

        let result = self
            .request("tools/call", json!({ "name": name, "arguments": arguments }))
            .await?;

        let text = result["content"]
            .as_array()
            .and_then(|items| items.iter().find_map(|item| item["text"].as_str()))
            .ok_or_else(|| ToolError::Malformed("call result has no text content".to_string()))?;

        serde_json::from_str(text)
            .map_err(|e| ToolError::Malformed(format!("tool envelope is not JSON: {}", e)))
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value, ToolError> {
        let request = JsonRpcRequest::new(method, params, json!(self.next_id()));

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(TransportError::from)?;

        let status = response.status();
        let body = response.text().await.map_err(TransportError::from)?;
        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            }
            .into());
        }

        let reply: JsonRpcResponse =
            serde_json::from_str(&body).map_err(|e| ToolError::Malformed(e.to_string()))?;

        if let Some(error) = reply.error {
            return Err(ToolError::Rpc {
                code: error.code,
                message: error.message,
            });
        }
        reply
            .result
            .ok_or_else(|| ToolError::Malformed("reply has neither result nor error".to_string()))
    }

    fn next_id(&self) -> u64 {
        self.request_id.fetch_add(1, Ordering::Relaxed) + 1
    }
}
