//! Downstream Service Client
//!
//! Information Hiding:
//! - HTTP transport and JSON-RPC framing hidden behind `RemoteAgent`
//! - Task id generation hidden
//! - reqwest errors folded into a small `TransportError` taxonomy
//!
//! No retries: every call is attempted exactly once.

use crate::protocol::{
    Artifact, CapabilityDescriptor, JsonRpcRequest, JsonRpcResponse, Message, TaskState,
    TaskStatus, DISCOVERY_PATH,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// A call that never produced a usable reply.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransportError {
    #[error("connection failed: {message}")]
    Connect { message: String },

    #[error("request timed out: {message}")]
    Timeout { message: String },

    #[error("HTTP status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed response: {message}")]
    Malformed { message: String },

    #[error("request failed: {message}")]
    Request { message: String },
}

impl TransportError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::Timeout { .. })
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        let message = err.to_string();
        if err.is_timeout() {
            TransportError::Timeout { message }
        } else if err.is_connect() {
            TransportError::Connect { message }
        } else if err.is_decode() {
            TransportError::Malformed { message }
        } else {
            TransportError::Request { message }
        }
    }
}

/// Error reported by the remote node itself inside a delivered reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteError {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<i64>,
    pub message: String,
}

/// What a remote node answered for one submitted task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaskResult {
    Completed {
        task_id: String,
        fragments: Vec<String>,
    },
    Rejected {
        task_id: String,
        error: RemoteError,
    },
}

/// Lenient view of `result`; collaborators do not always send a status.
#[derive(Debug, Deserialize)]
struct TaskReply {
    #[serde(default)]
    status: Option<TaskStatus>,
    #[serde(default)]
    artifacts: Vec<Artifact>,
}

#[async_trait]
pub trait RemoteAgent: Send + Sync {
    fn address(&self) -> &str;

    async fn fetch_capabilities(&self) -> Result<CapabilityDescriptor, TransportError>;

    async fn submit_task(&self, text: &str) -> Result<TaskResult, TransportError>;
}

/// HTTP client for one A2A node.
#[derive(Debug, Clone)]
pub struct AgentClient {
    client: Client,
    base_url: String,
}

impl AgentClient {
    pub fn new(
        base_url: impl Into<String>,
        connect_timeout: Duration,
        request_timeout: Duration,
    ) -> Result<Self, TransportError> {
        // No idle pooling: each call opens and releases its own connection.
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .pool_max_idle_per_host(0)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn task_reply(task_id: String, response: JsonRpcResponse) -> Result<TaskResult, TransportError> {
        if let Some(error) = response.error {
            return Ok(TaskResult::Rejected {
                task_id,
                error: RemoteError {
                    code: Some(error.code),
                    message: error.message,
                },
            });
        }

        let result = response.result.ok_or_else(|| TransportError::Malformed {
            message: "reply has neither result nor error".to_string(),
        })?;

        let reply: TaskReply =
            serde_json::from_value(result).map_err(|e| TransportError::Malformed {
                message: format!("invalid task result: {}", e),
            })?;

        if let Some(status) = reply.status {
            if status.state == TaskState::Failed {
                let message = status
                    .message
                    .as_ref()
                    .and_then(Message::text)
                    .unwrap_or_else(|| "remote task failed".to_string());
                return Ok(TaskResult::Rejected {
                    task_id,
                    error: RemoteError {
                        code: None,
                        message,
                    },
                });
            }
        }

        let fragments = reply
            .artifacts
            .into_iter()
            .flat_map(|artifact| artifact.parts)
            .filter_map(|part| part.text)
            .collect();

        Ok(TaskResult::Completed { task_id, fragments })
    }
}

#[async_trait]
impl RemoteAgent for AgentClient {
    fn address(&self) -> &str {
        &self.base_url
    }

    async fn fetch_capabilities(&self) -> Result<CapabilityDescriptor, TransportError> {
        let url = format!("{}{}", self.base_url, DISCOVERY_PATH);
        tracing::debug!("[AgentClient] GET {}", url);

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| TransportError::Malformed {
            message: format!("invalid capability descriptor: {}", e),
        })
    }

    async fn submit_task(&self, text: &str) -> Result<TaskResult, TransportError> {
        let task_id = Uuid::new_v4().to_string();
        let request = JsonRpcRequest::send_task(&task_id, text);

        tracing::debug!("[AgentClient] tasks/send {} -> {}", task_id, self.base_url);

        let response = self.client.post(&self.base_url).json(&request).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let envelope: JsonRpcResponse =
            serde_json::from_str(&body).map_err(|e| TransportError::Malformed {
                message: format!("invalid JSON-RPC reply: {}", e),
            })?;

        Self::task_reply(task_id, envelope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::CapabilityDescriptor;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> AgentClient {
        AgentClient::new(server.uri(), Duration::from_secs(2), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_submit_task_flattens_artifacts() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/"))
            .and(body_partial_json(json!({
                "jsonrpc": "2.0",
                "method": "tasks/send",
                "params": { "message": { "role": "user", "parts": [ { "text": "hello" } ] } }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "id": "x",
                "result": {
                    "id": "x",
                    "status": { "state": "completed" },
                    "artifacts": [
                        { "parts": [ { "text": "first" }, { "text": "second" } ] },
                        { "parts": [ { "text": "third" } ] }
                    ]
                }
            })))
            .mount(&mock_server)
            .await;

        let result = client_for(&mock_server).submit_task("hello").await.unwrap();

        match result {
            TaskResult::Completed { fragments, .. } => {
                assert_eq!(fragments, vec!["first", "second", "third"]);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_non_success_status_is_transport_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&mock_server)
            .await;

        let err = client_for(&mock_server).submit_task("hi").await.unwrap_err();
        assert_eq!(
            err,
            TransportError::Status {
                status: 503,
                body: "overloaded".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_malformed_body_is_transport_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>nope</html>"))
            .mount(&mock_server)
            .await;

        let err = client_for(&mock_server).submit_task("hi").await.unwrap_err();
        assert!(matches!(err, TransportError::Malformed { .. }));
    }

    #[tokio::test]
    async fn test_missing_result_is_transport_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"jsonrpc": "2.0", "id": "x"})))
            .mount(&mock_server)
            .await;

        let err = client_for(&mock_server).submit_task("hi").await.unwrap_err();
        assert!(matches!(err, TransportError::Malformed { .. }));
    }

    #[tokio::test]
    async fn test_error_object_is_application_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "id": "x",
                "error": { "code": -32601, "message": "Method not found" }
            })))
            .mount(&mock_server)
            .await;

        let result = client_for(&mock_server).submit_task("hi").await.unwrap();
        match result {
            TaskResult::Rejected { error, .. } => {
                assert_eq!(error.code, Some(-32601));
                assert_eq!(error.message, "Method not found");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_failed_task_state_is_application_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "id": "x",
                "result": {
                    "id": "x",
                    "status": {
                        "state": "failed",
                        "message": { "role": "agent", "parts": [ { "text": "tool server unreachable" } ] }
                    },
                    "artifacts": []
                }
            })))
            .mount(&mock_server)
            .await;

        let result = client_for(&mock_server).submit_task("hi").await.unwrap();
        match result {
            TaskResult::Rejected { error, .. } => {
                assert_eq!(error.code, None);
                assert_eq!(error.message, "tool server unreachable");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_slow_reply_times_out() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"jsonrpc": "2.0", "id": "x", "result": {}}))
                    .set_delay(Duration::from_millis(800)),
            )
            .mount(&mock_server)
            .await;

        let client =
            AgentClient::new(mock_server.uri(), Duration::from_millis(100), Duration::from_millis(150))
                .unwrap();
        let err = client.submit_task("hi").await.unwrap_err();
        assert!(err.is_timeout(), "expected timeout, got {:?}", err);
    }

    #[tokio::test]
    async fn test_unreachable_node_is_transport_error() {
        let client = AgentClient::new(
            "http://127.0.0.1:9",
            Duration::from_millis(200),
            Duration::from_millis(500),
        )
        .unwrap();

        let err = client.submit_task("hi").await.unwrap_err();
        assert!(matches!(
            err,
            TransportError::Connect { .. } | TransportError::Timeout { .. } | TransportError::Request { .. }
        ));
    }

    #[tokio::test]
    async fn test_fetch_capabilities() {
        let mock_server = MockServer::start().await;
        let descriptor = CapabilityDescriptor::support(&mock_server.uri());

        Mock::given(method("GET"))
            .and(path("/.well-known/agent-capabilities"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&descriptor))
            .mount(&mock_server)
            .await;

        let fetched = client_for(&mock_server).fetch_capabilities().await.unwrap();
        assert_eq!(fetched, descriptor);
    }

    #[tokio::test]
    async fn test_fetch_capabilities_not_found() {
        let mock_server = MockServer::start().await;

        let err = client_for(&mock_server).fetch_capabilities().await.unwrap_err();
        assert!(matches!(err, TransportError::Status { status: 404, .. }));
    }
}
