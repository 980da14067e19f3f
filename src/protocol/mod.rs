//! A2A wire protocol
//!
//! JSON-RPC 2.0 envelopes carrying `tasks/send` and `tasks/get` between
//! nodes, plus the capability descriptor every node publishes at
//! `/.well-known/agent-capabilities`.

pub mod capability;

pub use capability::{
    AgentCapabilities, CapabilityDescriptor, CapabilityPublisher, SkillDescriptor,
    SubordinateAgent, DISCOVERY_PATH,
};

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub const JSONRPC_VERSION: &str = "2.0";

pub const METHOD_TASKS_SEND: &str = "tasks/send";
pub const METHOD_TASKS_GET: &str = "tasks/get";

pub const PARSE_ERROR: i64 = -32700;
pub const INVALID_REQUEST: i64 = -32600;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;
pub const INTERNAL_ERROR: i64 = -32603;
pub const TASK_NOT_FOUND: i64 = -32001;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub params: Value,
    #[serde(default)]
    pub id: Value,
}

impl JsonRpcRequest {
    pub fn new(method: impl Into<String>, params: Value, id: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.into(),
            params,
            id,
        }
    }

    /// Build a `tasks/send` envelope. The task id doubles as the request id.
    pub fn send_task(task_id: &str, text: impl Into<String>) -> Self {
        Self::new(
            METHOD_TASKS_SEND,
            json!({ "id": task_id, "message": Message::user(text) }),
            Value::String(task_id.to_string()),
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Value, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSendParams {
    pub id: String,
    pub message: Message,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskQueryParams {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub parts: Vec<Part>,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            parts: vec![Part::text(text)],
        }
    }

    pub fn agent(text: impl Into<String>) -> Self {
        Self {
            role: "agent".to_string(),
            parts: vec![Part::text(text)],
        }
    }

    /// Text parts joined with newlines; `None` when the message carries no text.
    pub fn text(&self) -> Option<String> {
        let texts: Vec<&str> = self
            .parts
            .iter()
            .filter_map(|part| part.text.as_deref())
            .collect();

        if texts.is_empty() {
            None
        } else {
            Some(texts.join("\n"))
        }
    }
}

/// A message or artifact fragment. Only text parts are produced by this
/// crate; parts without text are tolerated on the way in and skipped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Artifact {
    pub fn text(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            parts: vec![Part::text(text)],
        }
    }

    pub fn from_fragments(name: impl Into<String>, fragments: Vec<String>) -> Self {
        Self {
            name: Some(name.into()),
            parts: fragments.into_iter().map(Part::text).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    Submitted,
    Working,
    Completed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskStatus {
    pub state: TaskState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub status: TaskStatus,
    #[serde(default)]
    pub artifacts: Vec<Artifact>,
}

impl Task {
    /// Accepted and being handled; no artifacts yet.
    pub fn working(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: TaskStatus {
                state: TaskState::Working,
                message: None,
            },
            artifacts: Vec::new(),
        }
    }

    pub fn completed(id: impl Into<String>, artifacts: Vec<Artifact>) -> Self {
        Self {
            id: id.into(),
            status: TaskStatus {
                state: TaskState::Completed,
                message: None,
            },
            artifacts,
        }
    }

    pub fn failed(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: TaskStatus {
                state: TaskState::Failed,
                message: Some(Message::agent(reason)),
            },
            artifacts: Vec::new(),
        }
    }

    /// Every text part of every artifact, in order.
    pub fn fragments(&self) -> Vec<String> {
        self.artifacts
            .iter()
            .flat_map(|artifact| artifact.parts.iter())
            .filter_map(|part| part.text.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_send_task_envelope_shape() {
        let request = JsonRpcRequest::send_task("task-1", "Get customer 5");
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(
            value,
            json!({
                "jsonrpc": "2.0",
                "method": "tasks/send",
                "params": {
                    "id": "task-1",
                    "message": { "role": "user", "parts": [ { "text": "Get customer 5" } ] }
                },
                "id": "task-1"
            })
        );
    }

    #[test]
    fn test_task_fragments_flatten_artifacts_in_order() {
        let task: Task = serde_json::from_value(json!({
            "id": "t",
            "status": { "state": "completed" },
            "artifacts": [
                { "parts": [ { "text": "one" }, { "kind": "data" } ] },
                { "name": "second", "parts": [ { "text": "two" } ] }
            ]
        }))
        .unwrap();

        assert_eq!(task.fragments(), vec!["one".to_string(), "two".to_string()]);
    }

    #[test]
    fn test_failed_task_carries_reason() {
        let task = Task::failed("t", "missing message text");
        assert_eq!(task.status.state, TaskState::Failed);
        assert_eq!(
            task.status.message.and_then(|m| m.text()).as_deref(),
            Some("missing message text")
        );
        assert!(task.artifacts.is_empty());
    }
}
