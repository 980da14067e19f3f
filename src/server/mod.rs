//! A2A node hosting
//!
//! Every node (router and specialists) is the same axum app: a capability
//! descriptor at the discovery path and a JSON-RPC endpoint at `/`. Only the
//! `TaskHandler` differs.
//!
//! Information Hiding:
//! - JSON-RPC envelope validation and error codes hidden
//! - Task bookkeeping hidden behind `TaskStore`
//! - Handler failures become failed tasks, never transport errors

pub mod task_store;

pub use task_store::{InMemoryTaskStore, TaskStore, TaskStoreError};

use crate::protocol::{
    Artifact, CapabilityDescriptor, CapabilityPublisher, JsonRpcError, JsonRpcRequest,
    JsonRpcResponse, Task, TaskQueryParams, TaskSendParams, DISCOVERY_PATH, INTERNAL_ERROR,
    INVALID_PARAMS, INVALID_REQUEST, JSONRPC_VERSION, METHOD_NOT_FOUND, METHOD_TASKS_GET,
    METHOD_TASKS_SEND, PARSE_ERROR, TASK_NOT_FOUND,
};
use async_trait::async_trait;
use axum::{
    body::Bytes,
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;

/// The work a node does for one `tasks/send`.
#[async_trait]
pub trait TaskHandler: Send + Sync {
    async fn handle(&self, text: &str) -> anyhow::Result<Vec<Artifact>>;
}

#[derive(Clone)]
pub struct NodeState {
    publisher: CapabilityPublisher,
    handler: Arc<dyn TaskHandler>,
    store: Arc<dyn TaskStore>,
}

impl NodeState {
    pub fn new(descriptor: CapabilityDescriptor, handler: Arc<dyn TaskHandler>) -> Self {
        Self {
            publisher: CapabilityPublisher::new(descriptor),
            handler,
            store: Arc::new(InMemoryTaskStore::new()),
        }
    }

    pub fn name(&self) -> String {
        self.publisher.describe().name.clone()
    }
}

pub fn router(state: NodeState) -> Router {
    Router::new()
        .route(DISCOVERY_PATH, get(capabilities))
        .route("/", post(rpc))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the node on an already bound listener in the background. Returns
/// the bound address, which differs from the requested one for port 0.
pub fn serve(listener: TcpListener, state: NodeState) -> std::io::Result<(SocketAddr, JoinHandle<()>)> {
    let address = listener.local_addr()?;
    let name = state.name();

    tracing::info!(node = %name, address = %address, "[Server] Node listening");

    let handle = tokio::spawn(async move {
        if let Err(error) = axum::serve(listener, router(state)).await {
            tracing::error!(node = %name, error = %error, "[Server] Node terminated unexpectedly");
        }
    });

    Ok((address, handle))
}

async fn capabilities(State(state): State<NodeState>) -> Json<CapabilityDescriptor> {
    Json(state.publisher.describe().as_ref().clone())
}

async fn rpc(State(state): State<NodeState>, body: Bytes) -> Json<JsonRpcResponse> {
    let value: Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(error) => {
            tracing::warn!("[Server] Unparseable request body: {}", error);
            return Json(JsonRpcResponse::failure(
                Value::Null,
                JsonRpcError::new(PARSE_ERROR, format!("parse error: {}", error)),
            ));
        }
    };

    let id = value.get("id").cloned().unwrap_or(Value::Null);
    let request: JsonRpcRequest = match serde_json::from_value(value) {
        Ok(request) => request,
        Err(error) => {
            return Json(JsonRpcResponse::failure(
                id,
                JsonRpcError::new(INVALID_REQUEST, format!("invalid request: {}", error)),
            ))
        }
    };

    if request.jsonrpc != JSONRPC_VERSION {
        return Json(JsonRpcResponse::failure(
            request.id,
            JsonRpcError::new(INVALID_REQUEST, "jsonrpc must be \"2.0\""),
        ));
    }

    let id = request.id.clone();
    let reply = match request.method.as_str() {
        METHOD_TASKS_SEND => send_task(&state, request.params).await,
        METHOD_TASKS_GET => get_task(&state, request.params).await,
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

async fn send_task(state: &NodeState, params: Value) -> Result<Value, JsonRpcError> {
    let params: TaskSendParams = match serde_json::from_value(params.clone()) {
        Ok(params) => params,
        Err(error) => {
            // Malformed, but addressable: answer with a failed task under that id.
            let id = params.get("id").and_then(Value::as_str).ok_or_else(|| {
                JsonRpcError::new(INVALID_PARAMS, format!("invalid params: {}", error))
            })?;
            tracing::warn!(task_id = %id, "[Server] Malformed task: {}", error);
            return record(state, id, Task::failed(id, format!("invalid task: {}", error))).await;
        }
    };

    let text = match params.message.text() {
        Some(text) => text,
        None => {
            tracing::warn!(task_id = %params.id, "[Server] Task has no text part");
            let task = Task::failed(&params.id, "message has no text part");
            return record(state, &params.id, task).await;
        }
    };

    reserve(state, &params.id).await?;
    let task = match state.handler.handle(&text).await {
        Ok(artifacts) => {
            tracing::info!(
                task_id = %params.id,
                artifacts = artifacts.len(),
                "[Server] Task completed"
            );
            Task::completed(&params.id, artifacts)
        }
        Err(error) => {
            tracing::warn!(task_id = %params.id, "[Server] Task failed: {:#}", error);
            Task::failed(&params.id, format!("{:#}", error))
        }
    };
    state.store.complete(task.clone()).await;

    to_result(&task)
}

/// Claim `id` before any work runs under it.
async fn reserve(state: &NodeState, id: &str) -> Result<(), JsonRpcError> {
    state
        .store
        .reserve(id)
        .await
        .map_err(|e| JsonRpcError::new(INVALID_PARAMS, e.to_string()))
}

/// Reserve and immediately settle a task that needs no handler run.
async fn record(state: &NodeState, id: &str, task: Task) -> Result<Value, JsonRpcError> {
    reserve(state, id).await?;
    state.store.complete(task.clone()).await;
    to_result(&task)
}

fn to_result(task: &Task) -> Result<Value, JsonRpcError> {
    serde_json::to_value(task).map_err(|e| JsonRpcError::new(INTERNAL_ERROR, e.to_string()))
}

async fn get_task(state: &NodeState, params: Value) -> Result<Value, JsonRpcError> {
    let params: TaskQueryParams = serde_json::from_value(params)
        .map_err(|e| JsonRpcError::new(INVALID_PARAMS, format!("invalid params: {}", e)))?;

    let task = state.store.get(&params.id).await.ok_or_else(|| {
        JsonRpcError::new(TASK_NOT_FOUND, format!("task '{}' not found", params.id))
    })?;

    to_result(&task)
}
