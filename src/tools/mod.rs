//! Tool System - customer and ticket operations behind one RPC surface
//!
//! Information Hiding:
//! - Tool execution details hidden behind trait
//! - Tool parameters and schemas hidden in implementations
//! - Registry implementation details hidden from consumers
//! - Store failures split into result envelopes and internal errors

pub mod client;
pub mod customer;
pub mod registry;
pub mod server;
pub mod store;

pub use client::{ToolClient, ToolDescriptor};
pub use registry::ToolRegistry;
pub use store::{CustomerStore, StoreError};

use crate::client::TransportError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("unknown tool '{0}'")]
    UnknownTool(String),

    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("tool server error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("malformed tool reply: {0}")]
    Malformed(String),
}

/// Tool parameter schema definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolParameter {
    pub name: String,
    pub param_type: String,
    pub description: String,
    pub required: bool,
}

impl ToolParameter {
    pub fn new(name: &str, param_type: &str, description: &str, required: bool) -> Self {
        Self {
            name: name.to_string(),
            param_type: param_type.to_string(),
            description: description.to_string(),
            required,
        }
    }
}

/// Tool metadata - describes what the tool does and how to call it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolMetadata {
    pub name: String,
    pub description: String,
    pub parameters: Vec<ToolParameter>,
}

impl ToolMetadata {
    /// JSON schema for the parameters, as published by `tools/list`.
    pub fn input_schema(&self) -> Value {
        let mut properties = Map::new();
        for param in &self.parameters {
            properties.insert(
                param.name.clone(),
                json!({ "type": param.param_type, "description": param.description }),
            );
        }
        let required: Vec<&str> = self
            .parameters
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

impl fmt::Display for ToolMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.description)
    }
}

/// The `{"success": ..., ...}` envelope every tool returns.
///
/// Application failures (unknown customer, nothing to update) are
/// `success: false` results, not errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(flatten)]
    pub data: Map<String, Value>,
}

impl ToolResult {
    /// `data` must serialize to a JSON object; its fields sit beside `success`.
    pub fn success(data: impl Serialize) -> Result<Self, ToolError> {
        match serde_json::to_value(data) {
            Ok(Value::Object(data)) => Ok(Self {
                success: true,
                error: None,
                data,
            }),
            Ok(other) => Err(ToolError::Malformed(format!(
                "tool payload must be an object, got {}",
                other
            ))),
            Err(e) => Err(ToolError::Malformed(e.to_string())),
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            data: Map::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }
}

/// Tool trait - All tools must implement this
#[async_trait]
pub trait Tool: Send + Sync {
    fn metadata(&self) -> ToolMetadata;

    /// Check arguments before execution.
    fn validate(&self, _args: &Value) -> Result<(), ToolError> {
        Ok(())
    }

    async fn execute(&self, args: Value) -> Result<ToolResult, ToolError>;
}

/// Required integer argument.
pub(crate) fn int_arg(args: &Value, name: &str) -> Result<i64, ToolError> {
    match &args[name] {
        Value::Number(n) => n
            .as_i64()
            .ok_or_else(|| ToolError::InvalidArguments(format!("'{}' must be an integer", name))),
        Value::String(s) => s
            .trim()
            .parse()
            .map_err(|_| ToolError::InvalidArguments(format!("'{}' must be an integer", name))),
        Value::Null => Err(ToolError::InvalidArguments(format!("'{}' is required", name))),
        _ => Err(ToolError::InvalidArguments(format!("'{}' must be an integer", name))),
    }
}

/// Optional string argument; null and empty strings are absent.
pub(crate) fn str_arg<'a>(args: &'a Value, name: &str) -> Result<Option<&'a str>, ToolError> {
    match &args[name] {
        Value::Null => Ok(None),
        Value::String(s) if s.is_empty() => Ok(None),
        Value::String(s) => Ok(Some(s.as_str())),
        _ => Err(ToolError::InvalidArguments(format!("'{}' must be a string", name))),
    }
}
