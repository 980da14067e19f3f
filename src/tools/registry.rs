//! Tool Registry
//!
//! Information Hiding:
//! - Tool storage and lookup implementation hidden
//! - Listing order is registration order
//! - Argument validation runs before every execution

use super::customer::{
    CreateTicketTool, CustomerHistoryTool, GetCustomerTool, ListCustomersTool,
    OpenTicketsReportTool, TicketsByPriorityTool, UpdateCustomerTool,
};
use super::store::CustomerStore;
use super::{Tool, ToolError, ToolMetadata, ToolResult};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    order: Vec<String>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Register a tool. A later tool with the same name replaces the earlier one.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.metadata().name;
        tracing::debug!("[ToolRegistry] Registering tool: {}", name);
        if self.tools.insert(name.clone(), tool).is_none() {
            self.order.push(name);
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn has_tool(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.order.clone()
    }

    pub fn list_tools(&self) -> Vec<ToolMetadata> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| tool.metadata())
            .collect()
    }

    pub async fn call(&self, name: &str, args: Value) -> Result<ToolResult, ToolError> {
        let tool = self
            .get(name)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;

        tool.validate(&args)?;
        tracing::debug!("[ToolRegistry] Calling {} with {}", name, args);
        tool.execute(args).await
    }

    /// The seven customer and ticket tools over `store`.
    pub fn with_store(store: CustomerStore) -> Self {
        let mut registry = Self::new();

        registry.register(Arc::new(GetCustomerTool::new(store.clone())));
        registry.register(Arc::new(ListCustomersTool::new(store.clone())));
        registry.register(Arc::new(UpdateCustomerTool::new(store.clone())));
        registry.register(Arc::new(CreateTicketTool::new(store.clone())));
        registry.register(Arc::new(CustomerHistoryTool::new(store.clone())));
        registry.register(Arc::new(TicketsByPriorityTool::new(store.clone())));
        registry.register(Arc::new(OpenTicketsReportTool::new(store)));

        registry
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
