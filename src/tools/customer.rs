//! Customer and ticket tools
//!
//! One `Tool` per store operation. Each wraps a `CustomerStore` handle and
//! turns the store's answer into a result envelope.

use super::store::{CustomerStore, CustomerUpdate, StoreError};
use super::{int_arg, str_arg, Tool, ToolError, ToolMetadata, ToolParameter, ToolResult};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};

const DEFAULT_LIST_LIMIT: i64 = 10;

/// Application errors become `success: false`; anything else propagates.
fn envelope<T: Serialize>(outcome: Result<T, StoreError>) -> Result<ToolResult, ToolError> {
    match outcome {
        Ok(data) => ToolResult::success(data),
        Err(error) if error.is_application() => Ok(ToolResult::failure(error.to_string())),
        Err(error) => Err(error.into()),
    }
}

/// Store calls are synchronous SQLite and run on the blocking pool.
async fn on_store<T, F>(store: &CustomerStore, op: F) -> Result<T, StoreError>
where
    F: FnOnce(&CustomerStore) -> Result<T, StoreError> + Send + 'static,
    T: Send + 'static,
{
    let store = store.clone();
    tokio::task::spawn_blocking(move || op(&store))
        .await
        .map_err(|e| StoreError::Blocking(e.to_string()))?
}

pub struct GetCustomerTool {
    store: CustomerStore,
}

impl GetCustomerTool {
    pub fn new(store: CustomerStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for GetCustomerTool {
    fn metadata(&self) -> ToolMetadata {
        ToolMetadata {
            name: "get_customer".to_string(),
            description: "Get customer information by ID.".to_string(),
            parameters: vec![ToolParameter::new(
                "customer_id",
                "integer",
                "The unique identifier of the customer",
                true,
            )],
        }
    }

    fn validate(&self, args: &Value) -> Result<(), ToolError> {
        int_arg(args, "customer_id").map(|_| ())
    }

    async fn execute(&self, args: Value) -> Result<ToolResult, ToolError> {
        let id = int_arg(&args, "customer_id")?;
        envelope(
            on_store(&self.store, move |store| store.get_customer(id))
                .await
                .map(|customer| json!({ "customer": customer })),
        )
    }
}

pub struct ListCustomersTool {
    store: CustomerStore,
}

impl ListCustomersTool {
    pub fn new(store: CustomerStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for ListCustomersTool {
    fn metadata(&self) -> ToolMetadata {
        ToolMetadata {
            name: "list_customers".to_string(),
            description: "List customers with optional status filter.".to_string(),
            parameters: vec![
                ToolParameter::new("status", "string", "Filter by 'active' or 'disabled'", false),
                ToolParameter::new("limit", "integer", "Maximum number to return (default 10)", false),
            ],
        }
    }

    async fn execute(&self, args: Value) -> Result<ToolResult, ToolError> {
        let status = str_arg(&args, "status")?.map(str::to_string);
        let limit = if args["limit"].is_null() {
            DEFAULT_LIST_LIMIT
        } else {
            int_arg(&args, "limit")?
        };

        envelope(
            on_store(&self.store, move |store| store.list_customers(status.as_deref(), limit))
                .await
                .map(|customers| json!({ "count": customers.len(), "customers": customers })),
        )
    }
}

pub struct UpdateCustomerTool {
    store: CustomerStore,
}

impl UpdateCustomerTool {
    pub fn new(store: CustomerStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for UpdateCustomerTool {
    fn metadata(&self) -> ToolMetadata {
        ToolMetadata {
            name: "update_customer".to_string(),
            description: "Update customer information.".to_string(),
            parameters: vec![
                ToolParameter::new("customer_id", "integer", "The customer ID to update", true),
                ToolParameter::new("email", "string", "New email address", false),
                ToolParameter::new("phone", "string", "New phone number", false),
                ToolParameter::new("name", "string", "New name", false),
                ToolParameter::new("status", "string", "New status 'active' or 'disabled'", false),
            ],
        }
    }

    fn validate(&self, args: &Value) -> Result<(), ToolError> {
        int_arg(args, "customer_id")?;
        for field in ["email", "phone", "name", "status"] {
            str_arg(args, field)?;
        }
        Ok(())
    }

    async fn execute(&self, args: Value) -> Result<ToolResult, ToolError> {
        let id = int_arg(&args, "customer_id")?;
        let owned = |field: &str| -> Result<Option<String>, ToolError> {
            Ok(str_arg(&args, field)?.map(str::to_string))
        };
        let update = CustomerUpdate {
            email: owned("email")?,
            phone: owned("phone")?,
            name: owned("name")?,
            status: owned("status")?,
        };

        envelope(on_store(&self.store, move |store| store.update_customer(id, &update)).await)
    }
}

pub struct CreateTicketTool {
    store: CustomerStore,
}

impl CreateTicketTool {
    pub fn new(store: CustomerStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for CreateTicketTool {
    fn metadata(&self) -> ToolMetadata {
        ToolMetadata {
            name: "create_ticket".to_string(),
            description: "Create a new support ticket.".to_string(),
            parameters: vec![
                ToolParameter::new("customer_id", "integer", "The customer ID", true),
                ToolParameter::new("issue", "string", "Description of the issue", true),
                ToolParameter::new("priority", "string", "'low', 'medium', or 'high' (default: medium)", false),
            ],
        }
    }

    fn validate(&self, args: &Value) -> Result<(), ToolError> {
        int_arg(args, "customer_id")?;
        if str_arg(args, "issue")?.is_none() {
            return Err(ToolError::InvalidArguments("'issue' is required".to_string()));
        }
        Ok(())
    }

    async fn execute(&self, args: Value) -> Result<ToolResult, ToolError> {
        self.validate(&args)?;
        let customer_id = int_arg(&args, "customer_id")?;
        let issue = str_arg(&args, "issue")?.unwrap_or_default().to_string();
        let priority = str_arg(&args, "priority")?.unwrap_or("medium").to_string();

        envelope(
            on_store(&self.store, move |store| store.create_ticket(customer_id, &issue, &priority))
                .await,
        )
    }
}

pub struct CustomerHistoryTool {
    store: CustomerStore,
}

impl CustomerHistoryTool {
    pub fn new(store: CustomerStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for CustomerHistoryTool {
    fn metadata(&self) -> ToolMetadata {
        ToolMetadata {
            name: "get_customer_history".to_string(),
            description: "Get ticket history for a customer.".to_string(),
            parameters: vec![ToolParameter::new("customer_id", "integer", "The customer ID", true)],
        }
    }

    fn validate(&self, args: &Value) -> Result<(), ToolError> {
        int_arg(args, "customer_id").map(|_| ())
    }

    async fn execute(&self, args: Value) -> Result<ToolResult, ToolError> {
        let id = int_arg(&args, "customer_id")?;
        envelope(on_store(&self.store, move |store| store.get_customer_history(id)).await)
    }
}

pub struct TicketsByPriorityTool {
    store: CustomerStore,
}

impl TicketsByPriorityTool {
    pub fn new(store: CustomerStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for TicketsByPriorityTool {
    fn metadata(&self) -> ToolMetadata {
        ToolMetadata {
            name: "get_tickets_by_priority".to_string(),
            description: "Get tickets filtered by priority.".to_string(),
            parameters: vec![
                ToolParameter::new("priority", "string", "'low', 'medium', or 'high'", true),
                ToolParameter::new("status", "string", "Filter by 'open', 'in_progress', 'resolved'", false),
            ],
        }
    }

    fn validate(&self, args: &Value) -> Result<(), ToolError> {
        match str_arg(args, "priority")? {
            Some(_) => Ok(()),
            None => Err(ToolError::InvalidArguments("'priority' is required".to_string())),
        }
    }

    async fn execute(&self, args: Value) -> Result<ToolResult, ToolError> {
        self.validate(&args)?;
        let priority = str_arg(&args, "priority")?.unwrap_or_default().to_string();
        let status = str_arg(&args, "status")?.map(str::to_string);

        envelope(
            on_store(&self.store, move |store| {
                store.get_tickets_by_priority(&priority, status.as_deref())
            })
            .await
            .map(|tickets| json!({ "count": tickets.len(), "tickets": tickets })),
        )
    }
}

pub struct OpenTicketsReportTool {
    store: CustomerStore,
}

impl OpenTicketsReportTool {
    pub fn new(store: CustomerStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for OpenTicketsReportTool {
    fn metadata(&self) -> ToolMetadata {
        ToolMetadata {
            name: "get_active_customers_with_open_tickets".to_string(),
            description: "Get all active customers who have open tickets.".to_string(),
            parameters: vec![],
        }
    }

    async fn execute(&self, _args: Value) -> Result<ToolResult, ToolError> {
        envelope(
            on_store(&self.store, |store| store.get_active_customers_with_open_tickets())
                .await
                .map(|customers| json!({ "total_customers": customers.len(), "customers": customers })),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> CustomerStore {
        CustomerStore::in_memory().unwrap()
    }

    #[tokio::test]
    async fn test_get_customer_tool() {
        let tool = GetCustomerTool::new(store());
        let result = tool.execute(json!({ "customer_id": 5 })).await.unwrap();

        assert!(result.success);
        assert_eq!(result.get("customer").unwrap()["name"], "Charlie Brown");
    }

    #[tokio::test]
    async fn test_missing_customer_is_failure_envelope() {
        let tool = GetCustomerTool::new(store());
        let result = tool.execute(json!({ "customer_id": 99 })).await.unwrap();

        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("Customer 99 not found"));
    }

    #[tokio::test]
    async fn test_missing_argument_is_error() {
        let tool = CustomerHistoryTool::new(store());
        let error = tool.execute(json!({})).await.unwrap_err();
        assert!(matches!(error, ToolError::InvalidArguments(_)));
    }

    #[tokio::test]
    async fn test_list_customers_default_limit() {
        let tool = ListCustomersTool::new(store());
        let result = tool.execute(json!({})).await.unwrap();
        assert_eq!(result.get("count"), Some(&json!(7)));

        let active = tool.execute(json!({ "status": "active", "limit": 2 })).await.unwrap();
        assert_eq!(active.get("count"), Some(&json!(2)));
    }

    #[tokio::test]
    async fn test_update_without_fields_is_failure_envelope() {
        let tool = UpdateCustomerTool::new(store());
        let result = tool.execute(json!({ "customer_id": 1 })).await.unwrap();

        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("No fields to update"));
    }

    #[tokio::test]
    async fn test_create_ticket_defaults_to_medium() {
        let tool = CreateTicketTool::new(store());
        let result = tool
            .execute(json!({ "customer_id": 4, "issue": "Export broken" }))
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.get("ticket").unwrap()["priority"], "medium");
        assert_eq!(result.get("customer_name"), Some(&json!("Alice Williams")));
    }

    #[tokio::test]
    async fn test_open_tickets_report() {
        let tool = OpenTicketsReportTool::new(store());
        let result = tool.execute(json!({})).await.unwrap();
        assert_eq!(result.get("total_customers"), Some(&json!(4)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_calls_share_one_store() {
        let store = store();
        let by_priority = TicketsByPriorityTool::new(store.clone());
        let count = |result: ToolResult| result.get("count").and_then(Value::as_u64).unwrap();
        let before = count(by_priority.execute(json!({ "priority": "low" })).await.unwrap());

        let creates = (0..8).map(|n| {
            let tool = CreateTicketTool::new(store.clone());
            tokio::spawn(async move {
                tool.execute(json!({ "customer_id": 1, "issue": format!("issue {}", n), "priority": "low" }))
                    .await
            })
        });
        for created in futures::future::join_all(creates).await {
            assert!(created.unwrap().unwrap().success);
        }

        let after = count(by_priority.execute(json!({ "priority": "low" })).await.unwrap());
        assert_eq!(after, before + 8);
    }
}
