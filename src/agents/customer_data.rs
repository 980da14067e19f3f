//! Customer-data specialist - turns a task brief into tool calls
//!
//! Information Hiding:
//! - Intent to tool mapping hidden
//! - Envelope rendering hidden; callers see readable text fragments
//! - `success: false` envelopes are reported as text, not errors

use crate::protocol::Artifact;
use crate::routing::{Intent, Priority, TaskBrief};
use crate::server::TaskHandler;
use crate::tools::{ToolClient, ToolError, ToolResult};
use async_trait::async_trait;
use serde_json::{json, Value};

pub const ARTIFACT_NAME: &str = "customer_data_response";

const DEFAULT_LIST_LIMIT: i64 = 10;

pub struct CustomerDataAgent {
    tools: ToolClient,
}

impl CustomerDataAgent {
    pub fn new(tools: ToolClient) -> Self {
        Self { tools }
    }

    /// Fragments for one request, one per data operation performed.
    pub async fn respond(&self, text: &str) -> Result<Vec<String>, ToolError> {
        let brief = TaskBrief::parse(text);
        let customer_id = brief.params.customer_id;
        let wants_report = brief.intents.contains(&Intent::Report);

        tracing::info!(
            customer_id = ?customer_id,
            "[CustomerDataAgent] Handling {:?}",
            brief.intents
        );

        let mut fragments = Vec::new();

        // Updates run before lookups so history and details show the new values.
        if brief.intents.contains(&Intent::UpdateCustomer) {
            fragments.push(match (customer_id, brief.params.email.as_deref()) {
                (Some(id), Some(email)) => {
                    let result = self
                        .tools
                        .call_tool("update_customer", json!({ "customer_id": id, "email": email }))
                        .await?;
                    render_update(&result)
                }
                (None, _) => "Update: a customer ID is needed to update a record.".to_string(),
                (Some(_), None) => "Update: no new email address was found in the request.".to_string(),
            });
        }

        for intent in &brief.intents {
            let fragment = match (intent, customer_id) {
                (Intent::GetCustomer, Some(id)) => {
                    let result = self
                        .tools
                        .call_tool("get_customer", json!({ "customer_id": id }))
                        .await?;
                    render_customer(&result)
                }
                (Intent::ViewHistory, Some(id)) => {
                    let result = self
                        .tools
                        .call_tool("get_customer_history", json!({ "customer_id": id }))
                        .await?;
                    render_history(&result)
                }
                (Intent::CreateTicket, Some(id)) => {
                    let priority = match brief.priority {
                        Priority::High => "high",
                        Priority::Normal => "medium",
                    };
                    let result = self
                        .tools
                        .call_tool(
                            "create_ticket",
                            json!({ "customer_id": id, "issue": brief.query, "priority": priority }),
                        )
                        .await?;
                    render_ticket(&result)
                }
                (Intent::GetCustomer | Intent::ViewHistory | Intent::CreateTicket, None) => {
                    // "show ... tickets" also trips history on report queries.
                    if wants_report {
                        continue;
                    }
                    format!("{}: a customer ID is needed for this request.", label(*intent))
                }
                (Intent::Report, _) => {
                    let result = self
                        .tools
                        .call_tool("get_active_customers_with_open_tickets", json!({}))
                        .await?;
                    render_report(&result)
                }
                _ => continue,
            };
            fragments.push(fragment);
        }

        if fragments.is_empty() {
            let result = match customer_id {
                Some(id) => {
                    let result = self
                        .tools
                        .call_tool("get_customer", json!({ "customer_id": id }))
                        .await?;
                    render_customer(&result)
                }
                None => {
                    let result = self
                        .tools
                        .call_tool("list_customers", json!({ "limit": DEFAULT_LIST_LIMIT }))
                        .await?;
                    render_customer_list(&result)
                }
            };
            fragments.push(result);
        }

        Ok(fragments)
    }
}

#[async_trait]
impl TaskHandler for CustomerDataAgent {
    async fn handle(&self, text: &str) -> anyhow::Result<Vec<Artifact>> {
        let fragments = self.respond(text).await?;
        Ok(vec![Artifact::from_fragments(ARTIFACT_NAME, fragments)])
    }
}

fn label(intent: Intent) -> &'static str {
    match intent {
        Intent::GetCustomer => "Customer",
        Intent::ViewHistory => "Ticket history",
        Intent::CreateTicket => "New ticket",
        _ => "Request",
    }
}

fn text(value: &Value, key: &str) -> String {
    match &value[key] {
        Value::String(s) => s.clone(),
        Value::Null => "-".to_string(),
        other => other.to_string(),
    }
}

fn failure(prefix: &str, result: &ToolResult) -> String {
    format!(
        "{}: {}",
        prefix,
        result.error.as_deref().unwrap_or("request failed")
    )
}

fn customer_line(customer: &Value) -> String {
    format!(
        "#{} {} <{}> phone {} ({})",
        text(customer, "id"),
        text(customer, "name"),
        text(customer, "email"),
        text(customer, "phone"),
        text(customer, "status")
    )
}

fn render_customer(result: &ToolResult) -> String {
    match result.get("customer") {
        Some(customer) if result.success => format!("Customer: {}", customer_line(customer)),
        _ => failure("Customer", result),
    }
}

fn render_customer_list(result: &ToolResult) -> String {
    if !result.success {
        return failure("Customers", result);
    }
    let customers = result
        .get("customers")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    let mut lines = vec![format!("Customers ({}):", customers.len())];
    lines.extend(customers.iter().map(|c| format!("  - {}", customer_line(c))));
    lines.join("\n")
}

fn render_update(result: &ToolResult) -> String {
    if !result.success {
        return failure("Update", result);
    }
    let fields = result
        .get("updated_fields")
        .and_then(Value::as_array)
        .map(|fields| {
            fields
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join(", ")
        })
        .unwrap_or_default();
    let customer = result.get("customer").cloned().unwrap_or(Value::Null);

    format!("Updated {} for {}", fields, customer_line(&customer))
}

fn render_history(result: &ToolResult) -> String {
    if !result.success {
        return failure("Ticket history", result);
    }
    let customer = result.get("customer").cloned().unwrap_or(Value::Null);
    let stats = result.get("statistics").cloned().unwrap_or(Value::Null);
    let tickets = result
        .get("tickets")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    let mut lines = vec![format!(
        "Ticket history for {} ({}): {} total, {} open, {} in progress, {} resolved",
        text(&customer, "name"),
        text(&customer, "id"),
        text(&stats, "total"),
        text(&stats, "open"),
        text(&stats, "in_progress"),
        text(&stats, "resolved")
    )];
    lines.extend(tickets.iter().map(|t| {
        format!(
            "  - #{} [{}/{}] {}",
            text(t, "id"),
            text(t, "status"),
            text(t, "priority"),
            text(t, "issue")
        )
    }));
    lines.join("\n")
}

fn render_ticket(result: &ToolResult) -> String {
    if !result.success {
        return failure("New ticket", result);
    }
    let ticket = result.get("ticket").cloned().unwrap_or(Value::Null);
    format!(
        "Created ticket #{} for {} ({} priority): {}",
        text(&ticket, "id"),
        result
            .get("customer_name")
            .and_then(Value::as_str)
            .unwrap_or("-"),
        text(&ticket, "priority"),
        text(&ticket, "issue")
    )
}

fn render_report(result: &ToolResult) -> String {
    if !result.success {
        return failure("Report", result);
    }
    let entries = result
        .get("customers")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    let mut lines = vec![format!(
        "Active customers with open tickets: {}",
        entries.len()
    )];
    for entry in &entries {
        let customer = &entry["customer"];
        lines.push(format!(
            "  - {} (#{}): {} open",
            text(customer, "name"),
            text(customer, "id"),
            text(entry, "ticket_count")
        ));
        if let Some(tickets) = entry["open_tickets"].as_array() {
            for ticket in tickets {
                lines.push(format!(
                    "      #{} [{}] {}",
                    text(ticket, "id"),
                    text(ticket, "priority"),
                    text(ticket, "issue")
                ));
            }
        }
    }
    lines.join("\n")
}
