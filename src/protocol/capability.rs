//! Capability descriptors
//!
//! Each node builds its descriptor once at startup and serves the same
//! value on every discovery request.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const DISCOVERY_PATH: &str = "/.well-known/agent-capabilities";

const PROTOCOL_VERSION: &str = "1.0.0";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilityDescriptor {
    pub name: String,
    pub description: String,
    pub version: String,
    pub url: String,
    pub capabilities: AgentCapabilities,
    pub default_input_modes: Vec<String>,
    pub default_output_modes: Vec<String>,
    pub skills: Vec<SkillDescriptor>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subordinate_agents: Vec<SubordinateAgent>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentCapabilities {
    pub streaming: bool,
    pub push_notifications: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillDescriptor {
    pub id: String,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubordinateAgent {
    pub name: String,
    pub url: String,
    pub description: String,
}

fn skill(id: &str, name: &str, description: &str) -> SkillDescriptor {
    SkillDescriptor {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
    }
}

impl CapabilityDescriptor {
    fn text_node(name: &str, description: &str, url: &str, skills: Vec<SkillDescriptor>) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            version: PROTOCOL_VERSION.to_string(),
            url: url.to_string(),
            capabilities: AgentCapabilities::default(),
            default_input_modes: vec!["text".to_string()],
            default_output_modes: vec!["text".to_string()],
            skills,
            subordinate_agents: Vec::new(),
        }
    }

    pub fn router(url: &str, customer_data_url: &str, support_url: &str) -> Self {
        let mut descriptor = Self::text_node(
            "router_agent",
            "Router/Orchestrator Agent - Analyzes queries and coordinates specialist agents",
            url,
            vec![
                skill(
                    "analyze_intent",
                    "Analyze Intent",
                    "Analyze customer query to detect intents and parameters",
                ),
                skill(
                    "route_to_data_agent",
                    "Route to Data Agent",
                    "Route request to Customer Data Agent via A2A",
                ),
                skill(
                    "route_to_support_agent",
                    "Route to Support Agent",
                    "Route request to Support Agent via A2A",
                ),
                skill(
                    "coordinate_multi_agent",
                    "Coordinate Multi-Agent",
                    "Coordinate requests requiring multiple agents",
                ),
                skill(
                    "synthesize_response",
                    "Synthesize Response",
                    "Synthesize final response from multiple agents",
                ),
            ],
        );
        descriptor.subordinate_agents = vec![
            SubordinateAgent {
                name: "customer_data_agent".to_string(),
                url: customer_data_url.to_string(),
                description: "Specialist for customer data operations".to_string(),
            },
            SubordinateAgent {
                name: "support_agent".to_string(),
                url: support_url.to_string(),
                description: "Specialist for customer support operations".to_string(),
            },
        ];
        descriptor
    }

    pub fn customer_data(url: &str) -> Self {
        Self::text_node(
            "customer_data_agent",
            "Customer Data Agent - Accesses the customer database through the tool server",
            url,
            vec![
                skill("get_customer", "Get Customer", "Retrieve customer information by ID"),
                skill("list_customers", "List Customers", "List customers with optional filters"),
                skill("update_customer", "Update Customer", "Update customer information"),
                skill(
                    "get_customer_history",
                    "Get Customer History",
                    "Get ticket history for a customer",
                ),
                skill("create_ticket", "Create Ticket", "Create a new support ticket"),
                skill(
                    "get_active_customers_with_open_tickets",
                    "Get Active Customers with Open Tickets",
                    "Get all active customers who have open tickets",
                ),
            ],
        )
    }

    pub fn support(url: &str) -> Self {
        Self::text_node(
            "support_agent",
            "Support Agent - Handles customer support, billing, cancellations, and escalations",
            url,
            vec![
                skill("handle_billing", "Handle Billing Issue", "Process billing-related customer issues"),
                skill(
                    "handle_cancellation",
                    "Handle Cancellation",
                    "Process subscription/account cancellation requests",
                ),
                skill("handle_upgrade", "Handle Upgrade", "Process account upgrade requests"),
                skill("handle_urgent", "Handle Urgent Issue", "Process urgent/emergency support issues"),
                skill("general_support", "General Support", "Provide general customer support"),
                skill("analyze_request", "Analyze Request", "Analyze support request type and priority"),
            ],
        )
    }
}

/// Holds a node's descriptor for the lifetime of the process.
///
/// There is no mutation path after construction; `describe` hands out the
/// same shared value every time.
#[derive(Debug, Clone)]
pub struct CapabilityPublisher {
    descriptor: Arc<CapabilityDescriptor>,
}

impl CapabilityPublisher {
    pub fn new(descriptor: CapabilityDescriptor) -> Self {
        Self {
            descriptor: Arc::new(descriptor),
        }
    }

    pub fn describe(&self) -> Arc<CapabilityDescriptor> {
        Arc::clone(&self.descriptor)
    }
}
