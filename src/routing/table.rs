//! Routing Table - intent to downstream service membership
//!
//! Information Hiding:
//! - Membership rows are plain data; lookup never depends on table size
//! - Target ordering is fixed by `ServiceId` declaration order
//! - Fallback handling for unmapped intents is internal

use crate::config::FallbackPolicy;
use crate::routing::intent::Intent;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Downstream services the router can call.
///
/// Declaration order is invocation and reporting order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceId {
    CustomerData,
    Support,
}

impl ServiceId {
    pub const ALL: [ServiceId; 2] = [ServiceId::CustomerData, ServiceId::Support];

    pub fn agent_name(&self) -> &'static str {
        match self {
            ServiceId::CustomerData => "customer_data_agent",
            ServiceId::Support => "support_agent",
        }
    }
}

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.agent_name())
    }
}

/// One downstream call the router has to make and the intents behind it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteTarget {
    pub service: ServiceId,
    pub intents: Vec<Intent>,
}

/// The services a query must reach, in invocation order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingDecision {
    pub targets: Vec<RouteTarget>,
    /// Intents that had no row and no fallback.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dropped: Vec<Intent>,
}

impl RoutingDecision {
    pub fn services(&self) -> Vec<ServiceId> {
        self.targets.iter().map(|target| target.service).collect()
    }

    pub fn is_multi_target(&self) -> bool {
        self.targets.len() > 1
    }
}

const DEFAULT_ROWS: &[(Intent, ServiceId)] = &[
    (Intent::GetCustomer, ServiceId::CustomerData),
    (Intent::ViewHistory, ServiceId::CustomerData),
    (Intent::UpdateCustomer, ServiceId::CustomerData),
    (Intent::CreateTicket, ServiceId::CustomerData),
    (Intent::Report, ServiceId::CustomerData),
    (Intent::Billing, ServiceId::Support),
    (Intent::Cancellation, ServiceId::Support),
    (Intent::Upgrade, ServiceId::Support),
    (Intent::Urgent, ServiceId::Support),
    (Intent::General, ServiceId::Support),
];

#[derive(Debug, Clone)]
pub struct RoutingTable {
    rows: Vec<(Intent, ServiceId)>,
    fallback: Option<ServiceId>,
}

impl RoutingTable {
    pub fn new(rows: Vec<(Intent, ServiceId)>, fallback: Option<ServiceId>) -> Self {
        Self { rows, fallback }
    }

    pub fn with_policy(policy: FallbackPolicy) -> Self {
        let fallback = match policy {
            FallbackPolicy::Support => Some(ServiceId::Support),
            FallbackPolicy::None => None,
        };
        Self::new(DEFAULT_ROWS.to_vec(), fallback)
    }

    /// Remove every row for `intent`.
    pub fn without(mut self, intent: Intent) -> Self {
        self.rows.retain(|(row_intent, _)| *row_intent != intent);
        self
    }

    pub fn services_for(&self, intent: Intent) -> Vec<ServiceId> {
        self.rows
            .iter()
            .filter(|(row_intent, _)| *row_intent == intent)
            .map(|(_, service)| *service)
            .collect()
    }

    /// Union of the services touched by `intents`, in `ServiceId` order.
    pub fn route(&self, intents: &[Intent]) -> RoutingDecision {
        let mut decision = RoutingDecision::default();

        for &intent in intents {
            let mut services = self.services_for(intent);

            if services.is_empty() {
                match self.fallback {
                    Some(fallback) => {
                        tracing::warn!(
                            "[RoutingTable] Intent '{}' has no route, falling back to {}",
                            intent,
                            fallback
                        );
                        services.push(fallback);
                    }
                    None => {
                        tracing::warn!("[RoutingTable] Intent '{}' has no route, dropping it", intent);
                        decision.dropped.push(intent);
                        continue;
                    }
                }
            }

            for service in services {
                match decision.targets.iter_mut().find(|t| t.service == service) {
                    Some(target) => {
                        if !target.intents.contains(&intent) {
                            target.intents.push(intent);
                        }
                    }
                    None => decision.targets.push(RouteTarget {
                        service,
                        intents: vec![intent],
                    }),
                }
            }
        }

        decision.targets.sort_by_key(|target| target.service);
        decision
    }
}

impl Default for RoutingTable {
    fn default() -> Self {
        Self::with_policy(FallbackPolicy::Support)
    }
}
