//! Dispatcher - concurrent fan-out to downstream services
//!
//! Information Hiding:
//! - Per-service client table hidden
//! - Brief rendering per target hidden
//! - Every failure is captured as a value; nothing escapes `dispatch`

use crate::client::{AgentClient, RemoteAgent, RemoteError, TaskResult, TransportError};
use crate::config::Settings;
use crate::routing::{Classification, Intent, RouteTarget, RoutingDecision, ServiceId, TaskBrief};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;

/// Final state of one downstream call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CallStatus {
    Succeeded {
        task_id: String,
        fragments: Vec<String>,
    },
    TimedOut {
        error: String,
    },
    TransportFailed {
        error: TransportError,
    },
    ApplicationError {
        task_id: String,
        error: RemoteError,
    },
    /// No client is registered for the service.
    Unavailable {
        error: String,
    },
}

/// Result of one call to one downstream service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownstreamOutcome {
    pub service: ServiceId,
    pub address: Option<String>,
    pub intents: Vec<Intent>,
    pub request: String,
    pub elapsed_ms: u64,
    pub status: CallStatus,
}

impl DownstreamOutcome {
    pub fn succeeded(&self) -> bool {
        matches!(self.status, CallStatus::Succeeded { .. })
    }

    /// One-line description of the failure, `None` on success.
    pub fn error_message(&self) -> Option<String> {
        match &self.status {
            CallStatus::Succeeded { .. } => None,
            CallStatus::TimedOut { error } => Some(format!("timed out: {}", error)),
            CallStatus::TransportFailed { error } => Some(error.to_string()),
            CallStatus::ApplicationError { error, .. } => match error.code {
                Some(code) => Some(format!("agent error {}: {}", code, error.message)),
                None => Some(format!("agent error: {}", error.message)),
            },
            CallStatus::Unavailable { error } => Some(error.clone()),
        }
    }
}

pub struct Dispatcher {
    clients: HashMap<ServiceId, Arc<dyn RemoteAgent>>,
    call_timeout: Duration,
}

impl Dispatcher {
    pub fn new(call_timeout: Duration) -> Self {
        Self {
            clients: HashMap::new(),
            call_timeout,
        }
    }

    pub fn with_client(mut self, service: ServiceId, client: Arc<dyn RemoteAgent>) -> Self {
        self.clients.insert(service, client);
        self
    }

    /// Client table for the two specialist nodes named in `settings`.
    pub fn from_settings(settings: &Settings) -> Result<Self, TransportError> {
        let connect = settings.dispatch.connect_timeout();
        let request = settings.dispatch.request_timeout();

        let customer_data = AgentClient::new(&settings.customer_data.url, connect, request)?;
        let support = AgentClient::new(&settings.support.url, connect, request)?;

        Ok(Self::new(request)
            .with_client(ServiceId::CustomerData, Arc::new(customer_data))
            .with_client(ServiceId::Support, Arc::new(support)))
    }

    /// Call every target concurrently and return one outcome per target, in
    /// the decision's order, once all calls have resolved.
    pub async fn dispatch(
        &self,
        query: &str,
        classification: &Classification,
        decision: &RoutingDecision,
    ) -> Vec<DownstreamOutcome> {
        tracing::info!(
            "[Dispatcher] Dispatching to {} service(s): {:?}",
            decision.targets.len(),
            decision.services()
        );

        let calls = decision.targets.iter().map(|target| {
            let brief = TaskBrief::new(
                target.intents.clone(),
                classification.params.clone(),
                classification.priority,
                query,
            );
            self.call(target, brief.render())
        });

        join_all(calls).await
    }

    async fn call(&self, target: &RouteTarget, request: String) -> DownstreamOutcome {
        let service = target.service;
        let started = Instant::now();

        let client = match self.clients.get(&service) {
            Some(client) => Arc::clone(client),
            None => {
                tracing::warn!("[Dispatcher] No client registered for {}", service);
                return DownstreamOutcome {
                    service,
                    address: None,
                    intents: target.intents.clone(),
                    request,
                    elapsed_ms: 0,
                    status: CallStatus::Unavailable {
                        error: format!("no client registered for {}", service),
                    },
                };
            }
        };

        tracing::debug!("[Dispatcher] -> {} at {}", service, client.address());

        let status = match timeout(self.call_timeout, client.submit_task(&request)).await {
            Ok(Ok(TaskResult::Completed { task_id, fragments })) => {
                CallStatus::Succeeded { task_id, fragments }
            }
            Ok(Ok(TaskResult::Rejected { task_id, error })) => {
                CallStatus::ApplicationError { task_id, error }
            }
            Ok(Err(error)) if error.is_timeout() => CallStatus::TimedOut {
                error: error.to_string(),
            },
            Ok(Err(error)) => CallStatus::TransportFailed { error },
            Err(_) => CallStatus::TimedOut {
                error: format!("no reply within {}ms", self.call_timeout.as_millis()),
            },
        };

        let outcome = DownstreamOutcome {
            service,
            address: Some(client.address().to_string()),
            intents: target.intents.clone(),
            request,
            elapsed_ms: started.elapsed().as_millis() as u64,
            status,
        };

        match outcome.error_message() {
            None => tracing::info!(
                service = %service,
                elapsed_ms = outcome.elapsed_ms,
                "[Dispatcher] {} succeeded",
                service
            ),
            Some(error) => tracing::warn!(
                service = %service,
                elapsed_ms = outcome.elapsed_ms,
                "[Dispatcher] {} failed: {}",
                service,
                error
            ),
        }

        outcome
    }
}
