//! Coordinator - the router node's request pipeline
//!
//! classify → route → dispatch → synthesize. One query in, one synthesized
//! reply out.
//!
//! Information Hiding:
//! - Classification and routing are synchronous and hidden
//! - Downstream fan-out is delegated to the dispatcher
//! - Exposes `handle_query` and the node-level `TaskHandler`

pub mod dispatcher;
pub mod synthesizer;

pub use dispatcher::{CallStatus, Dispatcher, DownstreamOutcome};
pub use synthesizer::{synthesize, SynthesizedResponse, NOTHING_CONSULTED};

use crate::config::Settings;
use crate::protocol::Artifact;
use crate::routing::{classify, RoutingTable};
use crate::server::TaskHandler;
use async_trait::async_trait;

/// Artifact holding the human-readable reply.
pub const RESPONSE_ARTIFACT: &str = "synthesized_response";
/// Artifact holding the full `SynthesizedResponse` as JSON.
pub const DETAIL_ARTIFACT: &str = "synthesis";
/// Position of the detail text once a reply's artifacts are flattened.
pub const DETAIL_ARTIFACT_INDEX: usize = 1;

pub struct Coordinator {
    table: RoutingTable,
    dispatcher: Dispatcher,
}

impl Coordinator {
    pub fn new(table: RoutingTable, dispatcher: Dispatcher) -> Self {
        Self { table, dispatcher }
    }

    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let table = RoutingTable::with_policy(settings.routing.fallback);
        let dispatcher = Dispatcher::from_settings(settings)?;
        Ok(Self::new(table, dispatcher))
    }

    pub async fn handle_query(&self, query: &str) -> SynthesizedResponse {
        tracing::info!("[Coordinator] Handling query: {}", query);

        let classification = classify(query);
        let decision = self.table.route(&classification.intents);

        tracing::info!(
            multi_target = decision.is_multi_target(),
            "[Coordinator] intents={:?} priority={} services={:?}",
            classification.intents,
            classification.priority,
            decision.services()
        );

        let outcomes = self.dispatcher.dispatch(query, &classification, &decision).await;
        let response = synthesize(query, &classification, outcomes);

        if response.overall_success {
            tracing::info!("[Coordinator] Completed with {} outcome(s)", response.outcomes.len());
        } else {
            tracing::warn!(
                "[Coordinator] Completed with {} failed outcome(s)",
                response.failed_count()
            );
        }

        response
    }
}

#[async_trait]
impl TaskHandler for Coordinator {
    async fn handle(&self, text: &str) -> anyhow::Result<Vec<Artifact>> {
        let response = self.handle_query(text).await;
        let detail = serde_json::to_string(&response)?;

        Ok(vec![
            Artifact::text(RESPONSE_ARTIFACT, &response.text),
            Artifact::text(DETAIL_ARTIFACT, &detail),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{AgentClient, RemoteAgent};
    use crate::config::FallbackPolicy;
    use crate::routing::{Intent, ServiceId};
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn agent_replying(text: &str) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "id": "1",
                "result": {
                    "id": "1",
                    "status": { "state": "completed" },
                    "artifacts": [ { "parts": [ { "text": text } ] } ]
                }
            })))
            .mount(&server)
            .await;
        server
    }

    fn client(server: &MockServer) -> Arc<dyn RemoteAgent> {
        Arc::new(
            AgentClient::new(server.uri(), Duration::from_secs(1), Duration::from_secs(2)).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_single_intent_reaches_one_service() {
        let data = agent_replying("Customer 5: Charlie Brown").await;
        let support = agent_replying("support").await;

        let coordinator = Coordinator::new(
            RoutingTable::default(),
            Dispatcher::new(Duration::from_secs(5))
                .with_client(ServiceId::CustomerData, client(&data))
                .with_client(ServiceId::Support, client(&support)),
        );

        let response = coordinator
            .handle_query("Get customer information for ID 5")
            .await;

        assert!(response.overall_success);
        assert_eq!(response.outcomes.len(), 1);
        assert_eq!(response.outcomes[0].service, ServiceId::CustomerData);
        assert!(response.text.contains("Charlie Brown"));
        assert_eq!(support.received_requests().await.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_dead_service_is_reported_not_raised() {
        let data = agent_replying("Customer 1: Alice").await;
        let dead = AgentClient::new(
            "http://127.0.0.1:9",
            Duration::from_millis(200),
            Duration::from_millis(500),
        )
        .unwrap();

        let coordinator = Coordinator::new(
            RoutingTable::default(),
            Dispatcher::new(Duration::from_secs(5))
                .with_client(ServiceId::CustomerData, client(&data))
                .with_client(ServiceId::Support, Arc::new(dead)),
        );

        let response = coordinator
            .handle_query("I'm customer 1 and need help upgrading my account")
            .await;

        assert!(!response.overall_success);
        assert_eq!(response.outcomes.len(), 2);
        assert!(response.outcomes[0].succeeded());
        assert!(!response.outcomes[1].succeeded());
        assert!(response.text.contains("Alice"));
    }

    #[tokio::test]
    async fn test_dropped_intents_consult_nobody() {
        let coordinator = Coordinator::new(
            RoutingTable::with_policy(FallbackPolicy::None)
                .without(Intent::General),
            Dispatcher::new(Duration::from_secs(1)),
        );

        let response = coordinator.handle_query("asdkjh").await;

        assert!(response.overall_success);
        assert!(response.outcomes.is_empty());
        assert!(response.text.contains(NOTHING_CONSULTED));
    }

    #[tokio::test]
    async fn test_handler_returns_text_and_detail_artifacts() {
        let support = agent_replying("We can help with billing").await;
        let coordinator = Coordinator::new(
            RoutingTable::default(),
            Dispatcher::new(Duration::from_secs(5)).with_client(ServiceId::Support, client(&support)),
        );

        let artifacts = coordinator.handle("I was charged twice").await.unwrap();

        assert_eq!(artifacts.len(), 2);
        assert_eq!(artifacts[0].name.as_deref(), Some(RESPONSE_ARTIFACT));
        let detail: SynthesizedResponse =
            serde_json::from_str(artifacts[1].parts[0].text.as_deref().unwrap()).unwrap();
        assert!(detail.overall_success);
        assert!(detail.intents.contains(&Intent::Billing));
    }
}
