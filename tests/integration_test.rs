//! End-to-end tests over the full topology
//!
//! Every test boots its own tool server (in-memory database), both
//! specialists and the router on ephemeral ports.

use switchboard::client::{AgentClient, RemoteAgent, TaskResult};
use switchboard::cli::DEMO_SCENARIOS;
use switchboard::coordinator::{CallStatus, SynthesizedResponse, DETAIL_ARTIFACT_INDEX};
use switchboard::routing::{Intent, Priority, ServiceId};
use switchboard::{api, RunningNode, Settings};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

fn test_settings() -> Settings {
    let mut settings = Settings::default();
    settings.router.bind = "127.0.0.1:0".to_string();
    settings.customer_data.bind = "127.0.0.1:0".to_string();
    settings.support.bind = "127.0.0.1:0".to_string();
    settings.tool_server.bind = "127.0.0.1:0".to_string();
    settings.tool_server.database_path = ":memory:".to_string();
    settings.dispatch.connect_timeout_ms = 1_000;
    settings.dispatch.request_timeout_ms = 5_000;
    settings
}

/// Accepts connections and never answers on them.
async fn silent_listener() -> (String, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    let handle = tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    (url, handle)
}

fn tight_settings() -> Settings {
    let mut settings = test_settings();
    settings.dispatch.connect_timeout_ms = 500;
    settings.dispatch.request_timeout_ms = 1_500;
    settings
}

async fn boot() -> (Vec<RunningNode>, Settings) {
    api::start_all(&test_settings()).await.unwrap()
}

async fn ask(settings: &Settings, query: &str) -> (String, SynthesizedResponse) {
    match api::ask(settings, query).await.unwrap() {
        TaskResult::Completed { fragments, .. } => {
            let detail = serde_json::from_str(&fragments[DETAIL_ARTIFACT_INDEX]).unwrap();
            (fragments[0].clone(), detail)
        }
        TaskResult::Rejected { error, .. } => panic!("router rejected task: {}", error.message),
    }
}

fn fragments_for(response: &SynthesizedResponse, service: ServiceId) -> String {
    let outcome = response
        .outcomes
        .iter()
        .find(|o| o.service == service)
        .unwrap_or_else(|| panic!("no outcome for {}", service));
    match &outcome.status {
        CallStatus::Succeeded { fragments, .. } => fragments.join("\n"),
        other => panic!("{} did not succeed: {:?}", service, other),
    }
}

#[tokio::test]
async fn test_discovery_on_every_node() {
    let (_nodes, settings) = boot().await;

    for (url, name) in [
        (&settings.router.url, "router_agent"),
        (&settings.customer_data.url, "customer_data_agent"),
        (&settings.support.url, "support_agent"),
    ] {
        let client = AgentClient::new(url.as_str(), Duration::from_secs(1), Duration::from_secs(2)).unwrap();
        let descriptor = client.fetch_capabilities().await.unwrap();
        assert_eq!(descriptor.name, name);
        assert_eq!(&descriptor.url, url);
    }

    let router = AgentClient::new(settings.router.url.as_str(), Duration::from_secs(1), Duration::from_secs(2))
        .unwrap()
        .fetch_capabilities()
        .await
        .unwrap();
    assert_eq!(router.subordinate_agents.len(), 2);
}

#[tokio::test]
async fn test_simple_query_reaches_customer_data_only() {
    let (_nodes, settings) = boot().await;

    let (text, response) = ask(&settings, "Get customer information for ID 5").await;

    assert!(response.overall_success);
    assert_eq!(response.outcomes.len(), 1);
    assert_eq!(response.params.customer_id, Some(5));
    assert!(fragments_for(&response, ServiceId::CustomerData).contains("Charlie Brown"));
    assert!(text.contains("Charlie Brown"));
}

#[tokio::test]
async fn test_coordinated_query_reaches_both_services() {
    let (_nodes, settings) = boot().await;

    let (_, response) = ask(&settings, "I'm customer 1 and need help upgrading my account").await;

    assert!(response.overall_success);
    let services: Vec<ServiceId> = response.outcomes.iter().map(|o| o.service).collect();
    assert_eq!(services, vec![ServiceId::CustomerData, ServiceId::Support]);
    assert!(fragments_for(&response, ServiceId::CustomerData).contains("John Doe"));
    assert!(fragments_for(&response, ServiceId::Support).contains("Premium"));
}

#[tokio::test]
async fn test_report_query() {
    let (_nodes, settings) = boot().await;

    let (_, response) = ask(&settings, "Show me all active customers who have open tickets").await;

    assert!(response.intents.contains(&Intent::Report));
    assert_eq!(response.outcomes.len(), 1);
    let report = fragments_for(&response, ServiceId::CustomerData);
    assert!(report.starts_with("Active customers with open tickets: 4"));
}

#[tokio::test]
async fn test_escalation_is_high_priority_support() {
    let (_nodes, settings) = boot().await;

    let (_, response) = ask(&settings, "I've been charged twice, please refund immediately!").await;

    assert_eq!(response.priority, Priority::High);
    assert_eq!(response.outcomes.len(), 1);
    let support = fragments_for(&response, ServiceId::Support);
    assert!(support.contains("Estimated resolution: 4-8 hours"));
    assert!(support.contains("Urgent: I understand this is urgent"));
}

#[tokio::test]
async fn test_multi_intent_update_and_history() {
    let (_nodes, settings) = boot().await;

    let (_, response) = ask(
        &settings,
        "Update my email to new@email.com and show ticket history for customer ID 2",
    )
    .await;

    assert!(response.overall_success);
    assert_eq!(response.params.email.as_deref(), Some("new@email.com"));
    let data = fragments_for(&response, ServiceId::CustomerData);
    assert!(data.contains("Updated email"));
    assert!(data.contains("Ticket history for Jane Smith"));
}

#[tokio::test]
async fn test_every_demo_scenario_succeeds() {
    let (_nodes, settings) = boot().await;

    for (name, query) in DEMO_SCENARIOS {
        let (text, response) = ask(&settings, query).await;
        assert!(response.overall_success, "scenario '{}' failed:\n{}", name, text);
        assert!(!response.outcomes.is_empty());
    }
}

#[tokio::test]
async fn test_dead_specialist_is_partial_failure() {
    let (nodes, settings) = boot().await;

    let support = nodes
        .iter()
        .find(|node| node.name == "support_agent")
        .unwrap();
    support.abort();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let (text, response) = ask(&settings, "I'm customer 1 and need help upgrading my account").await;

    assert!(!response.overall_success);
    assert_eq!(response.outcomes.len(), 2);
    assert!(response.outcomes[0].succeeded());
    assert!(!response.outcomes[1].succeeded());
    assert!(text.contains("John Doe"));
    assert!(text.contains("[support_agent] FAILED"));
}

#[tokio::test]
async fn test_hung_specialist_times_out_inside_reply() {
    let mut settings = tight_settings();
    let tools = api::start_tool_server(&settings).await.unwrap();
    settings.tool_server.url = tools.url.clone();
    let data = api::start_customer_data(&settings).await.unwrap();
    settings.customer_data.url = data.url.clone();
    let (silent_url, _silent) = silent_listener().await;
    settings.support.url = silent_url;
    let router = api::start_router(&settings).await.unwrap();
    settings.router.url = router.url.clone();

    let (text, response) = ask(&settings, "I'm customer 1 and need help upgrading my account").await;

    assert!(!response.overall_success);
    assert_eq!(response.outcomes.len(), 2);
    assert!(response.outcomes[0].succeeded());
    assert!(matches!(response.outcomes[1].status, CallStatus::TimedOut { .. }));
    assert!(text.contains("John Doe"));
    assert!(text.contains("[support_agent] FAILED\nERROR: timed out"));
}

#[tokio::test]
async fn test_hung_tool_server_is_reported_by_specialist() {
    let mut settings = tight_settings();
    let (silent_url, _silent) = silent_listener().await;
    settings.tool_server.url = silent_url;
    let data = api::start_customer_data(&settings).await.unwrap();
    settings.customer_data.url = data.url.clone();
    let support = api::start_support(&settings).await.unwrap();
    settings.support.url = support.url.clone();
    let router = api::start_router(&settings).await.unwrap();
    settings.router.url = router.url.clone();

    let (text, response) = ask(&settings, "Get customer information for ID 5").await;

    assert!(!response.overall_success);
    assert_eq!(response.outcomes.len(), 1);
    assert!(matches!(
        response.outcomes[0].status,
        CallStatus::ApplicationError { .. }
    ));
    assert!(text.contains("[customer_data_agent] FAILED\nERROR: agent error"));
}
