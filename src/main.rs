use anyhow::Result;
use clap::Parser;
use switchboard::cli::{Cli, Commands, NodeKind, DEMO_SCENARIOS};
use switchboard::client::{RemoteAgent, TaskResult};
use switchboard::coordinator::{SynthesizedResponse, DETAIL_ARTIFACT_INDEX};
use switchboard::routing::{classify, RoutingTable};
use switchboard::{api, utils, Settings};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::new()?;
    api::init_logging(&settings.logging)?;

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { node } => handle_serve(&settings, node).await,
        Commands::Ask { query, json } => handle_ask(&settings, &query, json).await,
        Commands::Classify { query } => handle_classify(&settings, &query),
        Commands::Discover { urls } => handle_discover(&settings, urls).await,
        Commands::Demo => handle_demo(&settings).await,
    }
}

async fn handle_serve(settings: &Settings, node: NodeKind) -> Result<()> {
    let nodes = match node {
        NodeKind::Tools => vec![api::start_tool_server(settings).await?],
        NodeKind::CustomerData => vec![api::start_customer_data(settings).await?],
        NodeKind::Support => vec![api::start_support(settings).await?],
        NodeKind::Router => vec![api::start_router(settings).await?],
        NodeKind::All => api::start_all(settings).await?.0,
    };

    for node in &nodes {
        utils::print_success(&format!("{} listening on {} ({})", node.name, node.address, node.url));
    }

    api::run_until_shutdown(nodes).await
}

async fn handle_ask(settings: &Settings, query: &str, json: bool) -> Result<()> {
    utils::print_info(&format!("Asking router at {}...", settings.router.url));

    match api::ask(settings, query).await? {
        TaskResult::Completed { fragments, .. } => {
            if json {
                match fragments.get(DETAIL_ARTIFACT_INDEX) {
                    Some(detail) => {
                        let value: serde_json::Value = serde_json::from_str(detail)?;
                        println!("{}", serde_json::to_string_pretty(&value)?);
                    }
                    None => utils::print_warning("Router reply carried no synthesis detail"),
                }
                return Ok(());
            }

            let text = fragments.first().map(String::as_str).unwrap_or_default();
            println!("\n{}", text);

            if let Some(detail) = fragments.get(DETAIL_ARTIFACT_INDEX) {
                if let Ok(synthesis) = serde_json::from_str::<SynthesizedResponse>(detail) {
                    if !synthesis.overall_success {
                        utils::print_warning(&format!(
                            "\n{} downstream service(s) failed",
                            synthesis.failed_count()
                        ));
                    }
                }
            }
            Ok(())
        }
        TaskResult::Rejected { error, .. } => {
            utils::print_error(&format!("Router rejected the task: {}", error.message));
            Ok(())
        }
    }
}

fn handle_classify(settings: &Settings, query: &str) -> Result<()> {
    let classification = classify(query);
    let decision = RoutingTable::with_policy(settings.routing.fallback).route(&classification.intents);

    utils::print_header("Classification");
    let intents: Vec<&str> = classification.intents.iter().map(|i| i.as_str()).collect();
    utils::print_field("Intents", &intents.join(", "));
    utils::print_field("Priority", classification.priority.as_str());
    if let Some(id) = classification.params.customer_id {
        utils::print_field("Customer ID", &id.to_string());
    }
    if let Some(email) = &classification.params.email {
        utils::print_field("Email", email);
    }

    utils::print_header("Routing");
    for target in &decision.targets {
        let intents: Vec<&str> = target.intents.iter().map(|i| i.as_str()).collect();
        utils::print_field(target.service.agent_name(), &intents.join(", "));
    }
    if !decision.dropped.is_empty() {
        utils::print_warning(&format!("Dropped (no route): {:?}", decision.dropped));
    }
    Ok(())
}

async fn handle_discover(settings: &Settings, urls: Vec<String>) -> Result<()> {
    let urls = if urls.is_empty() {
        vec![
            settings.customer_data.url.clone(),
            settings.support.url.clone(),
            settings.router.url.clone(),
        ]
    } else {
        urls
    };

    utils::print_header("Capability discovery");
    let mut healthy = true;

    for url in &urls {
        let client = api::agent_client(settings, url)?;
        match client.fetch_capabilities().await {
            Ok(descriptor) => utils::print_success(&format!(
                "{} at {}: {} skill(s)",
                descriptor.name,
                url,
                descriptor.skills.len()
            )),
            Err(error) => {
                healthy = false;
                utils::print_error(&format!("{}: {}", url, error));
            }
        }
    }

    if !healthy {
        anyhow::bail!("one or more nodes did not answer discovery");
    }
    Ok(())
}

async fn handle_demo(settings: &Settings) -> Result<()> {
    for (index, (name, query)) in DEMO_SCENARIOS.iter().enumerate() {
        utils::print_header(&format!("Scenario {}: {}", index + 1, name));
        utils::print_field("Query", query);

        match api::ask(settings, query).await {
            Ok(TaskResult::Completed { fragments, .. }) => {
                println!("\n{}", fragments.first().map(String::as_str).unwrap_or_default());
            }
            Ok(TaskResult::Rejected { error, .. }) => {
                utils::print_error(&format!("Rejected: {}", error.message));
            }
            Err(error) => {
                utils::print_error(&format!("Router unreachable: {:#}", error));
                return Err(error);
            }
        }
    }
    Ok(())
}
