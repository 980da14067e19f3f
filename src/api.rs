//! Node bootstrap
//!
//! Wires settings into running nodes: the tool server, the two specialists
//! and the router. Each `start_*` binds, builds the node's handler and
//! serves it in the background.

use crate::agents::{CustomerDataAgent, SupportAgent};
use crate::client::{AgentClient, RemoteAgent, TaskResult};
use crate::config::{LogFormat, LoggingConfig, Settings};
use crate::coordinator::Coordinator;
use crate::protocol::CapabilityDescriptor;
use crate::server::{self, NodeState};
use crate::tools::{self, CustomerStore, ToolClient, ToolRegistry};
use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber. `RUST_LOG` overrides the configured level.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .context("invalid log level")?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let installed = match config.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };

    installed.map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {}", e))
}

pub struct RunningNode {
    pub name: String,
    pub address: SocketAddr,
    /// Address published to callers.
    pub url: String,
    pub handle: JoinHandle<()>,
}

impl RunningNode {
    pub fn abort(&self) {
        self.handle.abort();
    }
}

/// Bind `bind`. A node bound to port 0 publishes its real address instead
/// of the configured url.
async fn listen(bind: &str, configured_url: &str) -> Result<(TcpListener, String)> {
    let listener = TcpListener::bind(bind)
        .await
        .with_context(|| format!("failed to bind {}", bind))?;
    let address = listener.local_addr()?;

    let url = if bind.ends_with(":0") {
        format!("http://{}", address)
    } else {
        configured_url.to_string()
    };
    Ok((listener, url))
}

pub async fn start_tool_server(settings: &Settings) -> Result<RunningNode> {
    let config = &settings.tool_server;
    let store = CustomerStore::open(&config.database_path)
        .with_context(|| format!("failed to open database {}", config.database_path))?;
    let registry = Arc::new(ToolRegistry::with_store(store));

    let (listener, url) = listen(&config.bind, &config.url).await?;
    let (address, handle) = tools::server::serve(listener, registry)?;

    Ok(RunningNode {
        name: tools::server::SERVER_NAME.to_string(),
        address,
        url,
        handle,
    })
}

async fn start_node(
    bind: &str,
    configured_url: &str,
    describe: impl FnOnce(&str) -> CapabilityDescriptor,
    handler: Arc<dyn server::TaskHandler>,
) -> Result<RunningNode> {
    let (listener, url) = listen(bind, configured_url).await?;
    let state = NodeState::new(describe(&url), handler);
    let name = state.name();
    let (address, handle) = server::serve(listener, state)?;

    Ok(RunningNode {
        name,
        address,
        url,
        handle,
    })
}

pub async fn start_customer_data(settings: &Settings) -> Result<RunningNode> {
    let tool_timeout = settings.dispatch.tool_timeout();
    let tools = ToolClient::new(
        &settings.tool_server.url,
        settings.dispatch.connect_timeout().min(tool_timeout),
        tool_timeout,
    )?;

    start_node(
        &settings.customer_data.bind,
        &settings.customer_data.url,
        CapabilityDescriptor::customer_data,
        Arc::new(CustomerDataAgent::new(tools)),
    )
    .await
}

pub async fn start_support(settings: &Settings) -> Result<RunningNode> {
    start_node(
        &settings.support.bind,
        &settings.support.url,
        CapabilityDescriptor::support,
        Arc::new(SupportAgent::new()),
    )
    .await
}

pub async fn start_router(settings: &Settings) -> Result<RunningNode> {
    let coordinator = Coordinator::from_settings(settings)?;
    let data_url = settings.customer_data.url.clone();
    let support_url = settings.support.url.clone();

    start_node(
        &settings.router.bind,
        &settings.router.url,
        |url| CapabilityDescriptor::router(url, &data_url, &support_url),
        Arc::new(coordinator),
    )
    .await
}

/// Start the whole topology in dependency order. Returns the nodes and the
/// settings with every url pointing at where the nodes actually listen.
pub async fn start_all(settings: &Settings) -> Result<(Vec<RunningNode>, Settings)> {
    let mut settings = settings.clone();

    let tools = start_tool_server(&settings).await?;
    settings.tool_server.url = tools.url.clone();

    let data = start_customer_data(&settings).await?;
    settings.customer_data.url = data.url.clone();

    let support = start_support(&settings).await?;
    settings.support.url = support.url.clone();

    let router = start_router(&settings).await?;
    settings.router.url = router.url.clone();

    Ok((vec![tools, data, support, router], settings))
}

/// Block until Ctrl-C or until any node stops.
pub async fn run_until_shutdown(nodes: Vec<RunningNode>) -> Result<()> {
    if nodes.is_empty() {
        return Ok(());
    }

    let names: Vec<String> = nodes.iter().map(|node| node.name.clone()).collect();
    for node in &nodes {
        tracing::info!(node = %node.name, url = %node.url, "[Bootstrap] Node ready");
    }

    let handles = nodes.into_iter().map(|node| node.handle);
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result.context("failed to listen for Ctrl-C")?;
            tracing::info!("[Bootstrap] Shutting down");
        }
        (_, index, _) = futures::future::select_all(handles) => {
            tracing::warn!(node = %names[index], "[Bootstrap] Node stopped unexpectedly");
        }
    }

    Ok(())
}

/// Client for the node at `url` with the configured timeouts.
pub fn agent_client(settings: &Settings, url: &str) -> Result<AgentClient> {
    Ok(AgentClient::new(
        url,
        settings.dispatch.connect_timeout(),
        settings.dispatch.request_timeout(),
    )?)
}

/// Submit `query` to the router. Waits out the router's own downstream
/// budget so partial failures arrive as a synthesized reply.
pub async fn ask(settings: &Settings, query: &str) -> Result<TaskResult> {
    let client = AgentClient::new(
        &settings.router.url,
        settings.dispatch.connect_timeout(),
        settings.dispatch.caller_timeout(),
    )?;
    Ok(client.submit_task(query).await?)
}
