use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub router: NodeConfig,
    pub customer_data: NodeConfig,
    pub support: NodeConfig,
    pub tool_server: ToolServerConfig,
    pub dispatch: DispatchConfig,
    pub routing: RoutingConfig,
    pub logging: LoggingConfig,
}

/// Where a node listens and the address it publishes to callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    pub bind: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolServerConfig {
    pub bind: String,
    pub url: String,
    pub database_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    pub connect_timeout_ms: u64,
    pub request_timeout_ms: u64,
}

/// Slack between one timeout budget and the budget it nests inside.
const BUDGET_MARGIN: Duration = Duration::from_millis(1_000);

impl DispatchConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Budget for one router → specialist call.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Budget for a caller waiting on the router. Strictly larger than the
    /// per-call budget so a downstream timeout still comes back synthesized.
    pub fn caller_timeout(&self) -> Duration {
        self.connect_timeout() + self.request_timeout() + BUDGET_MARGIN
    }

    /// Budget for a specialist waiting on the tool server. Strictly smaller
    /// than the per-call budget so the specialist reports the failure itself.
    pub fn tool_timeout(&self) -> Duration {
        let request = self.request_timeout();
        request.saturating_sub(BUDGET_MARGIN).max(request / 2)
    }
}

/// What the routing table does with an intent that has no row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackPolicy {
    Support,
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingConfig {
    pub fallback: FallbackPolicy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            router: NodeConfig {
                bind: "0.0.0.0:8003".to_string(),
                url: "http://localhost:8003".to_string(),
            },
            customer_data: NodeConfig {
                bind: "0.0.0.0:8001".to_string(),
                url: "http://localhost:8001".to_string(),
            },
            support: NodeConfig {
                bind: "0.0.0.0:8002".to_string(),
                url: "http://localhost:8002".to_string(),
            },
            tool_server: ToolServerConfig {
                bind: "0.0.0.0:8000".to_string(),
                url: "http://localhost:8000".to_string(),
                database_path: "support.db".to_string(),
            },
            dispatch: DispatchConfig {
                connect_timeout_ms: 10_000,
                request_timeout_ms: 30_000,
            },
            routing: RoutingConfig {
                fallback: FallbackPolicy::Support,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: LogFormat::Compact,
            },
        }
    }
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let config_env = env::var("CONFIG_ENV").unwrap_or_else(|_| "default".to_string());

        let config = Config::builder()
            .add_source(Config::try_from(&Settings::default())?)
            .add_source(File::with_name(&format!("config/{}", config_env)).required(false))
            .add_source(Environment::with_prefix("APP").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}
