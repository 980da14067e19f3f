mod settings;

pub use settings::{
    DispatchConfig, FallbackPolicy, LogFormat, LoggingConfig, NodeConfig, RoutingConfig,
    Settings, ToolServerConfig,
};
