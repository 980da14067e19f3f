//! Switchboard - rule-based intent routing for customer-service agents
//!
//! A router node classifies each query, fans it out concurrently to the
//! specialist nodes that own its intents, and merges their replies. Nodes
//! speak JSON-RPC `tasks/send` over HTTP and publish capability descriptors.

pub mod agents;
pub mod client;
pub mod config;
pub mod coordinator;
pub mod protocol;
pub mod routing;
pub mod server;
pub mod tools;
pub mod utils;

pub mod api;
pub mod cli;

pub use api::*;
pub use config::Settings;
pub use coordinator::{Coordinator, SynthesizedResponse};
pub use routing::{classify, RoutingTable};
