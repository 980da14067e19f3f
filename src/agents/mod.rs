//! Specialist agents
//!
//! The two downstream nodes the router fans out to. Both are plain
//! `TaskHandler`s hosted by the shared node server.

pub mod customer_data;
pub mod support;

pub use customer_data::CustomerDataAgent;
pub use support::{analyze, SupportAgent, SupportAnalysis, SupportPriority};
