//! Intent classification and routing
//!
//! Pure, synchronous pieces of the router: turn a query into intents and
//! parameters, then into the set of downstream services to call.

pub mod brief;
pub mod intent;
pub mod table;

pub use brief::TaskBrief;
pub use intent::{classify, Classification, Intent, ParameterSet, Priority};
pub use table::{RouteTarget, RoutingDecision, RoutingTable, ServiceId};
