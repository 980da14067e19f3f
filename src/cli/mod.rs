mod commands;

pub use commands::{Cli, Commands, NodeKind};

/// The scenario queries `demo` runs, with what each is meant to exercise.
pub const DEMO_SCENARIOS: &[(&str, &str)] = &[
    (
        "Simple query",
        "Get customer information for ID 5",
    ),
    (
        "Coordinated query",
        "I'm customer 1 and need help upgrading my account",
    ),
    (
        "Report",
        "Show me all active customers who have open tickets",
    ),
    (
        "Escalation",
        "I've been charged twice, please refund immediately!",
    ),
    (
        "Multi-intent",
        "Update my email to new@email.com and show ticket history for customer ID 2",
    ),
];
