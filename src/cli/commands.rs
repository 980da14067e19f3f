use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "switchboard")]
#[command(author, version, about = "Route customer-service queries to specialist agents", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum NodeKind {
    Router,
    CustomerData,
    Support,
    Tools,
    /// Tool server, both specialists and the router in one process
    All,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run one node, or the whole topology
    Serve {
        #[arg(value_enum)]
        node: NodeKind,
    },

    /// Send a query to the router and print the synthesized reply
    Ask {
        query: String,

        /// Print the full synthesis as JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Classify a query locally and show where it would be routed
    Classify { query: String },

    /// Fetch capability descriptors (defaults to the three agent nodes)
    Discover { urls: Vec<String> },

    /// Run the five demo scenarios against the router
    Demo,
}
