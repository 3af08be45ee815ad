//! CLI argument definitions using clap
//!
//! Commands:
//! - aetherlink tail --url <base-url> --key <subscription-key>

use clap::{Parser, Subcommand};

/// aetherlink - A resilient real-time event stream client
#[derive(Parser, Debug)]
#[command(name = "aetherlink")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Connect to an event server and print every delivered event
    Tail {
        /// Base URL of the event server
        #[arg(long, default_value = "http://127.0.0.1:4000/")]
        url: String,

        /// Subscription key (usually the local player identifier)
        #[arg(long, default_value = "auto")]
        key: String,

        /// Bearer token attached to every request
        #[arg(long, env = "AETHERLINK_TOKEN")]
        token: Option<String>,

        /// Force the long-poll transport instead of streaming
        #[arg(long)]
        pull: bool,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
