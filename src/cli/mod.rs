//! CLI module for aetherlink
//!
//! Provides a command-line interface for:
//! - tail: Connect to a server and print every delivered event

mod args;
mod commands;
mod errors;

pub use args::{Cli, Command};
pub use commands::run;
pub use errors::{CliError, CliResult};
