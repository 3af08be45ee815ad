//! CLI command implementations
//!
//! The binary is a thin client over the library: it composes the registry,
//! attaches one subscriber, and prints whatever arrives.

use std::sync::Arc;

use crate::config::StreamConfig;
use crate::http::{ReqwestClient, StaticToken};
use crate::observability::Logger;
use crate::stream::{EventPayload, HostEnv, StreamRegistry, Subscriber};

use super::args::{Cli, Command};
use super::errors::{CliError, CliResult};

/// Parse arguments and dispatch to the selected command
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();

    match cli.command {
        Command::Tail { url, key, token, pull } => tail(url, key, token, pull),
    }
}

fn tail(url: String, key: String, token: Option<String>, pull: bool) -> CliResult<()> {
    let runtime = tokio::runtime::Runtime::new().map_err(|e| CliError::Runtime(e.to_string()))?;

    runtime.block_on(async move {
        let registry = StreamRegistry::new(
            Arc::new(ReqwestClient::new()),
            Arc::new(StaticToken(token)),
            StreamConfig::new(url),
            HostEnv {
                restricted_network: pull,
            },
        );

        let handle = registry.open(
            &key,
            Subscriber::new()
                .on_connected(|info| {
                    Logger::info(
                        "STREAM_CONNECTED",
                        &[
                            ("player_id", &info.player_id),
                            (
                                "last_event_id",
                                &info
                                    .last_event_id
                                    .map(|id| id.to_string())
                                    .unwrap_or_else(|| "-".to_string()),
                            ),
                        ],
                    );
                })
                .on_event(|name, payload| {
                    let rendered = match payload {
                        EventPayload::Json(value) => value.to_string(),
                        EventPayload::Raw(text) => text.clone(),
                    };
                    println!("{} {}", name, rendered);
                })
                .on_error(|error| {
                    Logger::warn("STREAM_ERROR", &[("cause", &error.to_string())]);
                }),
        )?;

        tokio::signal::ctrl_c().await?;

        handle.close();
        registry.shutdown();
        Ok(())
    })
}
