//! Agent relay replay tool
//!
//! Reads NDJSON commands from a file (or stdin), feeds them through the
//! gateway dispatcher and prints every emitted frame as one JSON line.
//! Logs go to stderr.

mod command;
mod relay;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use relay_core::config::FileConfigLoader;
use relay_core::session::FileSessionStore;

use crate::relay::Relay;

fn env_path(name: &str, default: &str) -> PathBuf {
    std::env::var(name)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(default))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "agent_relay=info,relay_gateway=info,relay_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config_path = env_path("RELAY_CONFIG", ".relay/config.json");
    let sessions_path = env_path("RELAY_SESSIONS", ".relay/sessions.json");
    tracing::info!("Using config {:?}, sessions {:?}", config_path, sessions_path);

    let mut relay = Relay::new(
        Arc::new(FileConfigLoader::new(config_path)),
        Arc::new(FileSessionStore::new(sessions_path)),
    );

    let input: Box<dyn AsyncRead + Unpin> = match std::env::args().nth(1) {
        Some(path) => Box::new(
            tokio::fs::File::open(&path)
                .await
                .with_context(|| format!("failed to open {}", path))?,
        ),
        None => Box::new(tokio::io::stdin()),
    };

    let mut lines = BufReader::new(input).lines();
    let mut line_no = 0usize;
    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        if line.trim().is_empty() {
            continue;
        }
        match relay.process_line(&line) {
            Ok(output) => {
                for rendered in output {
                    println!("{}", rendered);
                }
            }
            Err(e) => tracing::warn!("Skipping line {}: {:#}", line_no, e),
        }
    }

    tracing::info!("Processed {} lines", line_no);
    Ok(())
}
