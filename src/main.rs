//! shdict console
//!
//! Creates the configured zones, sweeps expired entries in the background
//! and answers one JSON reply per command read from stdin.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use shdict::{console, spawn_sweeper, Config, SharedDicts};

/// Main entry point for the shdict console.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging (stderr)
/// 2. Load configuration from environment variables
/// 3. Create one dictionary per configured zone
/// 4. Start background expiry sweeper
/// 5. Answer commands from stdin until EOF or Ctrl+C
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "shdict=info", can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shdict=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::from_env().context("Failed to load configuration")?;
    info!(
        zones = config.zones.len(),
        sweep_interval_ms = config.sweep_interval_ms,
        sweep_batch = config.sweep_batch,
        "Configuration loaded"
    );

    let dicts = Arc::new(SharedDicts::from_config(&config).context("Failed to create zones")?);

    let sweeper = spawn_sweeper(
        dicts.clone(),
        Duration::from_millis(config.sweep_interval_ms.max(1)),
        config.sweep_batch,
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read stdin")? else {
                    info!("End of input");
                    break;
                };
                if let Some(reply) = console::handle_line(&dicts, &line) {
                    let mut out = reply.to_line();
                    out.push('\n');
                    stdout.write_all(out.as_bytes()).await?;
                    stdout.flush().await?;
                }
            }
            result = signal::ctrl_c() => {
                result.context("Failed to install Ctrl+C handler")?;
                info!("Received Ctrl+C, shutting down");
                break;
            }
        }
    }

    sweeper.abort();
    warn!("Sweeper aborted");
    Ok(())
}
