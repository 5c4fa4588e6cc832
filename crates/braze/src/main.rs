//! Connector entry point.
//!
//! Wires configuration, logging, the upstream bot context, and the forward
//! WebSocket service together, then runs until a shutdown signal arrives.
//!
//! Usage: `braze [config-path]`. Without an argument the configuration is
//! searched for in the current directory and the user config directory.

use std::sync::Arc;

use anyhow::Result;
use tokio::signal;
use tracing::info;

use braze_core::{BotContext, ConfigLoader, logging};
use braze_onebot::{ActionRouter, ForwardConfig, ForwardWsService};

#[tokio::main]
async fn main() -> Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => ConfigLoader::new().load_from_file(path)?,
        None => ConfigLoader::default().load()?,
    };
    logging::init_from_config(&config.logging);

    let bot = Arc::new(BotContext::new(config.bot.uin));
    info!(uin = bot.uin(), "bot context ready");

    let forward: ForwardConfig = config.service_section(ForwardConfig::SECTION)?;
    let service = ForwardWsService::new(forward, Arc::clone(&bot));
    service.bind_handler(Arc::new(ActionRouter::new(service.sender())));
    service.start().await?;

    wait_for_shutdown().await;

    service.stop().await;
    Ok(())
}

/// Waits for shutdown signals (Ctrl+C or SIGTERM).
async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to register SIGTERM handler");

        tokio::select! {
            _ = signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down");
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down");
            }
        }
    }

    #[cfg(not(unix))]
    {
        signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
        info!("Received Ctrl+C, shutting down");
    }
}
