//! Nelumbo Bot — entry point.
//!
//! Startup sequence:
//!   1. Load .env (if present)
//!   2. Init logger at default level
//!   3. Load config
//!   4. Re-init logger at configured level
//!   5. Open storage and run migrations
//!   6. Build dispatcher, command table, gateway adapter
//!   7. Run the console channel until Ctrl-C

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use nelumbo_bot::commands;
use nelumbo_bot::config;
use nelumbo_bot::error::AppError;
use nelumbo_bot::event::Dispatcher;
use nelumbo_bot::gateway::console::{ConsoleChannel, ConsoleTransport};
use nelumbo_bot::gateway::{ChatTransport, GatewayAdapter};
use nelumbo_bot::logger;
use nelumbo_bot::storage::{Storage, run_migrations};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    // Load .env if present — ignore errors (file is optional).
    let _ = dotenvy::dotenv();

    // Bootstrap logger at "info" before config is available.
    logger::init("info")?;

    let config = config::load()?;
    logger::init(&config.log_level)?;

    info!(
        bot_name = %config.bot_name,
        work_dir = %config.work_dir.display(),
        log_level = %config.log_level,
        "config loaded"
    );

    if config.gateway_token.is_none() {
        info!("no DISCORD_TOKEN set — running without a platform connection");
    }

    let storage = Arc::new(Storage::open(&config.db_path())?);
    run_migrations(&storage)?;

    let dispatcher = Dispatcher::new();
    let transport: Arc<dyn ChatTransport> = Arc::new(ConsoleTransport);
    let command_table = commands::command_table(&dispatcher, Arc::clone(&storage), &config)?;

    let adapter = Arc::new(GatewayAdapter::new(
        dispatcher,
        command_table,
        transport,
        config.bot_name.clone(),
        config.command_prefix.clone(),
    ));

    let shutdown = CancellationToken::new();

    let console = if config.console_should_load() {
        let channel = ConsoleChannel::new(Arc::clone(&adapter));
        Some(tokio::spawn(channel.run(shutdown.clone())))
    } else {
        None
    };

    println!("✓ {} is online", config.bot_name);
    info!("press Ctrl-C to exit");

    match console {
        Some(mut handle) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("ctrl-c received, shutting down");
                    shutdown.cancel();
                    match (&mut handle).await {
                        Ok(res) => res?,
                        Err(e) => warn!("console task panicked: {e}"),
                    }
                }
                joined = &mut handle => {
                    match joined {
                        Ok(res) => res?,
                        Err(e) => warn!("console task panicked: {e}"),
                    }
                }
            }
        }
        None => {
            tokio::signal::ctrl_c()
                .await
                .map_err(|e| AppError::Gateway(format!("signal handler: {e}")))?;
            info!("ctrl-c received, shutting down");
            shutdown.cancel();
        }
    }

    Ok(())
}
