use std::{net::SocketAddr, path::PathBuf};

use anyhow::Context;
use clap::Parser;
use tracing::{info, metadata::LevelFilter};
use tracing_subscriber::{prelude::*, EnvFilter};

mod api_error;
mod app;
mod config;
mod controller;
mod dtos;
mod json_from_request;

pub use app::AppState;

use crate::config::Config;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Additional TOML config file, merged over config.toml.
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Overrides the configured listen address.
    #[arg(short, long)]
    listen: Option<SocketAddr>,
}

fn init_tracing() -> anyhow::Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env()
        .context("Failed to parse filter from env")?;

    #[cfg(target_os = "linux")]
    if libsystemd::logging::connected_to_journal() {
        let journald = tracing_journald::layer().context("Failed to connect to journald")?;
        tracing_subscriber::registry()
            .with(filter)
            .with(journald)
            .try_init()
            .context("setting default subscriber failed")?;
        return Ok(());
    }

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().pretty().with_target(true))
        .try_init()
        .context("setting default subscriber failed")?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    init_tracing()?;

    let mut config = Config::load(args.config.as_deref())?;
    if let Some(listen) = args.listen {
        config.listen_addr = listen;
    }

    let state = AppState::from_config(&config)?;
    let app = app::router(state, config.body_limit_bytes);

    info!(addr = %config.listen_addr, sd_api_url = %config.sd_api_url, "Listening");

    axum::Server::try_bind(&config.listen_addr)
        .with_context(|| format!("Failed to bind {}", config.listen_addr))?
        .serve(app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    Ok(())
}
