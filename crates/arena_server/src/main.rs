//! Arena server binary.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

use anyhow::Result;
use arena_server::{AppState, Cli, Command, ServerConfig, router};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve { config, host, port } => {
            let config = ServerConfig::load(config.as_deref())?.with_overrides(host, port);
            run_server(config).await
        }
        Command::Config { config } => print_config(config),
    }
}

/// Runs the HTTP server until it fails.
async fn run_server(config: ServerConfig) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_filter())),
        )
        .init();

    let (state, _hub_loop) = AppState::start(config.hub().clone());
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
    info!(addr = %listener.local_addr()?, "Server listening");
    axum::serve(listener, app).await?;

    Ok(())
}

/// Prints the resolved configuration.
fn print_config(path: Option<PathBuf>) -> Result<()> {
    let config = ServerConfig::load(path.as_deref())?;
    println!("{}", config.to_toml()?);
    Ok(())
}
