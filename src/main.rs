//! Provider Bridge HTTP server
//!
//! Starts an Axum web server that routes chat-completion requests across
//! the configured providers.

use clap::Parser;
use provider_bridge::{
    cli::{Cli, Command, generate_config_template},
    config::Config,
    handlers::{self, AppState},
    telemetry,
};
use std::net::SocketAddr;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Some(Command::Config { output }) = &cli.command {
        match output {
            Some(path) => {
                std::fs::write(path, generate_config_template())?;
                eprintln!("Configuration template written to {}", path);
            }
            None => print!("{}", generate_config_template()),
        }
        return Ok(());
    }

    // Load configuration, then apply CLI/env overrides
    let mut config = Config::from_file(&cli.config)?;
    cli.apply_overrides(&mut config)?;

    telemetry::init(&config.observability.log_level);

    tracing::info!(
        host = %config.server.host,
        port = config.server.port,
        mode = config.routing.mode.as_str(),
        providers = config.providers.len(),
        "Starting provider bridge"
    );

    let addr = SocketAddr::from((
        config
            .server
            .host
            .parse::<std::net::IpAddr>()
            .unwrap_or_else(|_| std::net::IpAddr::from([0, 0, 0, 0])),
        config.server.port,
    ));

    let state = AppState::new(Arc::new(config))?;
    let app = handlers::app(state);

    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
