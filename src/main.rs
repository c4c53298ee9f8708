//! Service relay (v1)
//!
//! A reverse-proxy relay built with Tokio, Axum and reqwest.
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌──────────────────────────────────────────────────┐
//!                        │                  SERVICE RELAY                   │
//!                        │                                                  │
//!   GET /orders/v1/x?q   │  ┌─────────┐    ┌──────────┐    ┌─────────────┐  │
//!   ─────────────────────┼─▶│  http   │───▶│ routing  │───▶│ forwarding  │──┼──▶ http://orders/v1/x?q
//!                        │  │ server  │    │ service  │    │  engine +   │  │
//!                        │  │         │    │   map    │    │  pool       │  │
//!   200 + streamed body  │  └─────────┘    └──────────┘    └──────┬──────┘  │
//!   ◀────────────────────┼──────────────────────────────────────────┘       │
//!                        │                                                  │
//!                        │  config · observability · resilience · lifecycle │
//!                        └──────────────────────────────────────────────────┘
//! ```

use clap::Parser;

use service_relay::cli::Cli;
use service_relay::lifecycle::startup;
use service_relay::observability::init_logging;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = match Cli::parse().into_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("service-relay: {e}");
            std::process::exit(2);
        }
    };

    init_logging(&config.observability)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        bind_address = %config.listener.bind_address,
        services = ?config.services.keys().collect::<Vec<_>>(),
        request_timeout_secs = config.timeouts.request_secs,
        "service-relay starting"
    );

    startup::run(config).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
