//! Courier Web Server - HTTP ingress for the message queue.
//!
//! This binary provides a thin web server that:
//! - Publishes every `POST /post` body to RabbitMQ
//! - Answers `GET /` as a liveness check
//! - Returns 500 when the broker cannot take the message
//!
//! Each publish opens and closes its own broker connection.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::info;

use courier::{shutdown, telemetry, web, AppState, Config, Publisher};

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init();

    info!("web_server_starting");

    // Load configuration
    let config = Config::from_env();
    info!(
        port = config.port,
        "config_loaded"
    );

    let publisher = Publisher::new(config.amqp_url.clone(), config.topology.clone());
    info!(
        exchange = %publisher.topology().exchange,
        routing_key = %publisher.topology().routing_key,
        "rabbitmq_publisher_created"
    );
    let app = web::router(AppState::new(publisher));

    // Bind to address
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!(address = %addr, "web_server_listening");

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            shutdown::wait_for_signal().await;
            info!("web_server_shutting_down");
        })
        .await
        .context("Server error")?;

    info!("web_server_shutdown_complete");

    Ok(())
}
