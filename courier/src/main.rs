//! Courier Worker - RabbitMQ consumer with manual acknowledgment.
//!
//! This worker consumes deliveries from the durable queue one at a time
//! (prefetch 1), runs the processing step, acknowledges, and stops cleanly
//! on SIGINT/SIGTERM after the current delivery is acknowledged.

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use courier::{shutdown, telemetry, Config, SimulatedWork, Subscription, Worker, WorkerError};

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init();

    info!("worker_starting");

    // Load configuration from environment
    let config = Config::from_env();
    info!(
        exchange = %config.topology.exchange,
        queue = %config.topology.queue,
        routing_key = %config.topology.routing_key,
        consumer_tag = %config.consumer_tag,
        "config_loaded"
    );

    // Startup failures are fatal for this process.
    let subscription = Subscription::open(&config.amqp_url, &config.topology, &config.consumer_tag)
        .await
        .inspect_err(log_worker_error)
        .context("Failed to start consumer")?;

    let (deliveries, session) = subscription.into_parts();

    let token = CancellationToken::new();
    let signals = shutdown::relay(token.clone());

    let work = SimulatedWork::new(config.processing_delay);
    info!(
        processing_delay_ms = work.delay().as_millis() as u64,
        "worker_processor_ready"
    );

    let worker = Worker::new(work, token.clone());
    let handle = tokio::spawn(worker.run(deliveries));

    info!("Waiting for messages. To exit press CTRL+C");

    let outcome = handle.await.context("Worker task panicked")?;

    // Stop the relay if the worker ended on its own.
    token.cancel();
    if let Err(e) = signals.await {
        warn!(error = %e, "signal_relay_join_failed");
    }

    session.close().await;

    let report = outcome
        .inspect_err(log_worker_error)
        .context("Worker stopped with an error")?;

    info!(
        processed = report.processed,
        stop = ?report.stop,
        "worker_shutdown_complete"
    );

    Ok(())
}

fn log_worker_error(e: &WorkerError) {
    error!(error = %e, startup = e.is_startup(), "worker_failed");
}
