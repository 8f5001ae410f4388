//! Per-delivery processing step.

use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

/// Work performed on one delivery before it is acknowledged.
///
/// Processing cannot fail; a delivery that reaches this point is always
/// acknowledged afterwards.
#[async_trait]
pub trait Process: Send + Sync {
    async fn process(&self, delivery_tag: u64, payload: &[u8]);
}

/// Placeholder work: log, wait a fixed interval, log again.
#[derive(Debug, Clone, Copy)]
pub struct SimulatedWork {
    delay: Duration,
}

impl SimulatedWork {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

#[async_trait]
impl Process for SimulatedWork {
    async fn process(&self, delivery_tag: u64, payload: &[u8]) {
        let body = String::from_utf8_lossy(payload);

        info!(delivery_tag = delivery_tag, body = %body, "message_processing_started");

        tokio::time::sleep(self.delay).await;

        info!(
            delivery_tag = delivery_tag,
            body = %body,
            elapsed_ms = self.delay.as_millis() as u64,
            "message_processing_finished"
        );
    }
}
