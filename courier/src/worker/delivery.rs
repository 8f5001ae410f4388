//! Acknowledgeable deliveries.

use async_trait::async_trait;
use lapin::{message::Delivery, options::BasicAckOptions};

/// A message handed to this worker by the broker.
///
/// `ack` takes the delivery by value, so a delivery can be acknowledged at
/// most once.
#[async_trait]
pub trait InboundDelivery: Send + 'static {
    fn delivery_tag(&self) -> u64;

    fn payload(&self) -> &[u8];

    /// Set by the broker when this message was delivered before and not acked.
    fn redelivered(&self) -> bool;

    /// Positive, single (non-multiple) acknowledgment.
    async fn ack(self) -> lapin::Result<()>;
}

#[async_trait]
impl InboundDelivery for Delivery {
    fn delivery_tag(&self) -> u64 {
        self.delivery_tag
    }

    fn payload(&self) -> &[u8] {
        &self.data
    }

    fn redelivered(&self) -> bool {
        self.redelivered
    }

    async fn ack(self) -> lapin::Result<()> {
        self.acker.ack(BasicAckOptions::default()).await
    }
}
