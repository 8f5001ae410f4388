//! Routing topology shared by the publisher and the consumer worker.
//!
//! Both sides must declare exactly the same exchange, queue and binding,
//! otherwise published messages are dropped by the broker as unroutable.
//! Declarations are idempotent, so every connection re-declares them.

use lapin::{
    options::{ExchangeDeclareOptions, QueueBindOptions, QueueDeclareOptions},
    types::FieldTable,
    Channel, ExchangeKind,
};

/// Default exchange name.
pub const EXCHANGE_NAME: &str = "messages_exchange";

/// Default durable queue name.
pub const QUEUE_NAME: &str = "messages_queue";

/// Default routing key binding the queue to the exchange.
pub const ROUTING_KEY: &str = "messages_routing_key";

/// Default consumer tag for the worker.
pub const CONSUMER_TAG: &str = "messages_consumer";

/// At most one unacknowledged delivery per worker.
pub const PREFETCH_COUNT: u16 = 1;

/// Exchange/queue/routing-key triple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topology {
    pub exchange: String,
    pub queue: String,
    pub routing_key: String,
}

impl Default for Topology {
    fn default() -> Self {
        Self::new(EXCHANGE_NAME, QUEUE_NAME, ROUTING_KEY)
    }
}

impl Topology {
    pub fn new(
        exchange: impl Into<String>,
        queue: impl Into<String>,
        routing_key: impl Into<String>,
    ) -> Self {
        Self {
            exchange: exchange.into(),
            queue: queue.into(),
            routing_key: routing_key.into(),
        }
    }

    /// Always `direct`: route on exact routing key match.
    pub fn exchange_kind(&self) -> ExchangeKind {
        ExchangeKind::Direct
    }

    /// Durable, not auto-deleted, not internal.
    pub fn exchange_options() -> ExchangeDeclareOptions {
        ExchangeDeclareOptions {
            passive: false,
            durable: true,
            auto_delete: false,
            internal: false,
            nowait: false,
        }
    }

    /// Durable, shared, kept when the last consumer goes away.
    pub fn queue_options() -> QueueDeclareOptions {
        QueueDeclareOptions {
            passive: false,
            durable: true,
            exclusive: false,
            auto_delete: false,
            nowait: false,
        }
    }

    /// Declare the exchange on `channel`.
    pub async fn declare_exchange(&self, channel: &Channel) -> lapin::Result<()> {
        channel
            .exchange_declare(
                &self.exchange,
                self.exchange_kind(),
                Self::exchange_options(),
                FieldTable::default(),
            )
            .await
    }

    /// Declare the durable queue on `channel`.
    pub async fn declare_queue(&self, channel: &Channel) -> lapin::Result<()> {
        channel
            .queue_declare(&self.queue, Self::queue_options(), FieldTable::default())
            .await
            .map(|_| ())
    }

    /// Bind the queue to the exchange under the routing key.
    pub async fn bind(&self, channel: &Channel) -> lapin::Result<()> {
        channel
            .queue_bind(
                &self.queue,
                &self.exchange,
                &self.routing_key,
                QueueBindOptions::default(),
                FieldTable::default(),
            )
            .await
    }
}
