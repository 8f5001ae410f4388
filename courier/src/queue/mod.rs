//! Queue module for RabbitMQ operations.
//!
//! This module provides:
//! - The topology (exchange, queue, binding) shared by both sides
//! - A per-call publisher for the ingress path
//! - The subscription the consumer worker reads deliveries from
//!
//! ## Architecture
//!
//! ```text
//! HTTP POST → Publisher → exchange ──routing key──▶ queue → Subscription → Worker
//! ```

pub mod message;
pub mod publisher;
pub mod subscription;
pub mod topology;

pub use message::{Message, CONTENT_TYPE_JSON};
pub use publisher::{Publish, Publisher};
pub use subscription::{BrokerSession, Subscription};
pub use topology::{
    Topology, CONSUMER_TAG, EXCHANGE_NAME, PREFETCH_COUNT, QUEUE_NAME, ROUTING_KEY,
};
