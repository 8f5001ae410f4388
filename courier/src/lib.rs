//! Courier - durable hand-off of HTTP payloads through RabbitMQ.
//!
//! This library provides shared modules for the two Courier binaries:
//! - `courier-web`: Thin web server that publishes each POST body
//! - `courier-worker`: Consumer that processes and acknowledges deliveries
//!
//! ## Architecture
//!
//! ```text
//! POST /post → Web Server → exchange (direct) → durable queue → Worker
//! ```

pub mod config;
pub mod error;
pub mod queue;
pub mod shutdown;
pub mod telemetry;
pub mod web;
pub mod worker;

// Re-export commonly used types
pub use config::Config;
pub use error::{PublishError, WorkerError};
pub use queue::{BrokerSession, Message, Publish, Publisher, Subscription, Topology};
pub use web::AppState;
pub use worker::{InboundDelivery, Process, SimulatedWork, StopReason, Worker, WorkerReport};
