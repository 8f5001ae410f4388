//! Error types for the publish and consume paths.
//!
//! Every broker step has its own variant so callers (and logs) can tell a
//! connectivity failure from a topology or transport failure.

use thiserror::Error;

/// Failure of a single publish call. The caller decides whether to retry.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("failed to connect to broker: {0}")]
    Connect(#[source] lapin::Error),

    #[error("failed to open channel: {0}")]
    Channel(#[source] lapin::Error),

    #[error("failed to declare exchange `{exchange}`: {source}")]
    DeclareExchange {
        exchange: String,
        #[source]
        source: lapin::Error,
    },

    #[error("failed to publish to exchange `{exchange}`: {source}")]
    Publish {
        exchange: String,
        #[source]
        source: lapin::Error,
    },
}

/// Failure that stops a consumer worker.
///
/// Startup variants come from opening the subscription; `Ack` is raised by
/// the processing loop and means the channel is unusable.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("failed to connect to broker: {0}")]
    Connect(#[source] lapin::Error),

    #[error("failed to open channel: {0}")]
    Channel(#[source] lapin::Error),

    #[error("failed to set prefetch to {prefetch}: {source}")]
    Qos {
        prefetch: u16,
        #[source]
        source: lapin::Error,
    },

    #[error("failed to declare exchange `{exchange}`: {source}")]
    DeclareExchange {
        exchange: String,
        #[source]
        source: lapin::Error,
    },

    #[error("failed to declare queue `{queue}`: {source}")]
    DeclareQueue {
        queue: String,
        #[source]
        source: lapin::Error,
    },

    #[error("failed to bind queue `{queue}` to `{exchange}`: {source}")]
    Bind {
        queue: String,
        exchange: String,
        #[source]
        source: lapin::Error,
    },

    #[error("failed to register consumer `{consumer_tag}`: {source}")]
    Consume {
        consumer_tag: String,
        #[source]
        source: lapin::Error,
    },

    #[error("failed to acknowledge delivery {delivery_tag}: {source}")]
    Ack {
        delivery_tag: u64,
        #[source]
        source: lapin::Error,
    },
}

impl WorkerError {
    /// True for failures raised before the worker started consuming.
    pub fn is_startup(&self) -> bool {
        !matches!(self, WorkerError::Ack { .. })
    }
}
