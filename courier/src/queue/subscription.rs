//! Consumer-side connection setup using lapin.
//!
//! Opening a [`Subscription`] walks the worker through its startup states:
//! connect, open a channel, set the prefetch window, declare the topology
//! and register as a consumer with manual acknowledgment.

use lapin::{
    options::{BasicConsumeOptions, BasicQosOptions},
    types::FieldTable,
    Channel, Connection, ConnectionProperties, Consumer,
};
use tracing::{info, warn};

use super::topology::{Topology, PREFETCH_COUNT};
use crate::error::WorkerError;
use crate::worker::WorkerState;

/// A live consumer registration on the worker's own connection.
pub struct Subscription {
    session: BrokerSession,
    consumer: Consumer,
}

/// Connection and channel kept open for the lifetime of the worker.
pub struct BrokerSession {
    connection: Connection,
    channel: Channel,
}

impl Subscription {
    /// Connect, declare the topology and start consuming from the queue.
    ///
    /// Any failure is returned as a typed error; the caller decides whether
    /// that ends the process.
    pub async fn open(
        url: &str,
        topology: &Topology,
        consumer_tag: &str,
    ) -> Result<Self, WorkerError> {
        log_state(WorkerState::Starting);
        info!(url_length = url.len(), "rabbitmq_connecting");

        let connection = Connection::connect(url, ConnectionProperties::default())
            .await
            .map_err(WorkerError::Connect)?;

        info!("rabbitmq_connected");

        Self::establish(connection, topology, consumer_tag).await
    }

    /// Subscribe over an open connection. The connection is closed again if
    /// any step fails.
    async fn establish(
        connection: Connection,
        topology: &Topology,
        consumer_tag: &str,
    ) -> Result<Self, WorkerError> {
        let channel = match connection.create_channel().await {
            Ok(channel) => channel,
            Err(e) => {
                close_connection(&connection).await;
                return Err(WorkerError::Channel(e));
            }
        };

        info!("rabbitmq_channel_created");

        let session = BrokerSession {
            connection,
            channel,
        };

        match Self::subscribe(&session.channel, topology, consumer_tag).await {
            Ok(consumer) => Ok(Self { session, consumer }),
            Err(e) => {
                session.close().await;
                Err(e)
            }
        }
    }

    async fn subscribe(
        channel: &Channel,
        topology: &Topology,
        consumer_tag: &str,
    ) -> Result<Consumer, WorkerError> {
        log_state(WorkerState::DeclaringTopology);

        channel
            .basic_qos(PREFETCH_COUNT, BasicQosOptions::default())
            .await
            .map_err(|source| WorkerError::Qos {
                prefetch: PREFETCH_COUNT,
                source,
            })?;

        info!(prefetch_count = PREFETCH_COUNT, "rabbitmq_qos_set");

        topology
            .declare_exchange(channel)
            .await
            .map_err(|source| WorkerError::DeclareExchange {
                exchange: topology.exchange.clone(),
                source,
            })?;

        info!(exchange = %topology.exchange, "rabbitmq_exchange_declared");

        topology
            .declare_queue(channel)
            .await
            .map_err(|source| WorkerError::DeclareQueue {
                queue: topology.queue.clone(),
                source,
            })?;

        info!(queue = %topology.queue, "rabbitmq_queue_declared");

        topology
            .bind(channel)
            .await
            .map_err(|source| WorkerError::Bind {
                queue: topology.queue.clone(),
                exchange: topology.exchange.clone(),
                source,
            })?;

        info!(
            queue = %topology.queue,
            exchange = %topology.exchange,
            routing_key = %topology.routing_key,
            "rabbitmq_queue_bound"
        );

        // no_ack stays false: the worker acknowledges after processing
        let consumer = channel
            .basic_consume(
                &topology.queue,
                consumer_tag,
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(|source| WorkerError::Consume {
                consumer_tag: consumer_tag.to_string(),
                source,
            })?;

        log_state(WorkerState::Subscribed);
        info!(
            queue = %topology.queue,
            consumer_tag = consumer_tag,
            "rabbitmq_consumer_started"
        );

        Ok(consumer)
    }

    /// Split into the delivery stream (for the worker task) and the session
    /// (kept by the entry point until the worker has stopped).
    pub fn into_parts(self) -> (Consumer, BrokerSession) {
        (self.consumer, self.session)
    }
}

impl BrokerSession {
    /// Close the channel, then the connection.
    pub async fn close(self) {
        if let Err(e) = self.channel.close(200, "Normal shutdown").await {
            warn!(error = %e, "rabbitmq_channel_close_error");
        }

        close_connection(&self.connection).await;

        info!("rabbitmq_session_closed");
    }
}

async fn close_connection(connection: &Connection) {
    if let Err(e) = connection.close(200, "Normal shutdown").await {
        warn!(error = %e, "rabbitmq_connection_close_error");
    }
}

fn log_state(state: WorkerState) {
    info!(state = %state, "worker_state_changed");
}
