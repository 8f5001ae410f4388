//! Consumer worker: the receive/process/acknowledge loop.
//!
//! The loop is generic over its delivery stream so it can run against a
//! lapin [`Consumer`](lapin::Consumer) in production and an in-memory stream
//! in tests.

pub mod consumer;
pub mod delivery;
pub mod processor;

use std::fmt;

pub use consumer::{StopReason, Worker, WorkerReport};
pub use delivery::InboundDelivery;
pub use processor::{Process, SimulatedWork};

/// Lifecycle of a consumer worker, as reported in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Starting,
    DeclaringTopology,
    Subscribed,
    Waiting,
    Processing,
    Draining,
    Stopped,
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WorkerState::Starting => "starting",
            WorkerState::DeclaringTopology => "declaring_topology",
            WorkerState::Subscribed => "subscribed",
            WorkerState::Waiting => "waiting",
            WorkerState::Processing => "processing",
            WorkerState::Draining => "draining",
            WorkerState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}
