#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

/// Tracing target for NATS client operations.
///
/// Use this target for logging client initialization, configuration, and client-level errors.
pub const TRACING_TARGET_CLIENT: &str = "shoprelay_nats::client";

/// Tracing target for NATS connection operations.
///
/// Use this target for logging connection establishment, reconnection, and connection errors.
pub const TRACING_TARGET_CONNECTION: &str = "shoprelay_nats::connection";

/// Tracing target for event stream operations.
///
/// Use this target for logging stream submission, batch accounting, and stream-level errors.
pub const TRACING_TARGET_STREAM: &str = "shoprelay_nats::stream";

/// Tracing target for event bus operations.
///
/// Use this target for logging bus notification delivery and bus-level errors.
pub const TRACING_TARGET_BUS: &str = "shoprelay_nats::bus";

pub mod bus;
mod client;
mod envelope;
mod error;
pub mod stream;

// Re-export async_nats types needed by consumers
pub use async_nats::jetstream;
pub use bus::{BusNotification, BusSink, EventBusClient};
pub use client::{NatsClient, NatsConfig, NatsCredentials};
pub use envelope::{Envelope, EventTopic};
pub use error::{Error, Result};
pub use stream::{
    BatchOutcome, EventStreamClient, RecordFailure, RecordReceipt, StreamHealth, StreamOptions,
    StreamSink,
};
