//! NATS client connection management and configuration.

mod config;
mod nats_client;

pub use config::{NatsConfig, NatsCredentials};
pub use nats_client::NatsClient;
