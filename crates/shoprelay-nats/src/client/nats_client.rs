//! NATS client wrapper and connection management.

use std::time::Duration;

use async_nats::{Client, ConnectOptions, jetstream};
use tokio::time::timeout;
use tracing::{debug, info, instrument};

use super::config::{NatsConfig, NatsCredentials};
use crate::{Error, Result, TRACING_TARGET_CLIENT, TRACING_TARGET_CONNECTION};

/// NATS client wrapper with connection management.
///
/// The wrapper is a cheap handle: the underlying connection is shared and
/// safe for concurrent use, so one client is created at startup and cloned
/// into every component that needs it.
#[derive(Debug, Clone)]
pub struct NatsClient {
    client: Client,
    jetstream: jetstream::Context,
    config: NatsConfig,
}

impl NatsClient {
    /// Create a new NATS client and connect
    #[instrument(skip(config))]
    pub async fn connect(config: NatsConfig) -> Result<Self> {
        info!(
            target: TRACING_TARGET_CONNECTION,
            servers = ?config.servers,
            "Connecting to NATS servers"
        );

        let mut connect_opts = ConnectOptions::new()
            .name(&config.name)
            .connection_timeout(config.connect_timeout);

        if let Some(max_reconnects) = config.max_reconnects {
            connect_opts = connect_opts.max_reconnects(max_reconnects);
        }

        if let Some(credentials) = &config.credentials {
            connect_opts = match credentials {
                NatsCredentials::UserPassword { user, pass } => {
                    connect_opts.user_and_password(user.clone(), pass.clone())
                }
                NatsCredentials::Token { token } => connect_opts.token(token.clone()),
                NatsCredentials::CredsFile { path } => connect_opts
                    .credentials_file(path)
                    .await
                    .map_err(|e| Error::operation("credentials_file", e.to_string()))?,
            };
        }

        let client = timeout(
            config.connect_timeout,
            async_nats::connect_with_options(&config.servers.join(","), connect_opts),
        )
        .await
        .map_err(|_| Error::Timeout {
            timeout: config.connect_timeout,
        })?
        .map_err(|e| Error::Connection(Box::new(e)))?;

        let jetstream = jetstream::new(client.clone());

        let server_info = client.server_info();
        info!(
            target: TRACING_TARGET_CONNECTION,
            server_host = %server_info.host,
            server_version = %server_info.version,
            server_id = %server_info.server_id,
            "Successfully connected to NATS"
        );

        Ok(Self {
            client,
            jetstream,
            config,
        })
    }

    /// Get the underlying NATS client
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Get the JetStream context
    pub fn jetstream(&self) -> &jetstream::Context {
        &self.jetstream
    }

    /// Get the configuration
    pub fn config(&self) -> &NatsConfig {
        &self.config
    }

    /// Test connectivity with a round trip to the server
    #[instrument(skip(self), target = TRACING_TARGET_CLIENT)]
    pub async fn ping(&self) -> Result<Duration> {
        let start = std::time::Instant::now();

        timeout(self.config.request_timeout, self.client.flush())
            .await
            .map_err(|_| Error::Timeout {
                timeout: self.config.request_timeout,
            })?
            .map_err(|e| Error::Connection(Box::new(e)))?;

        let ping_time = start.elapsed();
        debug!(
            target: TRACING_TARGET_CLIENT,
            duration_ms = ping_time.as_millis(),
            "NATS ping successful"
        );
        Ok(ping_time)
    }
}
