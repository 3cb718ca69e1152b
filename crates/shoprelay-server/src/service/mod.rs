//! Application state and dependency injection.

mod config;
mod relay;
mod settings;
mod signature;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

use shoprelay_nats::stream::StreamSink;
use shoprelay_nats::BusSink;

pub use crate::service::config::ServiceConfig;
pub use crate::service::relay::{Delivery, DeliveryTarget, DropReason, RelayOutcome, RelayService};
pub use crate::service::settings::{PgSettingsProvider, SettingsProvider, SharedSettingsProvider};
pub use crate::service::signature::WebhookVerifier;
// Re-export error types from crate root for convenience
pub use crate::{Error, Result};

/// Tracing target for relay orchestration.
pub const TRACING_TARGET_RELAY: &str = "shoprelay_server::relay";

/// Tracing target for webhook signature verification.
pub const TRACING_TARGET_SIGNATURE: &str = "shoprelay_server::signature";

/// Shared handle to a stream sink.
pub type SharedStreamSink = Arc<dyn StreamSink>;

/// Shared handle to a bus sink.
pub type SharedBusSink = Arc<dyn BusSink>;

/// Application state.
///
/// Used for the [`State`] extraction (dependency injection).
///
/// [`State`]: axum::extract::State
#[must_use = "state does nothing unless you use it"]
#[derive(Clone)]
pub struct ServiceState {
    // External services:
    pub stream: SharedStreamSink,
    pub bus: SharedBusSink,
    pub settings: SharedSettingsProvider,

    // Internal services:
    pub relay: RelayService,
    pub verifier: WebhookVerifier,
}

impl ServiceState {
    /// Builds application state from already-connected sinks.
    ///
    /// Production wiring goes through [`ServiceState::from_config`]; this
    /// constructor exists so tests can inject in-memory doubles.
    pub fn new(
        stream: SharedStreamSink,
        bus: SharedBusSink,
        settings: SharedSettingsProvider,
        verifier: WebhookVerifier,
    ) -> Self {
        let relay = RelayService::new(stream.clone(), bus.clone(), settings.clone());
        Self {
            stream,
            bus,
            settings,
            relay,
            verifier,
        }
    }

    /// Initializes application state from configuration.
    ///
    /// Connects to all external services and loads required resources.
    pub async fn from_config(config: &ServiceConfig) -> Result<Self> {
        let pg_client = config.connect_postgres().await?;
        let nats_client = config.connect_nats().await?;

        let stream: SharedStreamSink = Arc::new(config.create_stream_client(&nats_client).await?);
        let bus: SharedBusSink = Arc::new(config.create_bus_client(&nats_client));
        let settings: SharedSettingsProvider = Arc::new(PgSettingsProvider::new(pg_client));
        let verifier = WebhookVerifier::new(&config.webhook_secret);

        let relay = RelayService::new(stream.clone(), bus.clone(), settings.clone())
            .with_bus_products_update(config.bus_products_update);

        Ok(Self {
            stream,
            bus,
            settings,
            relay,
            verifier,
        })
    }
}

macro_rules! impl_di {
    ($($f:ident: $t:ty),+) => {$(
        impl axum::extract::FromRef<ServiceState> for $t {
            fn from_ref(state: &ServiceState) -> Self {
                state.$f.clone()
            }
        }
    )+};
}

// External services:
impl_di!(stream: SharedStreamSink);
impl_di!(bus: SharedBusSink);
impl_di!(settings: SharedSettingsProvider);

// Internal services:
impl_di!(relay: RelayService);
impl_di!(verifier: WebhookVerifier);
