//! Relay orchestration: settings gate, envelope construction, and delivery.

use std::sync::Arc;

use shoprelay_nats::stream::{RecordReceipt, StreamSink};
use shoprelay_nats::{BusNotification, BusSink, Envelope, EventTopic};
use tracing::{debug, info, warn};

use crate::service::{SharedSettingsProvider, TRACING_TARGET_RELAY};

/// Downstream pipeline an envelope was routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryTarget {
    /// The partitioned event stream.
    Stream,
    /// The fire-and-forget event bus.
    Bus,
}

impl DeliveryTarget {
    /// Short label for logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stream => "stream",
            Self::Bus => "bus",
        }
    }
}

/// Successful delivery of one envelope to exactly one downstream target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// Record accepted by the event stream.
    Stream(RecordReceipt),
    /// Notification accepted by the event bus (no receipt to report).
    Bus,
}

/// Why an authenticated webhook was acknowledged without being relayed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropReason {
    /// The topic header is not in the accepted set.
    UnknownTopic(String),
    /// The shop has no settings row or its relay toggle is off.
    IntegrationDisabled,
    /// The settings store could not be queried.
    SettingsUnavailable,
    /// The app was uninstalled; settings were torn down instead of relaying.
    Uninstalled,
    /// The downstream target rejected the record.
    DeliveryFailed { target: DeliveryTarget },
}

impl DropReason {
    /// Short machine-readable label for logs and acknowledgments.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnknownTopic(_) => "unknown_topic",
            Self::IntegrationDisabled => "integration_disabled",
            Self::SettingsUnavailable => "settings_unavailable",
            Self::Uninstalled => "uninstalled",
            Self::DeliveryFailed { .. } => "delivery_failed",
        }
    }
}

/// Outcome of processing one authenticated webhook notification.
///
/// Every outcome is acknowledged with HTTP 200; the variants exist so
/// logging and tests can tell delivery from the various drop paths apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayOutcome {
    /// The envelope reached its downstream target.
    Delivered(Delivery),
    /// The notification was acknowledged but not relayed.
    Dropped(DropReason),
}

impl RelayOutcome {
    /// Returns true when the envelope reached a downstream target.
    #[inline]
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered(_))
    }

    /// Short label for the acknowledgment body and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Delivered(_) => "delivered",
            Self::Dropped(reason) => reason.as_str(),
        }
    }
}

/// Orchestrates the relay pipeline for incoming webhook notifications.
#[derive(Clone)]
pub struct RelayService {
    stream: Arc<dyn StreamSink>,
    bus: Arc<dyn BusSink>,
    settings: SharedSettingsProvider,
    /// When set, `products/update` events route to the event bus instead of
    /// the stream. Every topic has exactly one downstream target.
    bus_products_update: bool,
}

impl RelayService {
    /// Bus notification source for product events.
    pub const BUS_SOURCE_PRODUCTS: &'static str = "shopify.products";

    /// Bus detail type for product updates.
    pub const BUS_DETAIL_PRODUCT_UPDATED: &'static str = "product.updated";

    /// Creates the relay over the given sinks and settings provider.
    pub fn new(
        stream: Arc<dyn StreamSink>,
        bus: Arc<dyn BusSink>,
        settings: SharedSettingsProvider,
    ) -> Self {
        Self {
            stream,
            bus,
            settings,
            bus_products_update: true,
        }
    }

    /// Toggles the `products/update` bus route.
    pub fn with_bus_products_update(mut self, enabled: bool) -> Self {
        self.bus_products_update = enabled;
        self
    }

    /// Processes one authenticated webhook notification.
    ///
    /// The caller has already verified the signature; whatever happens here
    /// is acknowledged upstream with HTTP 200 so the platform does not
    /// re-deliver.
    pub async fn process(
        &self,
        topic_header: &str,
        shop: &str,
        payload: serde_json::Value,
    ) -> RelayOutcome {
        let Ok(topic) = topic_header.parse::<EventTopic>() else {
            warn!(
                target: TRACING_TARGET_RELAY,
                topic = %topic_header,
                shop = %shop,
                "Dropping event with unrecognized topic"
            );
            return RelayOutcome::Dropped(DropReason::UnknownTopic(topic_header.to_string()));
        };

        if topic.is_uninstall() {
            return self.handle_uninstall(shop).await;
        }

        match self.settings.find(shop).await {
            Ok(Some(settings)) if settings.is_relaying() => {}
            Ok(_) => {
                debug!(
                    target: TRACING_TARGET_RELAY,
                    topic = %topic,
                    shop = %shop,
                    "Integration disabled for shop, dropping event"
                );
                return RelayOutcome::Dropped(DropReason::IntegrationDisabled);
            }
            Err(err) => {
                warn!(
                    target: TRACING_TARGET_RELAY,
                    topic = %topic,
                    shop = %shop,
                    error = %err,
                    "Settings lookup failed, dropping event"
                );
                return RelayOutcome::Dropped(DropReason::SettingsUnavailable);
            }
        }

        let envelope = Envelope::new(topic, shop, payload);

        if self.bus_products_update && topic == EventTopic::ProductsUpdate {
            self.deliver_to_bus(&envelope).await
        } else {
            self.deliver_to_stream(&envelope).await
        }
    }

    /// Submits the envelope to the partitioned event stream.
    async fn deliver_to_stream(&self, envelope: &Envelope) -> RelayOutcome {
        match self.stream.submit(envelope).await {
            Ok(receipt) => {
                info!(
                    target: TRACING_TARGET_RELAY,
                    event_id = %envelope.id,
                    topic = %envelope.topic,
                    shop = %envelope.shop,
                    sequence = receipt.sequence,
                    "Relayed event to stream"
                );
                RelayOutcome::Delivered(Delivery::Stream(receipt))
            }
            Err(err) => {
                warn!(
                    target: TRACING_TARGET_RELAY,
                    event_id = %envelope.id,
                    topic = %envelope.topic,
                    shop = %envelope.shop,
                    error_code = err.error_code(),
                    error = %err,
                    "Stream submission failed, dropping event"
                );
                RelayOutcome::Dropped(DropReason::DeliveryFailed {
                    target: DeliveryTarget::Stream,
                })
            }
        }
    }

    /// Publishes a product-update notification to the event bus.
    async fn deliver_to_bus(&self, envelope: &Envelope) -> RelayOutcome {
        let notification = BusNotification::new(
            Self::BUS_SOURCE_PRODUCTS,
            Self::BUS_DETAIL_PRODUCT_UPDATED,
            serde_json::json!({
                "shop": envelope.shop,
                "eventId": envelope.id,
                "payload": envelope.payload,
            }),
        );

        match self.bus.notify(&notification).await {
            Ok(()) => {
                info!(
                    target: TRACING_TARGET_RELAY,
                    event_id = %envelope.id,
                    topic = %envelope.topic,
                    shop = %envelope.shop,
                    "Relayed event to bus"
                );
                RelayOutcome::Delivered(Delivery::Bus)
            }
            Err(err) => {
                warn!(
                    target: TRACING_TARGET_RELAY,
                    event_id = %envelope.id,
                    topic = %envelope.topic,
                    shop = %envelope.shop,
                    error_code = err.error_code(),
                    error = %err,
                    "Event bus notification failed, dropping event"
                );
                RelayOutcome::Dropped(DropReason::DeliveryFailed {
                    target: DeliveryTarget::Bus,
                })
            }
        }
    }

    /// Tears down the shop's settings on app uninstall.
    ///
    /// The uninstall notification itself is never relayed downstream.
    async fn handle_uninstall(&self, shop: &str) -> RelayOutcome {
        match self.settings.remove(shop).await {
            Ok(removed) => {
                info!(
                    target: TRACING_TARGET_RELAY,
                    shop = %shop,
                    removed = removed,
                    "App uninstalled, integration settings removed"
                );
                RelayOutcome::Dropped(DropReason::Uninstalled)
            }
            Err(err) => {
                warn!(
                    target: TRACING_TARGET_RELAY,
                    shop = %shop,
                    error = %err,
                    "Failed to remove settings on uninstall"
                );
                RelayOutcome::Dropped(DropReason::SettingsUnavailable)
            }
        }
    }

    /// Returns the settings provider used by this relay.
    pub fn settings(&self) -> &SharedSettingsProvider {
        &self.settings
    }
}

impl std::fmt::Debug for RelayService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayService")
            .field("bus_products_update", &self.bus_products_update)
            .finish_non_exhaustive()
    }
}
