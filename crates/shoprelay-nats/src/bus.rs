//! Fire-and-forget event bus notifications over core NATS.
//!
//! Unlike the stream path, bus notifications carry no delivery accounting:
//! the publish is flushed and forgotten, and failures never affect webhook
//! acknowledgment.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::client::NatsClient;
use crate::stream::partition_token;
use crate::{Error, Result, TRACING_TARGET_BUS};

/// A routable notification published to the event bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusNotification {
    /// Logical source of the notification, e.g. `shopify.products`.
    pub source: String,
    /// Routable notification kind, e.g. `product.updated`.
    pub detail_type: String,
    /// Structured notification body.
    pub detail: serde_json::Value,
}

impl BusNotification {
    /// Creates a new notification.
    pub fn new(
        source: impl Into<String>,
        detail_type: impl Into<String>,
        detail: serde_json::Value,
    ) -> Self {
        Self {
            source: source.into(),
            detail_type: detail_type.into(),
            detail,
        }
    }
}

/// Event bus seam for fire-and-forget notifications.
#[async_trait]
pub trait BusSink: Send + Sync {
    /// Publishes a notification; there is no delivery confirmation.
    async fn notify(&self, notification: &BusNotification) -> Result<()>;
}

/// Core-NATS implementation of [`BusSink`].
///
/// Notifications go out on `{prefix}.{source}.{detail_type}`, with the
/// source and detail type sanitized into single subject tokens so
/// subscribers can filter with subject wildcards.
#[derive(Debug, Clone)]
pub struct EventBusClient {
    client: async_nats::Client,
    subject_prefix: String,
}

impl EventBusClient {
    /// Default subject prefix for bus notifications.
    pub const DEFAULT_SUBJECT_PREFIX: &'static str = "shop-bus";

    /// Creates a bus client with the default subject prefix.
    pub fn new(nats: &NatsClient) -> Self {
        Self::with_subject_prefix(nats, Self::DEFAULT_SUBJECT_PREFIX)
    }

    /// Creates a bus client with a custom subject prefix.
    pub fn with_subject_prefix(nats: &NatsClient, prefix: impl Into<String>) -> Self {
        Self {
            client: nats.client().clone(),
            subject_prefix: prefix.into(),
        }
    }

    /// Returns the subject a notification is published on.
    pub fn subject_for(&self, notification: &BusNotification) -> String {
        format!(
            "{}.{}.{}",
            self.subject_prefix,
            partition_token(&notification.source),
            partition_token(&notification.detail_type)
        )
    }
}

#[async_trait]
impl BusSink for EventBusClient {
    #[instrument(skip(self, notification), target = TRACING_TARGET_BUS)]
    async fn notify(&self, notification: &BusNotification) -> Result<()> {
        let subject = self.subject_for(notification);
        let payload = serde_json::to_vec(&notification.detail)?;

        self.client
            .publish(subject.clone(), payload.into())
            .await
            .map_err(|e| Error::delivery_failed(&subject, e.to_string()))?;
        self.client
            .flush()
            .await
            .map_err(|e| Error::delivery_failed(&subject, e.to_string()))?;

        debug!(
            target: TRACING_TARGET_BUS,
            subject = %subject,
            source = %notification.source,
            detail_type = %notification.detail_type,
            "Published bus notification"
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_holds_fields() {
        let notification = BusNotification::new(
            "shopify.products",
            "product.updated",
            serde_json::json!({"id": 7}),
        );
        assert_eq!(notification.source, "shopify.products");
        assert_eq!(notification.detail_type, "product.updated");
        assert_eq!(notification.detail["id"], 7);
    }

    #[test]
    fn test_notification_serde_round_trip() {
        let notification = BusNotification::new(
            "shopify.products",
            "product.updated",
            serde_json::json!({"sku": "A-1"}),
        );
        let json = serde_json::to_string(&notification).unwrap();
        let parsed: BusNotification = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, notification);
    }
}
