//! Normalized event envelope and the closed set of commerce lifecycle topics.

use jiff::Timestamp;
use rand::Rng;
use rand::distr::Alphanumeric;
use serde::{Deserialize, Serialize};

/// Length of the random suffix appended to generated event identifiers.
const EVENT_ID_SUFFIX_LEN: usize = 9;

/// Commerce lifecycle topics accepted by the relay.
///
/// Downstream consumers match on the wire names below; anything outside this
/// set cannot be interpreted and is dropped before submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(Serialize, Deserialize)]
#[derive(strum::Display, strum::EnumString, strum::EnumIter)]
pub enum EventTopic {
    #[serde(rename = "products/create")]
    #[strum(serialize = "products/create")]
    ProductsCreate,

    #[serde(rename = "products/update")]
    #[strum(serialize = "products/update")]
    ProductsUpdate,

    #[serde(rename = "products/delete")]
    #[strum(serialize = "products/delete")]
    ProductsDelete,

    #[serde(rename = "orders/create")]
    #[strum(serialize = "orders/create")]
    OrdersCreate,

    #[serde(rename = "orders/updated")]
    #[strum(serialize = "orders/updated")]
    OrdersUpdated,

    #[serde(rename = "orders/cancelled")]
    #[strum(serialize = "orders/cancelled")]
    OrdersCancelled,

    #[serde(rename = "inventory_levels/update")]
    #[strum(serialize = "inventory_levels/update")]
    InventoryLevelsUpdate,

    #[serde(rename = "fulfillments/create")]
    #[strum(serialize = "fulfillments/create")]
    FulfillmentsCreate,

    #[serde(rename = "fulfillments/update")]
    #[strum(serialize = "fulfillments/update")]
    FulfillmentsUpdate,

    #[serde(rename = "app/uninstalled")]
    #[strum(serialize = "app/uninstalled")]
    AppUninstalled,

    #[serde(rename = "customers/redact")]
    #[strum(serialize = "customers/redact")]
    CustomersRedact,

    #[serde(rename = "customers/data_request")]
    #[strum(serialize = "customers/data_request")]
    CustomersDataRequest,

    #[serde(rename = "shop/redact")]
    #[strum(serialize = "shop/redact")]
    ShopRedact,
}

impl EventTopic {
    /// Returns the wire name of the topic.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ProductsCreate => "products/create",
            Self::ProductsUpdate => "products/update",
            Self::ProductsDelete => "products/delete",
            Self::OrdersCreate => "orders/create",
            Self::OrdersUpdated => "orders/updated",
            Self::OrdersCancelled => "orders/cancelled",
            Self::InventoryLevelsUpdate => "inventory_levels/update",
            Self::FulfillmentsCreate => "fulfillments/create",
            Self::FulfillmentsUpdate => "fulfillments/update",
            Self::AppUninstalled => "app/uninstalled",
            Self::CustomersRedact => "customers/redact",
            Self::CustomersDataRequest => "customers/data_request",
            Self::ShopRedact => "shop/redact",
        }
    }

    /// Returns true for the app uninstall topic, which tears down the shop's
    /// integration settings instead of being relayed.
    #[inline]
    pub const fn is_uninstall(self) -> bool {
        matches!(self, Self::AppUninstalled)
    }
}

/// Normalized event record submitted to a downstream pipeline.
///
/// The envelope is built at receipt time by the relay; `payload` is passed
/// through unmodified and its shape is determined by `topic`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    /// Unique identifier, assigned exactly once per envelope.
    pub id: String,

    /// Lifecycle topic from the closed set.
    pub topic: EventTopic,

    /// Originating store identifier; doubles as the partition key.
    pub shop: String,

    /// Opaque structured payload, passed through unmodified.
    pub payload: serde_json::Value,

    /// When the relay received the event.
    pub timestamp: Timestamp,

    /// Stamped immediately before submission to a downstream pipeline.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed_at: Option<Timestamp>,
}

impl Envelope {
    /// Builds a new envelope with a freshly generated id and the receipt
    /// timestamp set to now.
    pub fn new(topic: EventTopic, shop: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            id: generate_event_id(),
            topic,
            shop: shop.into(),
            payload,
            timestamp: Timestamp::now(),
            processed_at: None,
        }
    }

    /// Returns a copy with a freshly generated id.
    ///
    /// Batch submission regenerates ids per record rather than reusing the
    /// caller's, so a resubmitted record never collides with the original.
    pub fn with_fresh_id(&self) -> Self {
        Self {
            id: generate_event_id(),
            ..self.clone()
        }
    }

    /// Stamps the pre-submission timestamp.
    pub fn stamp_processed(&mut self) {
        self.processed_at = Some(Timestamp::now());
    }

    /// The partition key used for stream submission.
    ///
    /// Always the shop identifier: all events for one shop land in the same
    /// partition, preserving relative order for that shop. Cross-shop
    /// ordering is not guaranteed.
    #[inline]
    pub fn partition_key(&self) -> &str {
        &self.shop
    }
}

/// Generates an event identifier of the form `evt_{unix_millis}_{suffix}`.
///
/// Not globally deduplicated; the millisecond prefix plus a 9-character
/// alphanumeric suffix keeps collisions negligible at relay volumes.
pub fn generate_event_id() -> String {
    let millis = Timestamp::now().as_millisecond();
    let suffix: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(EVENT_ID_SUFFIX_LEN)
        .map(char::from)
        .collect();
    format!("evt_{millis}_{suffix}")
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn test_topic_wire_names_round_trip() {
        for topic in EventTopic::iter() {
            let parsed: EventTopic = topic.as_str().parse().unwrap();
            assert_eq!(parsed, topic);
            assert_eq!(topic.to_string(), topic.as_str());
        }
    }

    #[test]
    fn test_topic_serde_uses_wire_names() {
        let json = serde_json::to_string(&EventTopic::OrdersCreate).unwrap();
        assert_eq!(json, "\"orders/create\"");

        let parsed: EventTopic = serde_json::from_str("\"inventory_levels/update\"").unwrap();
        assert_eq!(parsed, EventTopic::InventoryLevelsUpdate);
    }

    #[test]
    fn test_unknown_topic_is_rejected() {
        assert!("products/archived".parse::<EventTopic>().is_err());
        assert!(serde_json::from_str::<EventTopic>("\"carts/create\"").is_err());
    }

    #[test]
    fn test_partition_key_is_shop() {
        let envelope = Envelope::new(
            EventTopic::OrdersCreate,
            "acme.example",
            serde_json::json!({"order_id": 42}),
        );
        assert_eq!(envelope.partition_key(), "acme.example");
    }

    #[test]
    fn test_event_id_unique_across_10k_generations() {
        let ids: HashSet<String> = (0..10_000).map(|_| generate_event_id()).collect();
        assert_eq!(ids.len(), 10_000);
    }

    #[test]
    fn test_fresh_id_differs_and_preserves_content() {
        let envelope = Envelope::new(
            EventTopic::ProductsCreate,
            "acme.example",
            serde_json::json!({"sku": "A-1"}),
        );
        let copy = envelope.with_fresh_id();

        assert_ne!(copy.id, envelope.id);
        assert_eq!(copy.shop, envelope.shop);
        assert_eq!(copy.topic, envelope.topic);
        assert_eq!(copy.payload, envelope.payload);
    }

    #[test]
    fn test_envelope_serializes_camel_case() {
        let mut envelope = Envelope::new(
            EventTopic::OrdersCreate,
            "acme.example",
            serde_json::json!({}),
        );
        envelope.stamp_processed();

        let value = serde_json::to_value(&envelope).unwrap();
        assert!(value.get("processedAt").is_some());
        assert!(value.get("timestamp").is_some());
        assert_eq!(value["topic"], "orders/create");
    }
}
