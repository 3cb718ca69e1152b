//! In-memory test doubles for the relay seams.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use shoprelay_nats::stream::{BatchOutcome, RecordFailure, RecordReceipt, StreamHealth, StreamSink};
use shoprelay_nats::{BusNotification, BusSink, Envelope};
use shoprelay_postgres::model::{IntegrationSettings, NewIntegrationSettings};

use crate::Result;
use crate::service::SettingsProvider;

/// Records stream submissions instead of publishing them.
#[derive(Debug, Default)]
pub struct MockStreamSink {
    submissions: Mutex<Vec<Envelope>>,
    fail: bool,
    batch_reject_indices: Vec<usize>,
}

impl MockStreamSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink whose every submission fails.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// A sink that rejects the given batch indices and accepts the rest.
    pub fn rejecting_indices(indices: &[usize]) -> Self {
        Self {
            batch_reject_indices: indices.to_vec(),
            ..Self::default()
        }
    }

    /// Envelopes submitted so far.
    pub fn submissions(&self) -> Vec<Envelope> {
        self.submissions.lock().unwrap().clone()
    }
}

#[async_trait]
impl StreamSink for MockStreamSink {
    async fn submit(&self, envelope: &Envelope) -> shoprelay_nats::Result<RecordReceipt> {
        if self.fail {
            return Err(shoprelay_nats::Error::delivery_failed(
                "mock",
                "mock sink configured to fail",
            ));
        }

        let mut submissions = self.submissions.lock().unwrap();
        submissions.push(envelope.clone());
        Ok(RecordReceipt {
            sequence: submissions.len() as u64,
            stream: "MOCK".to_string(),
            subject: format!("mock.{}", envelope.shop),
        })
    }

    async fn submit_batch(&self, envelopes: &[Envelope]) -> shoprelay_nats::Result<BatchOutcome> {
        if envelopes.is_empty() {
            return Err(shoprelay_nats::Error::EmptyBatch);
        }
        if self.fail {
            return Err(shoprelay_nats::Error::delivery_failed(
                "mock",
                "mock sink configured to fail",
            ));
        }

        // Mirrors the real client: each element gets a fresh id, rejected
        // indices are accounted instead of aborting the batch.
        let mut outcome = BatchOutcome::default();
        let mut submissions = self.submissions.lock().unwrap();
        for (index, envelope) in envelopes.iter().enumerate() {
            if self.batch_reject_indices.contains(&index) {
                outcome.record_failure(RecordFailure::new(
                    index,
                    "Rejected",
                    "mock sink rejects this index",
                ));
                continue;
            }
            submissions.push(envelope.with_fresh_id());
            outcome.record_success();
        }
        Ok(outcome)
    }

    async fn health(&self) -> shoprelay_nats::Result<StreamHealth> {
        if self.fail {
            return Err(shoprelay_nats::Error::stream("MOCK", "unavailable"));
        }
        Ok(StreamHealth {
            stream: "MOCK".to_string(),
            messages: self.submissions.lock().unwrap().len() as u64,
            consumer_count: 0,
        })
    }
}

/// Records bus notifications instead of publishing them.
#[derive(Debug, Default)]
pub struct MockBusSink {
    notifications: Mutex<Vec<BusNotification>>,
    fail: bool,
}

impl MockBusSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink whose every notification fails.
    pub fn failing() -> Self {
        Self {
            notifications: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    /// Notifications published so far.
    pub fn notifications(&self) -> Vec<BusNotification> {
        self.notifications.lock().unwrap().clone()
    }
}

#[async_trait]
impl BusSink for MockBusSink {
    async fn notify(&self, notification: &BusNotification) -> shoprelay_nats::Result<()> {
        if self.fail {
            return Err(shoprelay_nats::Error::delivery_failed(
                "mock",
                "mock bus configured to fail",
            ));
        }
        self.notifications.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

/// In-memory settings store keyed by shop.
#[derive(Debug, Default)]
pub struct MemorySettings {
    shops: Mutex<HashMap<String, IntegrationSettings>>,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-populated with one shop.
    pub fn with_shop(shop: &str, enabled: bool) -> Self {
        let this = Self::new();
        this.insert_sync(shop, enabled);
        this
    }

    /// Inserts a shop without going through the async trait.
    pub fn insert_sync(&self, shop: &str, enabled: bool) {
        let now = jiff_diesel_now();
        self.shops.lock().unwrap().insert(
            shop.to_string(),
            IntegrationSettings {
                shop: shop.to_string(),
                is_enabled: enabled,
                installed_at: now,
                updated_at: now,
            },
        );
    }

    /// Reads a shop without going through the async trait.
    pub fn find_sync(&self, shop: &str) -> Option<IntegrationSettings> {
        self.shops.lock().unwrap().get(shop).cloned()
    }
}

fn jiff_diesel_now() -> jiff_diesel::Timestamp {
    jiff_diesel::Timestamp::from(jiff::Timestamp::now())
}

#[async_trait]
impl SettingsProvider for MemorySettings {
    async fn find(&self, shop: &str) -> Result<Option<IntegrationSettings>> {
        Ok(self.find_sync(shop))
    }

    async fn set_enabled(&self, shop: &str, enabled: bool) -> Result<Option<IntegrationSettings>> {
        let mut shops = self.shops.lock().unwrap();
        Ok(shops.get_mut(shop).map(|settings| {
            settings.is_enabled = enabled;
            settings.updated_at = jiff_diesel_now();
            settings.clone()
        }))
    }

    async fn upsert(&self, settings: NewIntegrationSettings) -> Result<IntegrationSettings> {
        let now = jiff_diesel_now();
        let mut shops = self.shops.lock().unwrap();
        let entry = shops
            .entry(settings.shop.clone())
            .and_modify(|existing| {
                existing.is_enabled = settings.is_enabled;
                existing.updated_at = now;
            })
            .or_insert_with(|| IntegrationSettings {
                shop: settings.shop.clone(),
                is_enabled: settings.is_enabled,
                installed_at: now,
                updated_at: now,
            });
        Ok(entry.clone())
    }

    async fn remove(&self, shop: &str) -> Result<bool> {
        Ok(self.shops.lock().unwrap().remove(shop).is_some())
    }

    async fn list(&self) -> Result<Vec<IntegrationSettings>> {
        let mut settings: Vec<_> = self.shops.lock().unwrap().values().cloned().collect();
        settings.sort_by(|a, b| a.shop.cmp(&b.shop));
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;
    use shoprelay_nats::EventTopic;

    use super::*;

    fn order_envelopes(count: usize) -> Vec<Envelope> {
        (0..count)
            .map(|n| {
                Envelope::new(
                    EventTopic::OrdersCreate,
                    "acme.example",
                    json!({"order_id": n}),
                )
            })
            .collect()
    }

    #[tokio::test]
    async fn test_batch_partial_failure_accounts_per_index() {
        let mock = Arc::new(MockStreamSink::rejecting_indices(&[1]));
        let sink: Arc<dyn StreamSink> = mock.clone();

        let envelopes = order_envelopes(3);
        let outcome = sink.submit_batch(&envelopes).await.unwrap();

        assert_eq!(outcome.success_count, 2);
        assert_eq!(outcome.failure_count, 1);
        assert_eq!(outcome.total(), 3);
        assert_eq!(outcome.failed_indices(), vec![1]);
        assert_eq!(outcome.failures[0].index, 1);
        assert!(!outcome.is_fully_successful());

        // Only the accepted records reached the stream.
        let submitted = mock.submissions();
        assert_eq!(submitted.len(), 2);
        assert_eq!(submitted[0].payload, json!({"order_id": 0}));
        assert_eq!(submitted[1].payload, json!({"order_id": 2}));
    }

    #[tokio::test]
    async fn test_batch_regenerates_ids_per_record() {
        let mock = Arc::new(MockStreamSink::new());
        let sink: Arc<dyn StreamSink> = mock.clone();

        let envelopes = order_envelopes(3);
        let outcome = sink.submit_batch(&envelopes).await.unwrap();
        assert!(outcome.is_fully_successful());

        let caller_ids: Vec<_> = envelopes.iter().map(|e| e.id.clone()).collect();
        for submitted in mock.submissions() {
            assert!(!caller_ids.contains(&submitted.id));
        }
    }

    #[tokio::test]
    async fn test_whole_batch_failure_is_an_error_not_accounting() {
        let sink: Arc<dyn StreamSink> = Arc::new(MockStreamSink::failing());

        let envelopes = order_envelopes(3);
        assert!(sink.submit_batch(&envelopes).await.is_err());
    }

    #[tokio::test]
    async fn test_empty_batch_is_rejected() {
        let sink: Arc<dyn StreamSink> = Arc::new(MockStreamSink::new());
        assert!(sink.submit_batch(&[]).await.is_err());
    }
}
