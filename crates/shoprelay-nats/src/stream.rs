//! Partitioned event stream submission backed by JetStream.
//!
//! Envelopes are published to `{prefix}.{partition}` subjects where the
//! partition token is derived from the shop identifier. Same shop, same
//! subject, same relative order; nothing is guaranteed across shops.

use std::time::Duration;

use async_nats::jetstream::{self, stream};
use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, instrument, warn};

use crate::client::NatsClient;
use crate::envelope::Envelope;
use crate::{Error, Result, TRACING_TARGET_STREAM};

/// Outcome of a single-record submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordReceipt {
    /// Opaque sequence token assigned by the stream.
    pub sequence: u64,
    /// Name of the stream that stored the record.
    pub stream: String,
    /// Subject (shard) the record landed on.
    pub subject: String,
}

/// A single rejected record within a batch submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordFailure {
    /// Position of the record in the submitted batch.
    pub index: usize,
    /// Short machine-readable error code.
    pub error_code: String,
    /// Human-readable error description.
    pub error_message: String,
}

impl RecordFailure {
    /// Creates a new record failure entry.
    pub fn new(
        index: usize,
        error_code: impl Into<String>,
        error_message: impl Into<String>,
    ) -> Self {
        Self {
            index,
            error_code: error_code.into(),
            error_message: error_message.into(),
        }
    }
}

/// Per-record accounting for a batch submission.
///
/// A batch is not atomic: some records may succeed while others fail. The
/// caller decides whether to resubmit failed indices; no automatic
/// re-submission happens here.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct BatchOutcome {
    /// Number of records accepted by the stream.
    pub success_count: usize,
    /// Number of records rejected.
    pub failure_count: usize,
    /// One entry per rejected record, ordered by index.
    pub failures: Vec<RecordFailure>,
}

impl BatchOutcome {
    /// Records one accepted record.
    pub fn record_success(&mut self) {
        self.success_count += 1;
    }

    /// Records one rejected record.
    pub fn record_failure(&mut self, failure: RecordFailure) {
        self.failure_count += 1;
        self.failures.push(failure);
    }

    /// Total number of records accounted for.
    #[inline]
    pub fn total(&self) -> usize {
        self.success_count + self.failure_count
    }

    /// Returns true when every record was accepted.
    #[inline]
    pub fn is_fully_successful(&self) -> bool {
        self.failure_count == 0
    }

    /// Indices of the rejected records.
    pub fn failed_indices(&self) -> Vec<usize> {
        self.failures.iter().map(|f| f.index).collect()
    }

    fn sort_failures(&mut self) {
        self.failures.sort_by_key(|f| f.index);
    }
}

/// Health snapshot of the backing stream, for the diagnostic endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamHealth {
    /// Stream name.
    pub stream: String,
    /// Number of messages currently retained.
    pub messages: u64,
    /// Number of consumers attached to the stream.
    pub consumer_count: usize,
}

/// Stream submission seam.
///
/// The relay orchestrator and its tests depend on this trait rather than on
/// the JetStream client directly.
#[async_trait]
pub trait StreamSink: Send + Sync {
    /// Submits a single envelope; the partition key is the envelope's shop.
    async fn submit(&self, envelope: &Envelope) -> Result<RecordReceipt>;

    /// Submits a batch of envelopes in one pipelined round.
    ///
    /// Each element receives a freshly generated id and its own partition
    /// key. An `Err` means the batch call itself failed (nothing was
    /// submitted); an `Ok` carries per-record accounting and may contain
    /// partial failures.
    async fn submit_batch(&self, envelopes: &[Envelope]) -> Result<BatchOutcome>;

    /// Describes the backing stream to confirm it exists and is reachable.
    async fn health(&self) -> Result<StreamHealth>;
}

/// Options for the backing JetStream stream.
#[derive(Debug, Clone)]
pub struct StreamOptions {
    /// JetStream stream name.
    pub stream_name: String,
    /// Subject prefix; records land on `{prefix}.{partition}`.
    pub subject_prefix: String,
    /// Retention age for stored records.
    pub max_age: Duration,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            stream_name: "SHOP-EVENTS".to_string(),
            subject_prefix: "shop-events".to_string(),
            max_age: Duration::from_secs(24 * 3600),
        }
    }
}

impl StreamOptions {
    /// Creates options for the given stream name.
    pub fn new(stream_name: impl Into<String>) -> Self {
        Self {
            stream_name: stream_name.into(),
            ..Default::default()
        }
    }

    /// Sets the subject prefix.
    pub fn with_subject_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.subject_prefix = prefix.into();
        self
    }

    /// Sets the retention age.
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }
}

/// JetStream-backed implementation of [`StreamSink`].
#[derive(Debug, Clone)]
pub struct EventStreamClient {
    jetstream: jetstream::Context,
    options: StreamOptions,
}

impl EventStreamClient {
    /// Creates the client, provisioning the backing stream if it does not
    /// exist yet.
    #[instrument(skip(nats), target = TRACING_TARGET_STREAM)]
    pub async fn new(nats: &NatsClient, options: StreamOptions) -> Result<Self> {
        let jetstream = nats.jetstream().clone();

        let stream_config = stream::Config {
            name: options.stream_name.clone(),
            description: Some("Commerce webhook event stream".to_string()),
            subjects: vec![format!("{}.>", options.subject_prefix)],
            max_age: options.max_age,
            ..Default::default()
        };

        match jetstream.get_stream(&options.stream_name).await {
            Ok(_) => {
                debug!(
                    target: TRACING_TARGET_STREAM,
                    stream = %options.stream_name,
                    "Using existing stream"
                );
            }
            Err(_) => {
                debug!(
                    target: TRACING_TARGET_STREAM,
                    stream = %options.stream_name,
                    subject_prefix = %options.subject_prefix,
                    "Creating new stream"
                );
                jetstream
                    .create_stream(stream_config)
                    .await
                    .map_err(|e| Error::stream(&options.stream_name, e.to_string()))?;
            }
        }

        Ok(Self { jetstream, options })
    }

    /// Returns the stream name.
    #[inline]
    pub fn stream_name(&self) -> &str {
        &self.options.stream_name
    }

    /// Returns the subject a partition key maps to.
    pub fn subject_for(&self, partition_key: &str) -> String {
        format!(
            "{}.{}",
            self.options.subject_prefix,
            partition_token(partition_key)
        )
    }
}

#[async_trait]
impl StreamSink for EventStreamClient {
    async fn submit(&self, envelope: &Envelope) -> Result<RecordReceipt> {
        let mut record = envelope.clone();
        record.stamp_processed();

        let subject = self.subject_for(record.partition_key());
        let payload = serde_json::to_vec(&record)?;
        let payload_size = payload.len();

        let ack = self
            .jetstream
            .publish(subject.clone(), payload.into())
            .await
            .map_err(|e| Error::delivery_failed(&subject, e.to_string()))?
            .await
            .map_err(|e| Error::delivery_failed(&subject, e.to_string()))?;

        debug!(
            target: TRACING_TARGET_STREAM,
            event_id = %record.id,
            topic = %record.topic,
            shop = %record.shop,
            subject = %subject,
            sequence = ack.sequence,
            payload_size = payload_size,
            "Submitted event record"
        );

        Ok(RecordReceipt {
            sequence: ack.sequence,
            stream: ack.stream,
            subject,
        })
    }

    async fn submit_batch(&self, envelopes: &[Envelope]) -> Result<BatchOutcome> {
        if envelopes.is_empty() {
            return Err(Error::EmptyBatch);
        }

        // Serialize everything up front: a serialization failure rejects the
        // whole batch before anything reaches the wire, keeping "batch call
        // failed" distinct from per-record rejection.
        let mut records = Vec::with_capacity(envelopes.len());
        for envelope in envelopes {
            let mut record = envelope.with_fresh_id();
            record.stamp_processed();
            let subject = self.subject_for(record.partition_key());
            let payload = serde_json::to_vec(&record)?;
            records.push((record.id.clone(), subject, payload));
        }

        let batch_size = records.len();
        let mut outcome = BatchOutcome::default();
        let mut pending = Vec::with_capacity(batch_size);

        for (index, (record_id, subject, payload)) in records.into_iter().enumerate() {
            match self.jetstream.publish(subject.clone(), payload.into()).await {
                Ok(ack) => pending.push((index, record_id, subject, ack)),
                Err(err) => {
                    warn!(
                        target: TRACING_TARGET_STREAM,
                        index = index,
                        event_id = %record_id,
                        subject = %subject,
                        error = %err,
                        "Batch record rejected at send"
                    );
                    outcome.record_failure(RecordFailure::new(
                        index,
                        format!("{:?}", err.kind()),
                        err.to_string(),
                    ));
                }
            }
        }

        for (index, record_id, subject, ack) in pending {
            match ack.await {
                Ok(_) => outcome.record_success(),
                Err(err) => {
                    warn!(
                        target: TRACING_TARGET_STREAM,
                        index = index,
                        event_id = %record_id,
                        subject = %subject,
                        error = %err,
                        "Batch record not acknowledged"
                    );
                    outcome.record_failure(RecordFailure::new(
                        index,
                        format!("{:?}", err.kind()),
                        err.to_string(),
                    ));
                }
            }
        }

        outcome.sort_failures();

        debug!(
            target: TRACING_TARGET_STREAM,
            batch_size = batch_size,
            success_count = outcome.success_count,
            failure_count = outcome.failure_count,
            "Submitted event batch"
        );

        Ok(outcome)
    }

    async fn health(&self) -> Result<StreamHealth> {
        let mut stream = self
            .jetstream
            .get_stream(&self.options.stream_name)
            .await
            .map_err(|e| Error::stream(&self.options.stream_name, e.to_string()))?;

        let info = stream
            .info()
            .await
            .map_err(|e| Error::stream(&self.options.stream_name, e.to_string()))?;

        Ok(StreamHealth {
            stream: self.options.stream_name.clone(),
            messages: info.state.messages,
            consumer_count: info.state.consumer_count,
        })
    }
}

/// Maps a partition key to a single NATS subject token.
///
/// Shop domains contain dots, which would otherwise split into multiple
/// subject tokens and break per-shop ordering.
pub fn partition_token(partition_key: &str) -> String {
    let token: String = partition_key
        .trim()
        .chars()
        .map(|c| match c {
            '.' | '*' | '>' => '-',
            c if c.is_whitespace() => '-',
            c => c,
        })
        .collect();

    if token.is_empty() {
        "unknown".to_string()
    } else {
        token
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_token_sanitizes_subject_splitters() {
        assert_eq!(partition_token("acme.example"), "acme-example");
        assert_eq!(partition_token("a.b.c"), "a-b-c");
        assert_eq!(partition_token("shop with spaces"), "shop-with-spaces");
        assert_eq!(partition_token("wild*card>"), "wild-card-");
        assert_eq!(partition_token("   "), "unknown");
    }

    #[test]
    fn test_batch_outcome_accounting() {
        let mut outcome = BatchOutcome::default();
        outcome.record_success();
        outcome.record_failure(RecordFailure::new(1, "TimedOut", "ack timed out"));
        outcome.record_success();

        assert_eq!(outcome.total(), 3);
        assert_eq!(outcome.success_count, 2);
        assert_eq!(outcome.failure_count, 1);
        assert_eq!(outcome.failed_indices(), vec![1]);
        assert!(!outcome.is_fully_successful());
    }

    #[test]
    fn test_batch_outcome_each_rejected_index_once() {
        let mut outcome = BatchOutcome::default();
        for index in [4, 0, 2] {
            outcome.record_failure(RecordFailure::new(index, "StreamNotFound", "missing"));
        }
        outcome.record_success();
        outcome.record_success();
        outcome.sort_failures();

        assert_eq!(outcome.total(), 5);
        assert_eq!(outcome.failed_indices(), vec![0, 2, 4]);

        let mut seen = outcome.failed_indices();
        seen.dedup();
        assert_eq!(seen.len(), outcome.failure_count);
    }

    #[test]
    fn test_stream_options_defaults() {
        let options = StreamOptions::default();
        assert_eq!(options.stream_name, "SHOP-EVENTS");
        assert_eq!(options.subject_prefix, "shop-events");
        assert_eq!(options.max_age, Duration::from_secs(86_400));
    }

    #[test]
    fn test_stream_options_builder() {
        let options = StreamOptions::new("ORDERS")
            .with_subject_prefix("orders")
            .with_max_age(Duration::from_secs(600));
        assert_eq!(options.stream_name, "ORDERS");
        assert_eq!(options.subject_prefix, "orders");
        assert_eq!(options.max_age, Duration::from_secs(600));
    }
}
