//! Single ingest operation shared by both ingress paths
//!
//! Both the HTTP request path and the MQTT message path call
//! `Ingestor::ingest`, so the batch-size accounting is enforced in one
//! place. The buffer lock is released before the store call runs; a
//! drained batch is considered consumed even if persistence fails, subject
//! to the configured failure policy.

use crate::domain::types::ProcessedAgentData;
use crate::infra::config::PersistFailurePolicy;
use crate::infra::metrics::Metrics;
use crate::io::dead_letter::DeadLetter;
use crate::io::store::StoreSink;
use crate::services::buffer::IngestionBuffer;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Delay between persistence re-attempts under the `retry` policy.
const RETRY_BACKOFF: Duration = Duration::from_millis(200);

pub struct Ingestor {
    buffer: IngestionBuffer,
    batch_size: usize,
    store: Arc<dyn StoreSink>,
    policy: PersistFailurePolicy,
    retry_attempts: u32,
    dead_letter: Option<DeadLetter>,
    metrics: Arc<Metrics>,
}

impl Ingestor {
    pub fn new(
        batch_size: usize,
        store: Arc<dyn StoreSink>,
        policy: PersistFailurePolicy,
        retry_attempts: u32,
        dead_letter: Option<DeadLetter>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            buffer: IngestionBuffer::new(),
            batch_size,
            store,
            policy,
            retry_attempts,
            dead_letter,
            metrics,
        }
    }

    /// Accept one labeled reading: push it, and flush a batch if the
    /// threshold is reached.
    ///
    /// Push, length check, and drain are one atomic region inside the
    /// buffer; the store call happens after the lock is released.
    pub async fn ingest(&self, entry: ProcessedAgentData) {
        if let Some(batch) = self.buffer.push_then_drain_ready(entry, self.batch_size) {
            self.flush(batch).await;
        }
    }

    /// Current number of pending readings.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    async fn flush(&self, batch: Vec<ProcessedAgentData>) {
        debug!(entries = %batch.len(), "batch_drained");

        match self.persist(&batch).await {
            Ok(()) => {
                self.metrics.record_batch_flushed(batch.len());
                info!(entries = %batch.len(), "batch_flushed");
            }
            Err(e) => {
                self.metrics.record_persist_failure();
                match self.policy {
                    PersistFailurePolicy::Drop | PersistFailurePolicy::Retry => {
                        error!(
                            entries = %batch.len(),
                            error = %e,
                            "batch_persist_failed_dropped"
                        );
                    }
                    PersistFailurePolicy::DeadLetter => {
                        let written = self
                            .dead_letter
                            .as_ref()
                            .map(|dl| dl.write_batch(&batch))
                            .unwrap_or(0);
                        self.metrics.record_dead_lettered(written);
                        error!(
                            entries = %batch.len(),
                            dead_lettered = %written,
                            error = %e,
                            "batch_persist_failed_dead_lettered"
                        );
                    }
                }
            }
        }
    }

    async fn persist(&self, batch: &[ProcessedAgentData]) -> anyhow::Result<()> {
        let mut last_err = match self.store.save_data(batch).await {
            Ok(()) => return Ok(()),
            Err(e) => e,
        };

        if self.policy != PersistFailurePolicy::Retry {
            return Err(last_err);
        }

        for attempt in 1..=self.retry_attempts {
            warn!(attempt = %attempt, error = %last_err, "batch_persist_retry");
            tokio::time::sleep(RETRY_BACKOFF).await;
            match self.store.save_data(batch).await {
                Ok(()) => return Ok(()),
                Err(e) => last_err = e,
            }
        }

        Err(last_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{AccelerometerData, AgentData, GpsData, RoadState};
    use anyhow::bail;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn entry(seq: f64) -> ProcessedAgentData {
        ProcessedAgentData::new(
            RoadState::Good,
            AgentData {
                accelerometer: AccelerometerData { x: seq, y: 0.0, z: 0.0 },
                gps: GpsData { latitude: 50.45, longitude: 30.52 },
                timestamp: "2024-03-15T14:34:20Z".parse().unwrap(),
            },
        )
    }

    /// Store mock that records every batch it receives.
    #[derive(Default)]
    struct RecordingStore {
        batches: Mutex<Vec<Vec<ProcessedAgentData>>>,
    }

    #[async_trait]
    impl StoreSink for RecordingStore {
        async fn save_data(&self, batch: &[ProcessedAgentData]) -> anyhow::Result<()> {
            self.batches.lock().push(batch.to_vec());
            Ok(())
        }
    }

    /// Store mock that fails the first `failures` calls, then succeeds.
    struct FlakyStore {
        failures: u32,
        calls: AtomicU32,
        batches: Mutex<Vec<Vec<ProcessedAgentData>>>,
    }

    impl FlakyStore {
        fn new(failures: u32) -> Self {
            Self { failures, calls: AtomicU32::new(0), batches: Mutex::new(Vec::new()) }
        }
    }

    #[async_trait]
    impl StoreSink for FlakyStore {
        async fn save_data(&self, batch: &[ProcessedAgentData]) -> anyhow::Result<()> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                bail!("store unavailable");
            }
            self.batches.lock().push(batch.to_vec());
            Ok(())
        }
    }

    fn ingestor(batch_size: usize, store: Arc<dyn StoreSink>) -> Ingestor {
        Ingestor::new(
            batch_size,
            store,
            PersistFailurePolicy::Drop,
            0,
            None,
            Arc::new(Metrics::new()),
        )
    }

    #[tokio::test]
    async fn test_flush_once_per_batch_size_pushes() {
        let store = Arc::new(RecordingStore::default());
        let ing = ingestor(3, store.clone());

        for i in 0..3 {
            ing.ingest(entry(i as f64)).await;
        }

        let batches = store.batches.lock();
        assert_eq!(batches.len(), 1);
        assert_eq!(
            batches[0].iter().map(|e| e.agent_data.accelerometer.x).collect::<Vec<_>>(),
            vec![0.0, 1.0, 2.0]
        );
        drop(batches);
        assert_eq!(ing.pending(), 0);
    }

    #[tokio::test]
    async fn test_flush_count_is_floor_of_pushes() {
        let store = Arc::new(RecordingStore::default());
        let ing = ingestor(3, store.clone());

        for i in 0..10 {
            ing.ingest(entry(i as f64)).await;
        }

        assert_eq!(store.batches.lock().len(), 3);
        assert_eq!(ing.pending(), 1);
    }

    #[tokio::test]
    async fn test_persist_failure_drops_batch() {
        let store = Arc::new(FlakyStore::new(u32::MAX));
        let ing = ingestor(2, store.clone());

        ing.ingest(entry(0.0)).await;
        ing.ingest(entry(1.0)).await;

        // Drained entries are consumed even though persistence failed
        assert_eq!(ing.pending(), 0);
        assert!(store.batches.lock().is_empty());

        // The buffer keeps accepting afterwards
        ing.ingest(entry(2.0)).await;
        assert_eq!(ing.pending(), 1);
    }

    #[tokio::test]
    async fn test_retry_policy_reattempts() {
        let store = Arc::new(FlakyStore::new(1));
        let ing = Ingestor::new(
            2,
            store.clone(),
            PersistFailurePolicy::Retry,
            3,
            None,
            Arc::new(Metrics::new()),
        );

        ing.ingest(entry(0.0)).await;
        ing.ingest(entry(1.0)).await;

        assert_eq!(store.calls.load(Ordering::SeqCst), 2);
        assert_eq!(store.batches.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_dead_letter_policy_writes_batch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dead_letter.jsonl");
        let store = Arc::new(FlakyStore::new(u32::MAX));
        let ing = Ingestor::new(
            2,
            store,
            PersistFailurePolicy::DeadLetter,
            0,
            Some(DeadLetter::new(path.to_str().unwrap())),
            Arc::new(Metrics::new()),
        );

        ing.ingest(entry(0.0)).await;
        ing.ingest(entry(1.0)).await;

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        for line in lines {
            let parsed: ProcessedAgentData = serde_json::from_str(line).unwrap();
            assert_eq!(parsed.road_state, RoadState::Good);
        }
    }
}
