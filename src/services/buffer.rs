//! Ingestion buffer - the single shared mutable resource of the hub
//!
//! An ordered FIFO of pending labeled readings fed by two producers (the
//! HTTP request path and the MQTT message path). The batch invariant lives
//! here: push, threshold check, and drain happen inside one critical
//! section so that no two concurrent flows can both observe
//! threshold-reached and double-drain.

use crate::domain::types::ProcessedAgentData;
use parking_lot::Mutex;
use std::collections::VecDeque;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BufferError {
    /// Drain requested more entries than are buffered. Indicates a caller
    /// bug: the flush trigger must check length and drain atomically.
    #[error("insufficient data: requested {requested}, buffered {available}")]
    InsufficientData { requested: usize, available: usize },
}

/// FIFO queue of pending readings, safe for concurrent producers.
#[derive(Debug, Default)]
pub struct IngestionBuffer {
    inner: Mutex<VecDeque<ProcessedAgentData>>,
}

impl IngestionBuffer {
    pub fn new() -> Self {
        Self { inner: Mutex::new(VecDeque::new()) }
    }

    /// Append one entry to the tail.
    pub fn push(&self, entry: ProcessedAgentData) {
        self.inner.lock().push_back(entry);
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Remove and return the `n` oldest entries, oldest first.
    ///
    /// Fails without removing anything if fewer than `n` entries are
    /// buffered.
    pub fn drain(&self, n: usize) -> Result<Vec<ProcessedAgentData>, BufferError> {
        let mut queue = self.inner.lock();
        if queue.len() < n {
            return Err(BufferError::InsufficientData { requested: n, available: queue.len() });
        }
        Ok(queue.drain(..n).collect())
    }

    /// Push one entry, then drain a batch if the threshold is reached.
    ///
    /// The push, length check, and drain are one critical section, so for
    /// every `batch_size` accepted pushes exactly one batch of exactly
    /// `batch_size` entries comes out, regardless of producer interleaving.
    pub fn push_then_drain_ready(
        &self,
        entry: ProcessedAgentData,
        batch_size: usize,
    ) -> Option<Vec<ProcessedAgentData>> {
        let mut queue = self.inner.lock();
        queue.push_back(entry);
        if queue.len() >= batch_size {
            Some(queue.drain(..batch_size).collect())
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{AccelerometerData, AgentData, GpsData, RoadState};
    use std::sync::Arc;

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

    fn seq_of(e: &ProcessedAgentData) -> f64 {
        e.agent_data.accelerometer.x
    }

    #[test]
    fn test_drain_fifo_order() {
        let buffer = IngestionBuffer::new();
        for i in 0..5 {
            buffer.push(entry(i as f64));
        }

        let batch = buffer.drain(3).unwrap();
        assert_eq!(batch.iter().map(seq_of).collect::<Vec<_>>(), vec![0.0, 1.0, 2.0]);
        assert_eq!(buffer.len(), 2);

        let rest = buffer.drain(2).unwrap();
        assert_eq!(rest.iter().map(seq_of).collect::<Vec<_>>(), vec![3.0, 4.0]);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_drain_insufficient_data() {
        let buffer = IngestionBuffer::new();
        buffer.push(entry(0.0));

        let err = buffer.drain(2).unwrap_err();
        assert_eq!(err, BufferError::InsufficientData { requested: 2, available: 1 });
        // Nothing was removed by the failed drain
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    fn test_push_then_drain_ready_threshold() {
        let buffer = IngestionBuffer::new();
        assert!(buffer.push_then_drain_ready(entry(0.0), 3).is_none());
        assert!(buffer.push_then_drain_ready(entry(1.0), 3).is_none());

        let batch = buffer.push_then_drain_ready(entry(2.0), 3).unwrap();
        assert_eq!(batch.iter().map(seq_of).collect::<Vec<_>>(), vec![0.0, 1.0, 2.0]);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_concurrent_producers_flush_accounting() {
        // Two producer threads, N total pushes: exactly floor(N / batch)
        // batches of exactly `batch` entries, no entry drained twice, none
        // skipped.
        let buffer = Arc::new(IngestionBuffer::new());
        let batch_size = 3;
        let per_thread = 50;

        let mut handles = Vec::new();
        for t in 0..2 {
            let buffer = Arc::clone(&buffer);
            handles.push(std::thread::spawn(move || {
                let mut batches = Vec::new();
                for i in 0..per_thread {
                    let seq = (t * per_thread + i) as f64;
                    if let Some(batch) = buffer.push_then_drain_ready(entry(seq), batch_size) {
                        batches.push(batch);
                    }
                }
                batches
            }));
        }

        let mut all_batches = Vec::new();
        for handle in handles {
            all_batches.extend(handle.join().unwrap());
        }

        let total_pushed = 2 * per_thread;
        assert_eq!(all_batches.len(), total_pushed / batch_size);
        assert!(all_batches.iter().all(|b| b.len() == batch_size));

        let mut seen: Vec<f64> =
            all_batches.iter().flatten().map(seq_of).collect();
        seen.sort_by(|a, b| a.partial_cmp(b).unwrap());
        seen.dedup();
        assert_eq!(seen.len(), total_pushed - total_pushed % batch_size);
        assert_eq!(buffer.len(), total_pushed % batch_size);
    }
}
