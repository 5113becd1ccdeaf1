//! Lock-free metrics collection
//!
//! Plain relaxed atomic counters; recorded from any task without locking,
//! read for the periodic summary log.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

pub struct Metrics {
    started: Instant,
    request_ingested: AtomicU64,
    message_ingested: AtomicU64,
    malformed_payloads: AtomicU64,
    batches_flushed: AtomicU64,
    entries_persisted: AtomicU64,
    persist_failures: AtomicU64,
    dead_lettered: AtomicU64,
    broadcasts: AtomicU64,
    broadcast_deliveries: AtomicU64,
    broadcast_drops: AtomicU64,
    subscribers_joined: AtomicU64,
    subscribers_dropped: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            request_ingested: AtomicU64::new(0),
            message_ingested: AtomicU64::new(0),
            malformed_payloads: AtomicU64::new(0),
            batches_flushed: AtomicU64::new(0),
            entries_persisted: AtomicU64::new(0),
            persist_failures: AtomicU64::new(0),
            dead_lettered: AtomicU64::new(0),
            broadcasts: AtomicU64::new(0),
            broadcast_deliveries: AtomicU64::new(0),
            broadcast_drops: AtomicU64::new(0),
            subscribers_joined: AtomicU64::new(0),
            subscribers_dropped: AtomicU64::new(0),
        }
    }

    pub fn record_request_ingested(&self) {
        self.request_ingested.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_message_ingested(&self) {
        self.message_ingested.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_malformed_payload(&self) {
        self.malformed_payloads.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_batch_flushed(&self, entries: usize) {
        self.batches_flushed.fetch_add(1, Ordering::Relaxed);
        self.entries_persisted.fetch_add(entries as u64, Ordering::Relaxed);
    }

    pub fn record_persist_failure(&self) {
        self.persist_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dead_lettered(&self, entries: usize) {
        self.dead_lettered.fetch_add(entries as u64, Ordering::Relaxed);
    }

    pub fn record_broadcast(&self, delivered: usize) {
        self.broadcasts.fetch_add(1, Ordering::Relaxed);
        self.broadcast_deliveries.fetch_add(delivered as u64, Ordering::Relaxed);
    }

    pub fn record_broadcast_dropped(&self) {
        self.broadcast_drops.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_subscriber_joined(&self) {
        self.subscribers_joined.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_subscriber_dropped(&self) {
        self.subscribers_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Snapshot current counters.
    pub fn summary(&self, pending: usize, subscribers: usize) -> MetricsSummary {
        MetricsSummary {
            uptime_secs: self.started.elapsed().as_secs(),
            request_ingested: self.request_ingested.load(Ordering::Relaxed),
            message_ingested: self.message_ingested.load(Ordering::Relaxed),
            malformed_payloads: self.malformed_payloads.load(Ordering::Relaxed),
            batches_flushed: self.batches_flushed.load(Ordering::Relaxed),
            entries_persisted: self.entries_persisted.load(Ordering::Relaxed),
            persist_failures: self.persist_failures.load(Ordering::Relaxed),
            dead_lettered: self.dead_lettered.load(Ordering::Relaxed),
            broadcasts: self.broadcasts.load(Ordering::Relaxed),
            broadcast_deliveries: self.broadcast_deliveries.load(Ordering::Relaxed),
            broadcast_drops: self.broadcast_drops.load(Ordering::Relaxed),
            subscribers_joined: self.subscribers_joined.load(Ordering::Relaxed),
            subscribers_dropped: self.subscribers_dropped.load(Ordering::Relaxed),
            pending,
            subscribers,
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
pub struct MetricsSummary {
    pub uptime_secs: u64,
    pub request_ingested: u64,
    pub message_ingested: u64,
    pub malformed_payloads: u64,
    pub batches_flushed: u64,
    pub entries_persisted: u64,
    pub persist_failures: u64,
    pub dead_lettered: u64,
    pub broadcasts: u64,
    pub broadcast_deliveries: u64,
    pub broadcast_drops: u64,
    pub subscribers_joined: u64,
    pub subscribers_dropped: u64,
    pub pending: usize,
    pub subscribers: usize,
}

impl MetricsSummary {
    pub fn log(&self) {
        info!(
            uptime_secs = %self.uptime_secs,
            request_ingested = %self.request_ingested,
            message_ingested = %self.message_ingested,
            malformed = %self.malformed_payloads,
            batches_flushed = %self.batches_flushed,
            entries_persisted = %self.entries_persisted,
            persist_failures = %self.persist_failures,
            dead_lettered = %self.dead_lettered,
            broadcasts = %self.broadcasts,
            broadcast_drops = %self.broadcast_drops,
            pending = %self.pending,
            subscribers = %self.subscribers,
            "metrics_summary"
        );
    }
}
