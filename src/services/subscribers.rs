//! Live subscriber registry and fan-out
//!
//! Membership is a set of bounded channel senders, one per connected
//! subscriber. Broadcast snapshots the membership, delivers best-effort
//! per handle, and removes handles whose channel has closed. The
//! membership lock is never held across a send.

use crate::infra::metrics::Metrics;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};

/// Outbound queue depth per subscriber connection.
pub const SUBSCRIBER_CHANNEL_CAPACITY: usize = 64;

/// Newtype wrapper for subscriber handles to provide type safety
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct SubscriberId(pub u64);

impl std::fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub struct SubscriberRegistry {
    next_id: AtomicU64,
    members: Mutex<FxHashMap<SubscriberId, mpsc::Sender<String>>>,
    metrics: Arc<Metrics>,
}

impl SubscriberRegistry {
    pub fn new(metrics: Arc<Metrics>) -> Self {
        Self {
            next_id: AtomicU64::new(1),
            members: Mutex::new(FxHashMap::default()),
            metrics,
        }
    }

    /// Add a handle to the membership set.
    pub fn join(&self, tx: mpsc::Sender<String>) -> SubscriberId {
        let id = SubscriberId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.members.lock().insert(id, tx);
        self.metrics.record_subscriber_joined();
        id
    }

    /// Remove a handle. Leaving an absent handle is a no-op.
    pub fn leave(&self, id: SubscriberId) {
        self.members.lock().remove(&id);
    }

    pub fn count(&self) -> usize {
        self.members.lock().len()
    }

    /// Deliver `payload` to every currently-joined handle.
    ///
    /// Membership is snapshotted at call time; handles joining during the
    /// fan-out are not guaranteed this message. A closed channel
    /// (disconnected subscriber) is removed from membership; a full channel
    /// drops this payload for that handle only. Returns the number of
    /// handles the payload was queued for.
    pub fn broadcast(&self, payload: &str) -> usize {
        let snapshot: Vec<(SubscriberId, mpsc::Sender<String>)> = {
            let members = self.members.lock();
            members.iter().map(|(id, tx)| (*id, tx.clone())).collect()
        };

        if snapshot.is_empty() {
            return 0;
        }

        let mut delivered = 0;
        let mut disconnected = Vec::new();
        for (id, tx) in snapshot {
            match tx.try_send(payload.to_string()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    self.metrics.record_broadcast_dropped();
                    debug!(subscriber = %id, "broadcast_dropped: subscriber queue full");
                }
                Err(TrySendError::Closed(_)) => disconnected.push(id),
            }
        }

        if !disconnected.is_empty() {
            let mut members = self.members.lock();
            for id in disconnected {
                if members.remove(&id).is_some() {
                    self.metrics.record_subscriber_dropped();
                    warn!(subscriber = %id, "subscriber_removed: channel closed");
                }
            }
        }

        self.metrics.record_broadcast(delivered);
        delivered
    }
}
