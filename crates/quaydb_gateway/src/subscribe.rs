//! Subscription feed for asynchronous meta head notifications.
//!
//! Each subscriber owns a bounded event queue; delivery never blocks
//! and a failing or slow consumer never wedges the transport. On a
//! transport without push capability the feed simply never fires and
//! callers poll via `get` instead.

use parking_lot::RwLock;
use quaydb_sync_protocol::MetaRecord;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{sync_channel, Receiver, SyncSender, TrySendError};
use std::sync::Arc;
use tracing::warn;

/// Per-subscriber queue depth.
const EVENT_QUEUE_DEPTH: usize = 64;

/// A meta change delivered to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub struct MetaChange {
    /// Pointer the change belongs to.
    pub pointer: String,
    /// New live heads.
    pub records: Vec<MetaRecord>,
}

struct Subscriber {
    pointer: String,
    sender: SyncSender<MetaChange>,
}

/// Registry of meta change subscribers.
#[derive(Default)]
pub struct SubscriptionFeed {
    subscribers: RwLock<HashMap<u64, Subscriber>>,
    next_id: AtomicU64,
}

impl SubscriptionFeed {
    /// Creates an empty feed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers interest in a pointer. Returns the unsubscribe handle
    /// and the receiving end of the subscriber's queue.
    pub fn subscribe(
        self: &Arc<Self>,
        pointer: &str,
    ) -> (Subscription, Receiver<MetaChange>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = sync_channel(EVENT_QUEUE_DEPTH);
        self.subscribers.write().insert(
            id,
            Subscriber {
                pointer: pointer.to_string(),
                sender: tx,
            },
        );
        (
            Subscription {
                id,
                feed: Arc::clone(self),
            },
            rx,
        )
    }

    /// Delivers a change to every subscriber of its pointer.
    ///
    /// Disconnected subscribers are pruned; a full queue drops the
    /// change for that subscriber rather than blocking.
    pub fn deliver(&self, change: MetaChange) {
        let mut subscribers = self.subscribers.write();
        let mut dead = Vec::new();
        for (id, sub) in subscribers.iter() {
            if sub.pointer != change.pointer {
                continue;
            }
            match sub.sender.try_send(change.clone()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    warn!(pointer = %change.pointer, "subscriber queue full, change dropped");
                }
                Err(TrySendError::Disconnected(_)) => dead.push(*id),
            }
        }
        for id in dead {
            subscribers.remove(&id);
        }
    }

    /// Number of registered subscribers.
    pub fn len(&self) -> usize {
        self.subscribers.read().len()
    }

    /// True if nothing is subscribed.
    pub fn is_empty(&self) -> bool {
        self.subscribers.read().is_empty()
    }

    fn remove(&self, id: u64) {
        self.subscribers.write().remove(&id);
    }
}

/// Unsubscribe handle returned by [`SubscriptionFeed::subscribe`].
///
/// Dropping the handle unsubscribes.
pub struct Subscription {
    id: u64,
    feed: Arc<SubscriptionFeed>,
}

impl Subscription {
    /// Explicitly ends the subscription.
    pub fn unsubscribe(self) {
        // Drop does the work
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.feed.remove(self.id);
    }
}
