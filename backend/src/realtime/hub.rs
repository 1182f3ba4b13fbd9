//! Subscriber group registry backed by broadcast channels
//!
//! ```text
//! Dispatcher (orders / stock / notifications services)
//!       │ publish(key, PushMessage)
//!       ▼
//! NotificationHub
//!   └── groups: SubscriptionKey → broadcast::Sender<PushMessage>
//!             │
//!             ▼
//! WebSocket sessions (each subscribed to its user key + role key)
//! ```
//!
//! Delivery is best-effort: a publish to a group with no live subscriber is
//! dropped, and the persisted notification row remains the source of truth.

use std::sync::Arc;

use dashmap::DashMap;
use shared::{PushMessage, SubscriptionKey};
use tokio::sync::broadcast;

/// Registry of live subscriber groups
#[derive(Clone)]
pub struct NotificationHub {
    groups: Arc<DashMap<SubscriptionKey, broadcast::Sender<PushMessage>>>,
    capacity: usize,
}

impl NotificationHub {
    pub fn new(capacity: usize) -> Self {
        Self {
            groups: Arc::new(DashMap::new()),
            capacity,
        }
    }

    /// Join a group, creating its channel on first use.
    ///
    /// The returned receiver keeps the group alive; once every receiver of
    /// a group is dropped the next publish prunes the entry.
    pub fn subscribe(&self, key: SubscriptionKey) -> broadcast::Receiver<PushMessage> {
        self.groups
            .entry(key)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Push a message to every session in the group. Returns the number of
    /// sessions reached; zero means the message was dropped.
    pub fn publish(&self, key: SubscriptionKey, message: PushMessage) -> usize {
        let reached = match self.groups.get(&key) {
            Some(tx) => tx.send(message).unwrap_or(0),
            None => 0,
        };

        if reached == 0 {
            tracing::trace!("no live session for {key}, push dropped");
            self.prune(key);
        }
        reached
    }

    /// Push the same message to several groups (e.g. a role plus admins)
    pub fn publish_many(&self, keys: &[SubscriptionKey], message: &PushMessage) -> usize {
        keys.iter()
            .map(|key| self.publish(*key, message.clone()))
            .sum()
    }

    /// Number of live sessions currently joined to the group
    pub fn subscriber_count(&self, key: SubscriptionKey) -> usize {
        self.groups
            .get(&key)
            .map(|tx| tx.receiver_count())
            .unwrap_or(0)
    }

    /// Drop the group entry once no receiver is left
    fn prune(&self, key: SubscriptionKey) {
        if let Some(entry) = self.groups.get(&key) {
            if entry.receiver_count() == 0 {
                drop(entry);
                self.groups.remove(&key);
            }
        }
    }
}
