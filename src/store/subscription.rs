//! Subscription handles and the per-store subscriber registry.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::path::{self, StorePath};
use super::Snapshot;

/// Lifecycle of one subscription handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    /// Subscribed, nothing delivered yet.
    AwaitingFirstValue,
    /// At least one snapshot delivered.
    Live,
    /// Released by the caller, or the store went away.
    Unsubscribed,
}

struct Subscriber {
    path: StorePath,
    tx: mpsc::UnboundedSender<Snapshot>,
    /// Last value delivered; `None` until something exists at the path.
    last: Option<Value>,
}

/// Subscribers of one store.
#[derive(Default)]
pub(crate) struct Registry {
    next_id: AtomicU64,
    subscribers: Mutex<HashMap<u64, Subscriber>>,
}

impl Registry {
    /// Register a subscriber and queue the initial snapshot if a value exists.
    pub(crate) fn register(
        self: &Arc<Self>,
        path: StorePath,
        root: &Value,
        version: u64,
    ) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();

        let current = path::get(root, &path);
        let last = if current.is_null() {
            None
        } else {
            // Receiver is alive; it is returned below.
            let _ = tx.send(Snapshot {
                path: path.to_string(),
                value: current.clone(),
                version,
            });
            Some(current)
        };

        let path_str = path.to_string();
        self.lock().insert(id, Subscriber { path, tx, last });
        debug!(id, path = %path_str, "subscribed");

        Subscription {
            id,
            path: path_str,
            rx,
            registry: Arc::downgrade(self),
            state: SubscriptionState::AwaitingFirstValue,
        }
    }

    /// Deliver the new value to every subscriber whose view changed.
    ///
    /// `version_of` maps a subscriber path to its current version.
    pub(crate) fn notify(
        &self,
        changed: &StorePath,
        root: &Value,
        version_of: impl Fn(&StorePath) -> u64,
    ) {
        let mut subs = self.lock();
        let mut closed = Vec::new();

        for (id, sub) in subs.iter_mut() {
            if !sub.path.overlaps(changed) {
                continue;
            }
            let value = path::get(root, &sub.path);
            let unchanged = match &sub.last {
                Some(prev) => *prev == value,
                None => value.is_null(),
            };
            if unchanged {
                continue;
            }

            let snapshot = Snapshot {
                path: sub.path.to_string(),
                value: value.clone(),
                version: version_of(&sub.path),
            };
            if sub.tx.send(snapshot).is_err() {
                closed.push(*id);
                continue;
            }
            sub.last = if value.is_null() { None } else { Some(value) };
        }

        for id in closed {
            subs.remove(&id);
        }
    }

    fn remove(&self, id: u64) -> bool {
        self.lock().remove(&id).is_some()
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<u64, Subscriber>> {
        self.subscribers.lock().unwrap_or_else(|e| {
            warn!("Subscriber registry mutex poisoned, recovering");
            e.into_inner()
        })
    }
}

/// Stream of snapshots for one path.
///
/// Dropping the handle unsubscribes.
pub struct Subscription {
    id: u64,
    path: String,
    rx: mpsc::UnboundedReceiver<Snapshot>,
    registry: Weak<Registry>,
    state: SubscriptionState,
}

impl Subscription {
    pub fn path(&self) -> &str {
        &self.path
    }

    pub const fn state(&self) -> SubscriptionState {
        self.state
    }

    /// Wait for the next snapshot.
    ///
    /// Returns `None` once unsubscribed or when the store has shut down.
    pub async fn next(&mut self) -> Option<Snapshot> {
        if self.state == SubscriptionState::Unsubscribed {
            return None;
        }
        let received = self.rx.recv().await;
        self.on_received(received)
    }

    /// Non-blocking variant of [`next`](Self::next).
    pub fn try_next(&mut self) -> Option<Snapshot> {
        if self.state == SubscriptionState::Unsubscribed {
            return None;
        }
        match self.rx.try_recv() {
            Ok(snapshot) => self.on_received(Some(snapshot)),
            Err(mpsc::error::TryRecvError::Empty) => None,
            Err(mpsc::error::TryRecvError::Disconnected) => self.on_received(None),
        }
    }

    fn on_received(&mut self, received: Option<Snapshot>) -> Option<Snapshot> {
        if received.is_some() {
            self.state = SubscriptionState::Live;
        } else {
            warn!(path = %self.path, "Subscription stream closed by store");
            self.state = SubscriptionState::Unsubscribed;
        }
        received
    }

    /// Release the subscription. Idempotent.
    pub fn unsubscribe(&mut self) {
        if self.state == SubscriptionState::Unsubscribed {
            return;
        }
        self.state = SubscriptionState::Unsubscribed;
        self.rx.close();
        if let Some(registry) = self.registry.upgrade() {
            if registry.remove(self.id) {
                debug!(id = self.id, path = %self.path, "unsubscribed");
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("path", &self.path)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
