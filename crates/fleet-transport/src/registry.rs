//! Connection registry: tracks every open WebSocket client, its at-most-one
//! session subscription, and fans out `messages` batches and lifecycle
//! broadcasts (spec §4.7).
//!
//! Owned entirely by this module — other components interact through
//! `register`/`subscribe`/`publish`, never by reaching into the maps
//! directly (spec §5's shared-resource policy).

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::frames::ServerFrame;

/// Bound on each client's outbound channel. A client that falls behind has
/// its stale frames dropped rather than blocking fan-out for everyone else
/// (spec §5, Backpressure).
const CLIENT_CHANNEL_CAPACITY: usize = 256;

pub type ClientId = u64;

struct ClientEntry {
    sender: mpsc::Sender<ServerFrame>,
    session_id: Option<String>,
}

#[derive(Default)]
pub struct Registry {
    clients: Mutex<HashMap<ClientId, ClientEntry>>,
    subscriptions: Mutex<HashMap<String, HashSet<ClientId>>>,
    next_id: AtomicU64,
}

/// Outcome of a (re)subscription: the session the client left, if any, so
/// the caller (the tailer supervisor) can decrement that session's
/// refcount and tear it down when it hits zero.
pub struct SubscriptionChange {
    pub previous_session_id: Option<String>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new client connection and return its id plus the
    /// receiving half of its outbound channel.
    pub fn register(&self) -> (ClientId, mpsc::Receiver<ServerFrame>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(CLIENT_CHANNEL_CAPACITY);
        self.clients.lock().insert(
            id,
            ClientEntry {
                sender: tx,
                session_id: None,
            },
        );
        (id, rx)
    }

    /// Drop a client: clears its subscription and removes it from the
    /// registry. Returns the session it was subscribed to, if any.
    pub fn unregister(&self, client_id: ClientId) -> Option<String> {
        let session_id = self
            .clients
            .lock()
            .remove(&client_id)
            .and_then(|entry| entry.session_id);

        if let Some(session_id) = &session_id {
            self.remove_from_subscription_set(session_id, client_id);
        }
        session_id
    }

    /// (Re)subscribe `client_id` to `session_id`. Subscribing replaces any
    /// prior subscription (spec §4.7).
    pub fn subscribe(&self, client_id: ClientId, session_id: String) -> SubscriptionChange {
        let previous = {
            let mut clients = self.clients.lock();
            let Some(entry) = clients.get_mut(&client_id) else {
                return SubscriptionChange {
                    previous_session_id: None,
                };
            };
            let previous = entry.session_id.replace(session_id.clone());
            previous
        };

        if let Some(previous) = &previous {
            if previous != &session_id {
                self.remove_from_subscription_set(previous, client_id);
            }
        }
        self.subscriptions
            .lock()
            .entry(session_id)
            .or_default()
            .insert(client_id);

        SubscriptionChange {
            previous_session_id: previous,
        }
    }

    /// Drop `client_id`'s subscription, if any. Returns the session it left.
    pub fn unsubscribe(&self, client_id: ClientId) -> Option<String> {
        let previous = {
            let mut clients = self.clients.lock();
            clients.get_mut(&client_id).and_then(|e| e.session_id.take())
        };
        if let Some(previous) = &previous {
            self.remove_from_subscription_set(previous, client_id);
        }
        previous
    }

    fn remove_from_subscription_set(&self, session_id: &str, client_id: ClientId) {
        let mut subs = self.subscriptions.lock();
        if let Some(set) = subs.get_mut(session_id) {
            set.remove(&client_id);
            if set.is_empty() {
                subs.remove(session_id);
            }
        }
    }

    /// Deliver `frame` to exactly one client, bypassing subscriptions
    /// entirely. Used for direct replies (e.g. a `bad-frame` error) that
    /// have nothing to do with session fan-out.
    pub fn send_to(&self, client_id: ClientId, frame: ServerFrame) -> bool {
        let clients = self.clients.lock();
        clients
            .get(&client_id)
            .map(|entry| entry.sender.try_send(frame).is_ok())
            .unwrap_or(false)
    }

    pub fn subscriber_count(&self, session_id: &str) -> usize {
        self.subscriptions
            .lock()
            .get(session_id)
            .map(HashSet::len)
            .unwrap_or(0)
    }

    /// Deliver `frame` to every client subscribed to `session_id`. A full
    /// client channel drops this frame for that client only; fan-out to
    /// the rest is unaffected.
    pub fn publish(&self, session_id: &str, frame: ServerFrame) {
        let subscribers: Vec<ClientId> = self
            .subscriptions
            .lock()
            .get(session_id)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default();

        if subscribers.is_empty() {
            return;
        }

        let clients = self.clients.lock();
        for client_id in subscribers {
            if let Some(entry) = clients.get(&client_id) {
                if entry.sender.try_send(frame.clone()).is_err() {
                    tracing::warn!(
                        client_id,
                        session_id,
                        "dropping stale frame for slow client"
                    );
                }
            }
        }
    }

    /// Deliver `frame` to every connected client, subscribed or not (spec
    /// §4.7: lifecycle broadcasts are not subscription-scoped).
    pub fn broadcast(&self, frame: ServerFrame) {
        let clients = self.clients.lock();
        for entry in clients.values() {
            if entry.sender.try_send(frame.clone()).is_err() {
                tracing::warn!("dropping stale lifecycle frame for slow client");
            }
        }
    }

    /// Close every connection and clear all subscriptions. Dropping each
    /// client's sender ends its reader/writer tasks.
    pub fn shutdown(&self) {
        self.clients.lock().clear();
        self.subscriptions.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribing_replaces_prior_subscription() {
        let registry = Registry::new();
        let (id, _rx) = registry.register();

        let change = registry.subscribe(id, "s1".to_string());
        assert!(change.previous_session_id.is_none());
        assert_eq!(registry.subscriber_count("s1"), 1);

        let change = registry.subscribe(id, "s2".to_string());
        assert_eq!(change.previous_session_id.as_deref(), Some("s1"));
        assert_eq!(registry.subscriber_count("s1"), 0);
        assert_eq!(registry.subscriber_count("s2"), 1);
    }

    #[tokio::test]
    async fn publish_only_reaches_subscribers() {
        let registry = Registry::new();
        let (a, mut rx_a) = registry.register();
        let (_b, mut rx_b) = registry.register();
        registry.subscribe(a, "s1".to_string());

        registry.publish(
            "s1",
            ServerFrame::SessionActivity {
                session_id: "s1".to_string(),
                updated_at: "t".to_string(),
            },
        );

        assert!(rx_a.try_recv().is_ok());
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn broadcast_reaches_every_client_regardless_of_subscription() {
        let registry = Registry::new();
        let (_a, mut rx_a) = registry.register();
        let (_b, mut rx_b) = registry.register();

        registry.broadcast(ServerFrame::SessionActivity {
            session_id: "s1".to_string(),
            updated_at: "t".to_string(),
        });

        assert!(rx_a.try_recv().is_ok());
        assert!(rx_b.try_recv().is_ok());
    }

    #[tokio::test]
    async fn unregister_clears_subscription() {
        let registry = Registry::new();
        let (id, _rx) = registry.register();
        registry.subscribe(id, "s1".to_string());
        let left = registry.unregister(id);
        assert_eq!(left.as_deref(), Some("s1"));
        assert_eq!(registry.subscriber_count("s1"), 0);
    }

    #[tokio::test]
    async fn send_to_reaches_only_the_named_client() {
        let registry = Registry::new();
        let (a, mut rx_a) = registry.register();
        let (_b, mut rx_b) = registry.register();

        assert!(registry.send_to(
            a,
            ServerFrame::SessionActivity {
                session_id: "s1".to_string(),
                updated_at: "t".to_string(),
            },
        ));

        assert!(rx_a.try_recv().is_ok());
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn shutdown_clears_everything() {
        let registry = Registry::new();
        let (id, _rx) = registry.register();
        registry.subscribe(id, "s1".to_string());
        registry.shutdown();
        assert_eq!(registry.subscriber_count("s1"), 0);
    }
}
