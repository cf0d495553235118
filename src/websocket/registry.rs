use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::{debug, info};
use uuid::Uuid;

/// Writable end of one live websocket connection.
///
/// The registry only ever holds a clone of this; the session owning the connection
/// decides when it is closed.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: Uuid,
    tx: mpsc::UnboundedSender<String>,
}

impl ConnectionHandle {
    pub fn new(tx: mpsc::UnboundedSender<String>) -> Self {
        Self { id: Uuid::new_v4(), tx }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    fn send(&self, payload: &str) -> Result<(), mpsc::error::SendError<String>> {
        self.tx.send(payload.to_string())
    }
}

/// Outcome of a directed send. Never surfaced to the sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    NotRegistered,
    /// Target was registered but its connection is already gone.
    Dropped,
}

/// Maps usernames to their live connection. At most one entry per username.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: DashMap<String, ConnectionHandle>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
        }
    }

    /// Last connect wins. A replaced handle is not closed, only unreachable.
    pub fn connect(&self, username: &str, handle: ConnectionHandle) {
        let connection_id = handle.id();
        match self.connections.insert(username.to_string(), handle) {
            Some(previous) => info!(
                "Connection {} replaced {} for user {}",
                connection_id,
                previous.id(),
                username
            ),
            None => info!("User {} connected on {}", username, connection_id),
        }
    }

    pub fn disconnect(&self, username: &str) {
        if let Some((_, handle)) = self.connections.remove(username) {
            info!("User {} disconnected from {}", username, handle.id());
        }
    }

    /// Removes the entry for `username` only while it still belongs to `connection_id`.
    pub fn release(&self, username: &str, connection_id: Uuid) -> bool {
        let removed = self
            .connections
            .remove_if(username, |_, handle| handle.id() == connection_id)
            .is_some();
        if removed {
            info!("User {} disconnected from {}", username, connection_id);
        } else {
            debug!(
                "Connection {} for user {} was already superseded",
                connection_id, username
            );
        }
        removed
    }

    pub fn send_to(&self, username: &str, payload: &str) -> Delivery {
        let Some(handle) = self.connections.get(username) else {
            debug!("No live connection for {}, dropping message", username);
            return Delivery::NotRegistered;
        };

        match handle.send(payload) {
            Ok(()) => Delivery::Delivered,
            Err(e) => {
                // The target's own session will notice the closed socket and clean up
                debug!("Failed to deliver to {} on {}: {}", username, handle.id(), e);
                Delivery::Dropped
            }
        }
    }

    pub fn is_connected(&self, username: &str) -> bool {
        self.connections.contains_key(username)
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn handle() -> (ConnectionHandle, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (ConnectionHandle::new(tx), rx)
    }

    #[test]
    fn test_send_to_registered_user() {
        let registry = ConnectionRegistry::new();
        let (bob, mut bob_rx) = handle();
        let (carol, mut carol_rx) = handle();
        registry.connect("bob", bob);
        registry.connect("carol", carol);

        assert_eq!(registry.send_to("bob", "alice: hi"), Delivery::Delivered);
        assert_eq!(bob_rx.try_recv().unwrap(), "alice: hi");
        assert!(carol_rx.try_recv().is_err());
    }

    #[test]
    fn test_send_to_unknown_user_is_a_miss() {
        let registry = ConnectionRegistry::new();
        assert_eq!(registry.send_to("nobody", "hello"), Delivery::NotRegistered);
        assert_eq!(registry.connection_count(), 0);
    }

    #[test]
    fn test_last_connect_wins() {
        let registry = ConnectionRegistry::new();
        let (first, mut first_rx) = handle();
        let (second, mut second_rx) = handle();

        registry.connect("bob", first);
        registry.connect("bob", second);
        assert_eq!(registry.connection_count(), 1);

        registry.send_to("bob", "hello");
        assert_eq!(second_rx.try_recv().unwrap(), "hello");
        assert!(first_rx.try_recv().is_err());
        // Replaced connection stays open
        assert!(!first_rx.is_closed());
    }

    #[test]
    fn test_disconnect_then_reconnect() {
        let registry = ConnectionRegistry::new();
        let (bob, _bob_rx) = handle();
        registry.connect("bob", bob);

        registry.disconnect("bob");
        assert!(!registry.is_connected("bob"));
        assert_eq!(registry.send_to("bob", "lost"), Delivery::NotRegistered);

        // Disconnecting an absent user is a no-op
        registry.disconnect("bob");

        let (bob_again, mut rx) = handle();
        registry.connect("bob", bob_again);
        assert_eq!(registry.send_to("bob", "back"), Delivery::Delivered);
        assert_eq!(rx.try_recv().unwrap(), "back");
    }

    #[test]
    fn test_release_keeps_newer_connection() {
        let registry = ConnectionRegistry::new();
        let (old, _old_rx) = handle();
        let (new, mut new_rx) = handle();
        let old_id = old.id();
        let new_id = new.id();

        registry.connect("bob", old);
        registry.connect("bob", new);

        assert!(!registry.release("bob", old_id));
        assert!(registry.is_connected("bob"));
        registry.send_to("bob", "still here");
        assert_eq!(new_rx.try_recv().unwrap(), "still here");

        assert!(registry.release("bob", new_id));
        assert!(!registry.is_connected("bob"));
    }

    #[test]
    fn test_dropped_receiver_is_swallowed() {
        let registry = ConnectionRegistry::new();
        let (bob, bob_rx) = handle();
        registry.connect("bob", bob);
        drop(bob_rx);

        assert_eq!(registry.send_to("bob", "anyone?"), Delivery::Dropped);
        // Entry is left for the owning session to remove
        assert!(registry.is_connected("bob"));
    }

    #[tokio::test]
    async fn test_concurrent_sessions() {
        let registry = Arc::new(ConnectionRegistry::new());
        let mut tasks = Vec::new();

        for i in 0..32 {
            let registry = registry.clone();
            tasks.push(tokio::spawn(async move {
                let (tx, mut rx) = mpsc::unbounded_channel();
                let username = format!("user-{}", i);
                registry.connect(&username, ConnectionHandle::new(tx));
                assert_eq!(registry.send_to(&username, "ping"), Delivery::Delivered);
                assert_eq!(rx.recv().await.as_deref(), Some("ping"));
                registry.disconnect(&username);
            }));
        }

        for task in tasks {
            task.await.unwrap();
        }
        assert_eq!(registry.connection_count(), 0);
    }
}
