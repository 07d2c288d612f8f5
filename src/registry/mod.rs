//! Connection registry: who currently has an open notification channel
//!
//! One entry per identity at any instant. Registering a second channel for
//! the same identity replaces the existing entry; the orphaned channel's
//! connection loop will observe its receiver closing and tear itself down.
//! Unregister only removes an entry when the caller still owns it, so a
//! stale disconnect can never evict a newer registration.
//!
//! All operations are O(1) map accesses under a single lock, held only for
//! the duration of the map read/write and never across channel I/O.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use tokio::sync::mpsc;

/// Process-unique handle identifying one registration
pub type ConnectionId = u64;

/// A registered notification channel
struct RegisteredClient {
    id: ConnectionId,
    sender: mpsc::UnboundedSender<String>,
}

/// Registry mapping identities to their current live notification channel
#[derive(Default)]
pub struct ConnectionRegistry {
    next_id: AtomicU64,
    clients: Mutex<HashMap<String, RegisteredClient>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a channel as the current entry for an identity, replacing any
    /// previous one (last-write-wins). Returns the handle the connection
    /// must present on unregister.
    pub fn register(&self, username: &str, sender: mpsc::UnboundedSender<String>) -> ConnectionId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut clients = self.clients.lock().expect("registry lock poisoned");
        clients.insert(username.to_string(), RegisteredClient { id, sender });
        id
    }

    /// Remove the entry for an identity only if the stored channel is still
    /// the one identified by `id`. Returns whether an entry was removed.
    pub fn unregister(&self, username: &str, id: ConnectionId) -> bool {
        let mut clients = self.clients.lock().expect("registry lock poisoned");
        match clients.get(username) {
            Some(client) if client.id == id => {
                clients.remove(username);
                true
            }
            _ => false,
        }
    }

    /// Current channel for an identity, if one is registered
    pub fn lookup(&self, username: &str) -> Option<mpsc::UnboundedSender<String>> {
        let clients = self.clients.lock().expect("registry lock poisoned");
        clients.get(username).map(|c| c.sender.clone())
    }

    /// Number of currently registered channels
    pub fn connected_count(&self) -> usize {
        let clients = self.clients.lock().expect("registry lock poisoned");
        clients.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel() -> (
        mpsc::UnboundedSender<String>,
        mpsc::UnboundedReceiver<String>,
    ) {
        mpsc::unbounded_channel()
    }

    #[test]
    fn test_register_and_lookup() {
        let registry = ConnectionRegistry::new();
        let (tx, mut rx) = channel();

        registry.register("alice", tx);
        let sender = registry.lookup("alice").expect("entry should exist");
        sender.send("hello".into()).unwrap();
        assert_eq!(rx.try_recv().unwrap(), "hello");

        assert!(registry.lookup("bob").is_none());
    }

    #[test]
    fn test_second_register_replaces_first() {
        let registry = ConnectionRegistry::new();
        let (tx1, mut rx1) = channel();
        let (tx2, mut rx2) = channel();

        registry.register("alice", tx1);
        registry.register("alice", tx2);

        assert_eq!(registry.connected_count(), 1);

        let sender = registry.lookup("alice").unwrap();
        sender.send("msg".into()).unwrap();
        assert!(rx1.try_recv().is_err());
        assert_eq!(rx2.try_recv().unwrap(), "msg");
    }

    #[test]
    fn test_stale_unregister_does_not_evict_newer_registration() {
        let registry = ConnectionRegistry::new();
        let (tx1, _rx1) = channel();
        let (tx2, _rx2) = channel();

        let old_id = registry.register("alice", tx1);
        let new_id = registry.register("alice", tx2);

        // The orphaned connection's cleanup must be a no-op
        assert!(!registry.unregister("alice", old_id));
        assert!(registry.lookup("alice").is_some());

        // The owner can still remove its own entry
        assert!(registry.unregister("alice", new_id));
        assert!(registry.lookup("alice").is_none());
    }

    #[test]
    fn test_concurrent_registers_leave_exactly_one_entry() {
        use std::sync::Arc;

        let registry = Arc::new(ConnectionRegistry::new());
        let mut handles = Vec::new();

        for _ in 0..16 {
            let registry = Arc::clone(&registry);
            handles.push(std::thread::spawn(move || {
                for _ in 0..100 {
                    let (tx, _rx) = mpsc::unbounded_channel();
                    registry.register("alice", tx);
                }
            }));
        }

        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(registry.connected_count(), 1);
        assert!(registry.lookup("alice").is_some());
    }

    #[tokio::test]
    async fn test_superseded_channel_observes_closure() {
        // The connection loop for a replaced registration learns about the
        // replacement by its receiver closing.
        let registry = ConnectionRegistry::new();
        let (tx1, mut rx1) = channel();
        let (tx2, _rx2) = channel();

        registry.register("alice", tx1);
        registry.register("alice", tx2);

        assert!(rx1.recv().await.is_none());
    }

    #[test]
    fn test_identities_are_independent() {
        let registry = ConnectionRegistry::new();
        let (tx1, _rx1) = channel();
        let (tx2, _rx2) = channel();

        let alice_id = registry.register("alice", tx1);
        registry.register("bob", tx2);

        assert!(registry.unregister("alice", alice_id));
        assert!(registry.lookup("bob").is_some());
    }
}
