//! Best-effort notification delivery
//!
//! Delivery is at-most-once: a recipient without a live channel at call
//! time never receives the message, and send failures are swallowed. There
//! is no acknowledgment, retry, or queue for offline recipients.

use std::sync::Arc;
use tracing::debug;

use crate::registry::ConnectionRegistry;

/// Delivers messages to identities with a live notification channel
#[derive(Clone)]
pub struct Notifier {
    registry: Arc<ConnectionRegistry>,
}

impl Notifier {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// Push a message to an identity's channel if one is registered.
    /// Returns without error regardless of outcome.
    pub fn notify(&self, username: &str, message: &str) {
        match self.registry.lookup(username) {
            Some(sender) => {
                // The receiver may have gone away between lookup and send;
                // that is the same as not being connected at all.
                if sender.send(message.to_string()).is_err() {
                    debug!("Notification channel for {} closed mid-send", username);
                }
            }
            None => {
                debug!("No notification channel for {}, dropping message", username);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[test]
    fn test_notify_delivers_when_connected() {
        let registry = Arc::new(ConnectionRegistry::new());
        let notifier = Notifier::new(Arc::clone(&registry));

        let (tx, mut rx) = mpsc::unbounded_channel();
        registry.register("bob", tx);

        notifier.notify("bob", "New task assigned to you: Write report");
        assert_eq!(
            rx.try_recv().unwrap(),
            "New task assigned to you: Write report"
        );
    }

    #[test]
    fn test_notify_is_silent_when_offline() {
        let registry = Arc::new(ConnectionRegistry::new());
        let notifier = Notifier::new(registry);

        // Must not panic or error
        notifier.notify("nobody", "message");
    }

    #[test]
    fn test_notify_swallows_closed_channel() {
        let registry = Arc::new(ConnectionRegistry::new());
        let notifier = Notifier::new(Arc::clone(&registry));

        let (tx, rx) = mpsc::unbounded_channel();
        registry.register("bob", tx);
        drop(rx);

        notifier.notify("bob", "message");
    }
}
