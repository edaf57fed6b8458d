//! Change notification channel.
//!
//! Providers publish a [`CollectionChanged`] event after every completed
//! state mutation. Events carry no payload beyond the publishing provider's
//! key: subscribers re-query counts and enumeration.
//!
//! Publishing is synchronous and fire-and-forget. Subscribers receive events
//! through a `tokio::sync::broadcast` receiver and may drain it from any
//! thread, with or without a runtime (`try_recv`).

use tokio::sync::broadcast;
use tracing::trace;

/// Capacity of each provider's broadcast buffer.
///
/// Slow subscribers that fall further behind observe `Lagged` and should
/// simply re-query.
pub const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// "Something changed" event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionChanged {
    /// Key of the provider that published the event.
    pub provider_key: String,
}

/// Broadcast publisher owned by a provider.
#[derive(Debug)]
pub struct ChangeNotifier {
    provider_key: String,
    sender: broadcast::Sender<CollectionChanged>,
}

impl ChangeNotifier {
    pub fn new(provider_key: impl Into<String>) -> Self {
        let (sender, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            provider_key: provider_key.into(),
            sender,
        }
    }

    /// Publish one event. Having no subscribers is not an error.
    pub fn notify(&self) {
        let delivered = self
            .sender
            .send(CollectionChanged {
                provider_key: self.provider_key.clone(),
            })
            .unwrap_or(0);
        trace!(provider = %self.provider_key, delivered, "Collection changed");
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CollectionChanged> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::broadcast::error::TryRecvError;

    #[test]
    fn test_notify_without_subscribers() {
        let notifier = ChangeNotifier::new("p");
        notifier.notify();
        assert_eq!(notifier.subscriber_count(), 0);
    }

    #[test]
    fn test_each_subscriber_sees_one_event() {
        let notifier = ChangeNotifier::new("p");
        let mut a = notifier.subscribe();
        let mut b = notifier.subscribe();

        notifier.notify();

        for rx in [&mut a, &mut b] {
            let event = rx.try_recv().unwrap();
            assert_eq!(event.provider_key, "p");
            assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
        }
    }

    #[test]
    fn test_subscriber_only_sees_later_events() {
        let notifier = ChangeNotifier::new("p");
        notifier.notify();
        let mut rx = notifier.subscribe();
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }
}
