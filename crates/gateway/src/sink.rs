//! Outbound delivery: general broadcast and per-session queues

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};

use relay_core::event::OutboundEvent;

/// Default per-subscriber queue capacity
const DEFAULT_SUBSCRIBER_CAPACITY: usize = 1000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastOptions {
    /// Skip subscribers that cannot keep up instead of disconnecting them
    pub drop_if_slow: bool,
}

impl BroadcastOptions {
    pub fn drop_if_slow() -> Self {
        Self { drop_if_slow: true }
    }
}

/// Channel seen by every observer
pub trait Broadcaster: Send + Sync {
    fn broadcast(&self, event: &OutboundEvent, options: BroadcastOptions);
}

/// Direct delivery to one session; never drops for slowness
pub trait SessionSender: Send + Sync {
    fn send_to_session(&self, session_key: &str, event: &OutboundEvent);
}

/// Fans frames out to bounded subscriber queues
pub struct GatewayBroadcaster {
    subscribers: Mutex<HashMap<u64, mpsc::Sender<OutboundEvent>>>,
    next_id: AtomicU64,
    capacity: usize,
}

impl GatewayBroadcaster {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_SUBSCRIBER_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            subscribers: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(0),
            capacity: capacity.max(1),
        }
    }

    /// Subscribe to every frame broadcast after this call
    pub fn subscribe(&self) -> mpsc::Receiver<OutboundEvent> {
        let (tx, rx) = mpsc::channel(self.capacity);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.subscribers.lock().insert(id, tx);
        rx
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}

impl Default for GatewayBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl Broadcaster for GatewayBroadcaster {
    fn broadcast(&self, event: &OutboundEvent, options: BroadcastOptions) {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|id, tx| match tx.try_send(event.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) if options.drop_if_slow => {
                debug!(subscriber = id, event = event.name(), "dropping frame for slow subscriber");
                true
            }
            Err(TrySendError::Full(_)) => {
                warn!("Disconnecting slow subscriber {} ({} frame)", id, event.name());
                false
            }
            Err(TrySendError::Closed(_)) => false,
        });
    }
}

/// Unbounded per-session queues
#[derive(Default)]
pub struct SessionHub {
    sessions: Mutex<HashMap<String, Vec<mpsc::UnboundedSender<OutboundEvent>>>>,
}

impl SessionHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to frames addressed to `session_key`
    pub fn subscribe(&self, session_key: &str) -> mpsc::UnboundedReceiver<OutboundEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.sessions
            .lock()
            .entry(session_key.to_string())
            .or_default()
            .push(tx);
        rx
    }

    pub fn subscriber_count(&self, session_key: &str) -> usize {
        self.sessions.lock().get(session_key).map_or(0, Vec::len)
    }
}

impl SessionSender for SessionHub {
    fn send_to_session(&self, session_key: &str, event: &OutboundEvent) {
        let mut sessions = self.sessions.lock();
        let Some(senders) = sessions.get_mut(session_key) else {
            debug!("No subscribers for session {}", session_key);
            return;
        };
        senders.retain(|tx| tx.send(event.clone()).is_ok());
        if senders.is_empty() {
            sessions.remove(session_key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_core::chat::ChatEvent;

    fn chat_frame(seq: u64) -> OutboundEvent {
        OutboundEvent::Chat(ChatEvent::delta("client-1", "main", seq, "hi", 0))
    }

    #[tokio::test]
    async fn test_broadcast_reaches_all_subscribers() {
        let broadcaster = GatewayBroadcaster::new();
        let mut rx1 = broadcaster.subscribe();
        let mut rx2 = broadcaster.subscribe();

        broadcaster.broadcast(&chat_frame(1), BroadcastOptions::default());

        assert_eq!(rx1.recv().await.unwrap(), chat_frame(1));
        assert_eq!(rx2.recv().await.unwrap(), chat_frame(1));
    }

    #[tokio::test]
    async fn test_slow_subscriber_dropped_or_disconnected() {
        let broadcaster = GatewayBroadcaster::with_capacity(1);
        let mut rx = broadcaster.subscribe();

        broadcaster.broadcast(&chat_frame(1), BroadcastOptions::default());
        broadcaster.broadcast(&chat_frame(2), BroadcastOptions::drop_if_slow());
        assert_eq!(broadcaster.subscriber_count(), 1);

        broadcaster.broadcast(&chat_frame(3), BroadcastOptions::default());
        assert_eq!(broadcaster.subscriber_count(), 0);

        assert_eq!(rx.recv().await.unwrap(), chat_frame(1));
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_closed_subscribers_are_pruned() {
        let broadcaster = GatewayBroadcaster::new();
        let rx = broadcaster.subscribe();
        drop(rx);

        broadcaster.broadcast(&chat_frame(1), BroadcastOptions::default());
        assert_eq!(broadcaster.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_session_hub_routes_by_key() {
        let hub = SessionHub::new();
        let mut main = hub.subscribe("main");
        let mut other = hub.subscribe("other");

        for seq in 0..5000 {
            hub.send_to_session("main", &chat_frame(seq));
        }

        for seq in 0..5000 {
            assert_eq!(main.recv().await.unwrap(), chat_frame(seq));
        }
        assert!(other.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_session_hub_prunes_closed_receivers() {
        let hub = SessionHub::new();
        drop(hub.subscribe("main"));

        hub.send_to_session("main", &chat_frame(1));
        assert_eq!(hub.subscriber_count("main"), 0);
    }
}
