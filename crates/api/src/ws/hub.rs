use axum::body::Bytes;
use axum::extract::ws::Message;
use dashmap::DashMap;
use faceswap_core::types::{new_id, Timestamp};
use tokio::sync::mpsc;

/// Channel sender half for pushing messages to a WebSocket connection.
pub type WsSender = mpsc::UnboundedSender<Message>;

/// Opaque handle returned by [`SubscriptionHub::connect`].
pub type SubscriptionId = String;

/// One live observer connection.
pub struct Subscription {
    /// Client identifier supplied at connect time; `None` for anonymous
    /// subscriptions, which only receive broadcasts.
    pub client_id: Option<String>,
    /// Channel sender for outbound messages to this connection.
    pub sender: WsSender,
    /// When this connection was established.
    pub connected_at: Timestamp,
}

/// Registry of live observer connections.
///
/// Backed by a sharded map, so connects and disconnects never wait for a
/// broadcast to finish walking the whole registry. A subscription whose
/// channel is closed is dropped by the first send that notices it.
pub struct SubscriptionHub {
    subscriptions: DashMap<SubscriptionId, Subscription>,
}

impl SubscriptionHub {
    pub fn new() -> Self {
        Self {
            subscriptions: DashMap::new(),
        }
    }

    /// Register a new connection.
    ///
    /// Returns the handle used to disconnect and the receiver half of the
    /// message channel, which the caller forwards to the WebSocket sink.
    pub fn connect(
        &self,
        client_id: Option<String>,
    ) -> (SubscriptionId, mpsc::UnboundedReceiver<Message>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = new_id();
        self.subscriptions.insert(
            id.clone(),
            Subscription {
                client_id,
                sender: tx,
                connected_at: chrono::Utc::now(),
            },
        );
        (id, rx)
    }

    /// Remove a subscription. Returns `false` if it was already gone.
    pub fn disconnect(&self, id: &str) -> bool {
        self.subscriptions.remove(id).is_some()
    }

    /// Send `message` to every subscription registered under `client_id`.
    ///
    /// A no-op when the client is not connected. Returns the number of
    /// subscriptions that accepted the message.
    pub fn send_to(&self, client_id: &str, message: Message) -> usize {
        self.deliver(message, |sub| sub.client_id.as_deref() == Some(client_id))
    }

    /// Send `message` to every subscription. Returns how many accepted it.
    pub fn broadcast(&self, message: Message) -> usize {
        self.deliver(message, |_| true)
    }

    /// Send a Ping frame to every connected client.
    pub fn ping_all(&self) -> usize {
        self.broadcast(Message::Ping(Bytes::new()))
    }

    /// Return the current number of active subscriptions.
    pub fn connection_count(&self) -> usize {
        self.subscriptions.len()
    }

    /// Whether any subscription is registered under `client_id`.
    pub fn is_connected(&self, client_id: &str) -> bool {
        self.subscriptions
            .iter()
            .any(|entry| entry.client_id.as_deref() == Some(client_id))
    }

    /// Send a Close frame to every connection, then clear the registry.
    pub fn shutdown_all(&self) {
        let count = self.subscriptions.len();
        for entry in self.subscriptions.iter() {
            let _ = entry.sender.send(Message::Close(None));
        }
        self.subscriptions.clear();
        tracing::info!(count, "Closed all WebSocket connections");
    }

    /// Send to every subscription matching `filter`, then drop the ones whose
    /// channel turned out to be closed.
    fn deliver<F>(&self, message: Message, filter: F) -> usize
    where
        F: Fn(&Subscription) -> bool,
    {
        let mut delivered = 0;
        let mut dead = Vec::new();

        for entry in self.subscriptions.iter() {
            if !filter(entry.value()) {
                continue;
            }
            if entry.sender.send(message.clone()).is_ok() {
                delivered += 1;
            } else {
                dead.push(entry.key().clone());
            }
        }

        // Shard locks from the iteration above are released by now.
        for id in dead {
            if self
                .subscriptions
                .remove_if(&id, |_, sub| sub.sender.is_closed())
                .is_some()
            {
                tracing::debug!(subscription_id = %id, "Removed closed WebSocket subscription");
            }
        }
        delivered
    }
}

impl Default for SubscriptionHub {
    fn default() -> Self {
        Self::new()
    }
}
