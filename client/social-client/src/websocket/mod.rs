use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{
    mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender},
    RwLock,
};
use tracing::debug;
use uuid::Uuid;

pub mod channel;
pub mod message_types;

pub use channel::{ConnectionState, FrameSender, RealtimeChannel};
pub use message_types::{frame_types, InboundFrame, OutboundChatFrame};

/// Handle returned by [`HandlerRegistry::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SubscriptionId {
    fn default() -> Self {
        Self::new()
    }
}

struct Handler {
    id: SubscriptionId,
    tx: UnboundedSender<JsonValue>,
}

/// Routes inbound frame bodies to handlers by their `type`.
///
/// Handlers are not tied to a connection: they can register before
/// [`RealtimeChannel::connect`] and keep receiving across reconnects.
#[derive(Default, Clone)]
pub struct HandlerRegistry {
    handlers: Arc<RwLock<HashMap<String, Vec<Handler>>>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start receiving bodies of `frame_type` frames
    pub async fn subscribe(
        &self,
        frame_type: &str,
    ) -> (SubscriptionId, UnboundedReceiver<JsonValue>) {
        let (tx, rx) = unbounded_channel();
        let id = SubscriptionId::new();

        let mut handlers = self.handlers.write().await;
        let list = handlers.entry(frame_type.to_string()).or_default();
        list.push(Handler { id, tx });
        debug!(frame_type, handlers = list.len(), "Handler registered");

        (id, rx)
    }

    pub async fn unsubscribe(&self, frame_type: &str, id: SubscriptionId) {
        let mut handlers = self.handlers.write().await;
        let Some(list) = handlers.get_mut(frame_type) else {
            return;
        };

        list.retain(|h| h.id != id);
        if list.is_empty() {
            handlers.remove(frame_type);
        }
        debug!(frame_type, "Handler removed");
    }

    /// Hand `body` to every live handler of `frame_type` and return how
    /// many took it. Handlers whose receiver is gone are dropped here.
    pub async fn dispatch(&self, frame_type: &str, body: JsonValue) -> usize {
        let mut handlers = self.handlers.write().await;
        let Some(list) = handlers.get_mut(frame_type) else {
            return 0;
        };

        let registered = list.len();
        list.retain(|h| h.tx.send(body.clone()).is_ok());
        let delivered = list.len();

        if delivered < registered {
            debug!(frame_type, stale = registered - delivered, "Dropped closed handlers");
        }
        if delivered == 0 {
            handlers.remove(frame_type);
        }
        delivered
    }

    pub async fn handler_count(&self, frame_type: &str) -> usize {
        self.handlers
            .read()
            .await
            .get(frame_type)
            .map_or(0, Vec::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_dispatch_reaches_matching_handlers_only() {
        let registry = HandlerRegistry::new();
        let (_, mut notif_rx) = registry.subscribe("notification").await;
        let (_, mut chat_rx) = registry.subscribe("message").await;

        let delivered = registry.dispatch("notification", json!({ "id": "n-1" })).await;

        assert_eq!(delivered, 1);
        assert_eq!(notif_rx.recv().await.unwrap()["id"], "n-1");
        assert!(chat_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_unknown_type_is_ignored() {
        let registry = HandlerRegistry::new();
        assert_eq!(registry.dispatch("typing", json!({})).await, 0);
    }

    #[tokio::test]
    async fn test_unsubscribe_removes_single_handler() {
        let registry = HandlerRegistry::new();
        let (first, _rx1) = registry.subscribe("notification").await;
        let (_second, _rx2) = registry.subscribe("notification").await;
        assert_eq!(registry.handler_count("notification").await, 2);

        registry.unsubscribe("notification", first).await;
        assert_eq!(registry.handler_count("notification").await, 1);
    }

    #[tokio::test]
    async fn test_dead_handlers_are_pruned() {
        let registry = HandlerRegistry::new();
        let (_, rx) = registry.subscribe("message").await;
        let (_, mut live) = registry.subscribe("message").await;
        drop(rx);

        let delivered = registry.dispatch("message", json!({ "content": "hi" })).await;

        assert_eq!(delivered, 1);
        assert_eq!(registry.handler_count("message").await, 1);
        assert_eq!(live.recv().await.unwrap()["content"], "hi");
    }
}
