use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::dom::types::Size;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ViewportEvent {
    Resized {
        width: f64,
        height: f64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

/// Global viewport notifications, the equivalent of the window `resize` event.
#[derive(Clone)]
pub struct ViewportBus {
    tx: broadcast::Sender<ViewportEvent>,
}

impl ViewportBus {
    pub fn new() -> Self {
        Self::with_capacity(100)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ViewportEvent> {
        self.tx.subscribe()
    }

    /// Announce a new viewport size. Returns how many listeners were notified.
    pub fn resize(&self, size: Size) -> usize {
        let event = ViewportEvent::Resized {
            width: size.width,
            height: size.height,
            timestamp: chrono::Utc::now(),
        };
        match self.tx.send(event) {
            Ok(listeners) => listeners,
            Err(_) => {
                tracing::debug!(width = size.width, height = size.height, "resize with no listeners");
                0
            }
        }
    }

    pub fn listener_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for ViewportBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_resize_reaches_subscribers() {
        let bus = ViewportBus::new();
        let mut rx = bus.subscribe();

        assert_eq!(bus.resize(Size::new(640.0, 480.0)), 1);

        let ViewportEvent::Resized { width, height, .. } = rx.recv().await.unwrap();
        assert_eq!((width, height), (640.0, 480.0));
    }

    #[test]
    fn test_resize_without_listeners() {
        let bus = ViewportBus::new();
        assert_eq!(bus.listener_count(), 0);
        assert_eq!(bus.resize(Size::new(1.0, 1.0)), 0);
    }
}
