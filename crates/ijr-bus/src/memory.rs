use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{BusError, BusResult};
use crate::traits::MessageBus;

/// In-memory message bus recording every payload per topic.
#[derive(Debug)]
pub struct InMemoryBus {
    topics: Mutex<HashMap<String, Vec<Vec<u8>>>>,
    next_id: AtomicU64,
    available: AtomicBool,
}

impl InMemoryBus {
    pub fn new() -> Self {
        Self {
            topics: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            available: AtomicBool::new(true),
        }
    }

    /// Payloads published to `topic`, oldest first.
    pub fn published(&self, topic: &str) -> Vec<Vec<u8>> {
        self.topics
            .lock()
            .expect("lock poisoned")
            .get(topic)
            .cloned()
            .unwrap_or_default()
    }

    /// When unavailable, every publish fails with `Unavailable`.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::Release);
    }
}

impl Default for InMemoryBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageBus for InMemoryBus {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> BusResult<String> {
        if !self.available.load(Ordering::Acquire) {
            return Err(BusError::Unavailable("in-memory bus switched off".into()));
        }
        if topic.is_empty() {
            return Err(BusError::Publish {
                topic: topic.to_string(),
                reason: "empty topic name".into(),
            });
        }
        self.topics
            .lock()
            .expect("lock poisoned")
            .entry(topic.to_string())
            .or_default()
            .push(payload);
        Ok(self.next_id.fetch_add(1, Ordering::Relaxed).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_payloads_with_sequential_ids() {
        let bus = InMemoryBus::new();
        assert_eq!(bus.publish("t", b"one".to_vec()).await.unwrap(), "1");
        assert_eq!(bus.publish("t", b"two".to_vec()).await.unwrap(), "2");
        assert_eq!(bus.published("t"), vec![b"one".to_vec(), b"two".to_vec()]);
        assert!(bus.published("other").is_empty());
    }

    #[tokio::test]
    async fn unavailable_bus_rejects() {
        let bus = InMemoryBus::new();
        bus.set_available(false);
        assert!(matches!(bus.publish("t", vec![]).await, Err(BusError::Unavailable(_))));
        bus.set_available(true);
        assert!(matches!(bus.publish("", vec![]).await, Err(BusError::Publish { .. })));
    }
}
