use async_trait::async_trait;

use crate::error::BusResult;

/// Publish side of a message bus.
#[async_trait]
pub trait MessageBus: Send + Sync {
    /// Publish an opaque payload to `topic` and return the message id
    /// assigned by the bus.
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> BusResult<String>;
}

#[async_trait]
impl<B: MessageBus + ?Sized> MessageBus for std::sync::Arc<B> {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> BusResult<String> {
        (**self).publish(topic, payload).await
    }
}
