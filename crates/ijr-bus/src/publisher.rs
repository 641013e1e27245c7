//! Buffered batch publisher.

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::envelope::Envelope;
use crate::error::BusResult;
use crate::traits::MessageBus;

/// Messages held before a flush is forced.
pub const DEFAULT_PUBLISH_THRESHOLD: usize = 25;

/// Collects messages of one type and publishes them to one topic as a
/// single [`Envelope`] per batch.
///
/// A batch is sent once more than `threshold` messages are pending, on
/// [`BatchPublisher::flush`] and on [`BatchPublisher::close`]. Messages stay
/// pending when a publish fails. There is no flush on drop; dropping with
/// pending messages logs a warning.
pub struct BatchPublisher<B> {
    bus: B,
    topic: String,
    msg_type: String,
    messages: Vec<Value>,
    threshold: usize,
}

impl<B: MessageBus> BatchPublisher<B> {
    pub fn new(bus: B, topic: impl Into<String>, msg_type: impl Into<String>) -> Self {
        Self {
            bus,
            topic: topic.into(),
            msg_type: msg_type.into(),
            messages: Vec::new(),
            threshold: DEFAULT_PUBLISH_THRESHOLD,
        }
    }

    pub fn with_threshold(mut self, threshold: usize) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Pending count above which `publish` flushes.
    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Number of messages waiting for the next flush.
    pub fn pending(&self) -> usize {
        self.messages.len()
    }

    /// Queue a message. Returns the message id if this triggered a flush.
    pub async fn publish<T: Serialize + ?Sized>(&mut self, msg: &T) -> BusResult<Option<String>> {
        self.messages.push(serde_json::to_value(msg)?);
        if self.messages.len() > self.threshold {
            return self.flush().await;
        }
        Ok(None)
    }

    /// Publish all pending messages as one envelope.
    ///
    /// Returns `None` when nothing was pending.
    pub async fn flush(&mut self) -> BusResult<Option<String>> {
        if self.messages.is_empty() {
            return Ok(None);
        }
        let envelope = Envelope::new(self.msg_type.clone(), self.messages.clone());
        let payload = envelope.to_bytes()?;
        let bytes = payload.len();
        let id = self.bus.publish(&self.topic, payload).await?;
        debug!(
            topic = %self.topic,
            msg_type = %self.msg_type,
            messages = self.messages.len(),
            bytes,
            message_id = %id,
            "batch published"
        );
        self.messages.clear();
        Ok(Some(id))
    }

    /// Flush whatever is pending and consume the publisher.
    pub async fn close(mut self) -> BusResult<Option<String>> {
        self.flush().await
    }
}

impl<B> Drop for BatchPublisher<B> {
    fn drop(&mut self) {
        if !self.messages.is_empty() {
            warn!(
                topic = %self.topic,
                msg_type = %self.msg_type,
                lost = self.messages.len(),
                "publisher dropped with unpublished messages"
            );
        }
    }
}

impl<B> std::fmt::Debug for BatchPublisher<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchPublisher")
            .field("topic", &self.topic)
            .field("msg_type", &self.msg_type)
            .field("pending", &self.messages.len())
            .field("threshold", &self.threshold)
            .finish()
    }
}
