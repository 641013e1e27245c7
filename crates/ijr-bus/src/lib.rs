//! Message bus publishing for serverless functions.
//!
//! Messages of one type are collected by a [`BatchPublisher`] and sent to a
//! topic as a single [`Envelope`] once the batch grows past its threshold,
//! or when the publisher is flushed or closed.
//!
//! The transport sits behind the async [`MessageBus`] trait.
//! [`InMemoryBus`] records payloads per topic for tests and local runs.

pub mod envelope;
pub mod error;
pub mod memory;
pub mod publisher;
pub mod traits;

pub use envelope::Envelope;
pub use error::{BusError, BusResult};
pub use memory::InMemoryBus;
pub use publisher::{BatchPublisher, DEFAULT_PUBLISH_THRESHOLD};
pub use traits::MessageBus;
