//! Message bus client for the OpsBuddy platform.
//!
//! The bus is a partitioned log with per-key FIFO and consumer groups.
//! Producers key every message by the decimal product id, so a single
//! product's messages land on a single partition and downstream consumers
//! observe per-product ordering.
//!
//! The publisher traits ([`LogBatchPublisher`], [`NotificationPublisher`])
//! are the seams the services program against; the Kafka-backed
//! implementations live in [`producer`] and the in-memory ones used by
//! tests in [`memory`].

pub mod config;
pub mod consumer;
pub mod error;
pub mod memory;
pub mod producer;
pub mod types;

pub use config::{BusOptions, ConsumerOptions};
pub use consumer::{BusConsumer, HandlerError, MessageHandler};
pub use error::{BusError, Result};
pub use producer::{KafkaLogProducer, KafkaNotificationProducer};
pub use types::{EventType, LogBatchMessage, LogRecord, NotificationEvent};

use async_trait::async_trait;

/// Publishes normalized log batches to the `logs` topic.
#[async_trait]
pub trait LogBatchPublisher: Send + Sync {
    /// Publish a batch keyed by the decimal product id. Fails when the
    /// brokers cannot be reached within the client timeout; the caller
    /// surfaces the error (at-least-once relies on client retry).
    async fn publish(&self, batch: &LogBatchMessage) -> Result<()>;
}

/// Publishes outage lifecycle events to the `notifications` topic.
#[async_trait]
pub trait NotificationPublisher: Send + Sync {
    async fn publish(&self, event: &NotificationEvent) -> Result<()>;
}
