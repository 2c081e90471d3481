//! Kafka-backed publishers.

use std::time::Duration;

use async_trait::async_trait;
use rdkafka::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;
use snafu::ResultExt;
use tracing::debug;

use crate::config::BusOptions;
use crate::error::{CreateSnafu, PublishSnafu, Result};
use crate::types::{LogBatchMessage, NotificationEvent};
use crate::{LogBatchPublisher, NotificationPublisher};

const PUBLISH_TIMEOUT: Duration = Duration::from_secs(5);

fn base_config(options: &BusOptions) -> ClientConfig {
    let mut config = ClientConfig::new();
    config
        .set("bootstrap.servers", options.broker_csv())
        .set("message.timeout.ms", "5000");
    config
}

async fn publish_json<T: serde::Serialize>(
    producer: &FutureProducer,
    topic: &str,
    key: &str,
    value: &T,
) -> Result<()> {
    let payload = serde_json::to_vec(value).expect("wire values serialize");

    let record = FutureRecord::to(topic).key(key).payload(&payload);
    producer
        .send(record, Timeout::After(PUBLISH_TIMEOUT))
        .await
        .map_err(|(error, _message)| error)
        .context(PublishSnafu {
            topic: topic.to_string(),
        })?;

    debug!(topic, key, bytes = payload.len(), "published message");
    Ok(())
}

/// Publishes log batches to the `logs` topic.
pub struct KafkaLogProducer {
    producer: FutureProducer,
    topic: String,
}

impl KafkaLogProducer {
    pub fn new(options: &BusOptions) -> Result<Self> {
        let producer = base_config(options).create().context(CreateSnafu)?;

        Ok(Self {
            producer,
            topic: options.topic.clone(),
        })
    }
}

#[async_trait]
impl LogBatchPublisher for KafkaLogProducer {
    async fn publish(&self, batch: &LogBatchMessage) -> Result<()> {
        publish_json(&self.producer, &self.topic, batch.key(), batch).await
    }
}

/// Publishes outage events to the `notifications` topic with `acks=1`.
pub struct KafkaNotificationProducer {
    producer: FutureProducer,
    topic: String,
}

impl KafkaNotificationProducer {
    pub fn new(options: &BusOptions) -> Result<Self> {
        let producer = base_config(options)
            .set("acks", "1")
            .create()
            .context(CreateSnafu)?;

        Ok(Self {
            producer,
            topic: options.topic.clone(),
        })
    }
}

#[async_trait]
impl NotificationPublisher for KafkaNotificationProducer {
    async fn publish(&self, event: &NotificationEvent) -> Result<()> {
        publish_json(&self.producer, &self.topic, &event.key(), event).await
    }
}
