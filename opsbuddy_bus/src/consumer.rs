//! Consumer-group wrapper around the bus.

use async_trait::async_trait;
use futures::FutureExt;
use rdkafka::ClientConfig;
use rdkafka::Message;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use snafu::ResultExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::ConsumerOptions;
use crate::error::{CreateSnafu, Result, SubscribeSnafu};

/// Error a handler reports for a retryable failure.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Handles one message at a time, synchronously per partition, so the
/// stored offset order matches the processing order.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Process a single message. Returning an error (or panicking) leaves
    /// the offset unstored; the message is redelivered on the next run.
    async fn handle(&self, key: &str, payload: &[u8]) -> std::result::Result<(), HandlerError>;
}

pub struct BusConsumer {
    consumer: StreamConsumer,
    options: ConsumerOptions,
}

impl BusConsumer {
    pub fn new(options: ConsumerOptions) -> Result<Self> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", options.bus.broker_csv())
            .set("group.id", &options.group_id)
            .set("fetch.min.bytes", options.fetch_min_bytes.to_string())
            .set("fetch.max.bytes", options.fetch_max_bytes.to_string())
            .set(
                "fetch.wait.max.ms",
                options.fetch_max_wait.as_millis().to_string(),
            )
            // Offsets are stored by hand after a successful insert and
            // committed on the periodic cadence below.
            .set("enable.auto.commit", "true")
            .set(
                "auto.commit.interval.ms",
                options.commit_interval.as_millis().to_string(),
            )
            .set("enable.auto.offset.store", "false")
            .set("auto.offset.reset", "earliest")
            .create()
            .context(CreateSnafu)?;

        Ok(Self { consumer, options })
    }

    /// Drain the topic until cancellation, feeding each message through the
    /// handler. The handler is panic-safe: a panic is caught and logged and
    /// the offset is not stored.
    pub async fn run(&self, ct: CancellationToken, handler: &dyn MessageHandler) -> Result<()> {
        self.consumer
            .subscribe(&[&self.options.bus.topic])
            .context(SubscribeSnafu {
                topic: self.options.bus.topic.clone(),
            })?;

        info!(
            topic = %self.options.bus.topic,
            group = %self.options.group_id,
            "consuming messages"
        );

        loop {
            tokio::select! {
                _ = ct.cancelled() => break,
                received = self.consumer.recv() => {
                    match received {
                        Ok(message) => {
                            let key = message
                                .key()
                                .map(|k| String::from_utf8_lossy(k).into_owned())
                                .unwrap_or_default();
                            let payload = message.payload().unwrap_or_default();

                            let outcome = std::panic::AssertUnwindSafe(
                                handler.handle(&key, payload),
                            )
                            .catch_unwind()
                            .await;

                            match outcome {
                                Ok(Ok(())) => {
                                    if let Err(error) =
                                        self.consumer.store_offset_from_message(&message)
                                    {
                                        warn!(error = %error, "failed to store offset");
                                    }
                                }
                                Ok(Err(error)) => {
                                    warn!(key = %key, error = %error,
                                        "handler failed; message will be redelivered");
                                }
                                Err(_) => {
                                    warn!(key = %key,
                                        "handler panicked; message will be redelivered");
                                }
                            }
                        }
                        Err(error) => {
                            warn!(error = %error, "error receiving message");
                            tokio::time::sleep(self.options.receive_retry_delay).await;
                        }
                    }
                }
            }
        }

        // Flush stored offsets before the group rebalances away.
        if let Err(error) = self.consumer.commit_consumer_state(CommitMode::Sync) {
            debug!(error = %error, "final offset commit failed");
        }

        info!(topic = %self.options.bus.topic, "consumer stopped");
        Ok(())
    }
}
