use rdkafka::error::KafkaError;
use snafu::Snafu;

/// Bus error types.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum BusError {
    /// The broker list or topic configuration is invalid.
    #[snafu(display("invalid bus configuration: {message}"))]
    Config { message: String },
    /// The underlying client could not be created.
    #[snafu(display("failed to create bus client"))]
    Create { source: KafkaError },
    /// A publish did not reach the brokers within the client timeout.
    #[snafu(display("failed to publish to topic {topic}"))]
    Publish { topic: String, source: KafkaError },
    /// Subscribing the consumer group to its topic failed.
    #[snafu(display("failed to subscribe to topic {topic}"))]
    Subscribe { topic: String, source: KafkaError },
}

pub type Result<T, E = BusError> = std::result::Result<T, E>;
