use std::time::Duration;

use crate::error::{BusError, Result};

/// Broker and topic configuration, read from `KAFKA_BROKERS` (csv) and
/// `KAFKA_TOPIC`.
#[derive(Debug, Clone)]
pub struct BusOptions {
    pub brokers: Vec<String>,
    pub topic: String,
}

impl BusOptions {
    pub fn from_env(default_topic: &str) -> Result<Self> {
        let brokers_raw = std::env::var("KAFKA_BROKERS")
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| "localhost:9094".to_string());

        let topic = std::env::var("KAFKA_TOPIC")
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| default_topic.to_string());

        Self::new(parse_broker_list(&brokers_raw)?, topic)
    }

    pub fn new(brokers: Vec<String>, topic: impl Into<String>) -> Result<Self> {
        let topic = topic.into();
        if brokers.is_empty() {
            return Err(BusError::Config {
                message: "broker list is empty".to_string(),
            });
        }
        if topic.is_empty() {
            return Err(BusError::Config {
                message: "topic is empty".to_string(),
            });
        }

        Ok(Self { brokers, topic })
    }

    pub fn broker_csv(&self) -> String {
        self.brokers.join(",")
    }
}

/// Split a comma-separated broker list, trimming entries and rejecting
/// empty ones.
pub fn parse_broker_list(raw: &str) -> Result<Vec<String>> {
    let mut brokers = Vec::new();
    for entry in raw.split(',') {
        let entry = entry.trim();
        if entry.is_empty() {
            return Err(BusError::Config {
                message: format!("invalid broker list {raw:?}: empty broker found"),
            });
        }
        brokers.push(entry.to_string());
    }

    Ok(brokers)
}

/// Consumer group tuning. The fetch floor and ceiling amortize broker
/// roundtrips without pinning latency; offsets stored by the handler are
/// committed on the `commit_interval` cadence.
#[derive(Debug, Clone)]
pub struct ConsumerOptions {
    pub bus: BusOptions,
    pub group_id: String,
    pub fetch_min_bytes: u32,
    pub fetch_max_bytes: u32,
    pub fetch_max_wait: Duration,
    pub commit_interval: Duration,
    pub receive_retry_delay: Duration,
}

impl ConsumerOptions {
    pub fn new(bus: BusOptions, group_id: impl Into<String>) -> Self {
        Self {
            bus,
            group_id: group_id.into(),
            fetch_min_bytes: 10_000,
            fetch_max_bytes: 50_000_000,
            fetch_max_wait: Duration::from_millis(500),
            commit_interval: Duration::from_secs(5),
            receive_retry_delay: Duration::from_millis(500),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broker_list_is_trimmed() {
        let brokers = parse_broker_list("kafka-1:9092, kafka-2:9092 ,kafka-3:9092").unwrap();
        assert_eq!(brokers, vec!["kafka-1:9092", "kafka-2:9092", "kafka-3:9092"]);
    }

    #[test]
    fn empty_broker_entry_is_rejected() {
        assert!(parse_broker_list("kafka-1:9092,,kafka-2:9092").is_err());
        assert!(parse_broker_list("").is_err());
    }

    #[test]
    fn empty_topic_is_rejected() {
        let brokers = vec!["localhost:9094".to_string()];
        assert!(BusOptions::new(brokers, "").is_err());
    }
}
