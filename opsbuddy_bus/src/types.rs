//! Wire values carried on the bus.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One log line as submitted by the ingestion client. The timestamp stays
/// a string on the wire; the writer parses and normalizes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    pub timestamp: String,
    pub message: String,
}

/// A batch of logs for one product, published to the `logs` topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogBatchMessage {
    /// Decimal product id; also the message key.
    pub product_id: String,
    pub logs: Vec<LogRecord>,
}

impl LogBatchMessage {
    /// The bus message key: same key, same partition, per-product FIFO.
    pub fn key(&self) -> &str {
        &self.product_id
    }
}

/// Outage lifecycle event published to the `notifications` topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationEvent {
    pub product_id: i64,
    pub user_email: String,
    pub timestamp: DateTime<Utc>,
    pub event_type: EventType,
    pub message: String,
}

impl NotificationEvent {
    pub fn key(&self) -> String {
        self.product_id.to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    ServiceDown,
    ServiceUp,
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn log_batch_wire_format() {
        let batch = LogBatchMessage {
            product_id: "7".to_string(),
            logs: vec![LogRecord {
                timestamp: "2024-01-01T00:00:00Z".to_string(),
                message: "hello".to_string(),
            }],
        };

        let json = serde_json::to_string(&batch).unwrap();
        assert_eq!(
            json,
            r#"{"product_id":"7","logs":[{"timestamp":"2024-01-01T00:00:00Z","message":"hello"}]}"#
        );
        assert_eq!(batch.key(), "7");
    }

    #[test]
    fn notification_event_wire_format() {
        let event = NotificationEvent {
            product_id: 9,
            user_email: "owner@example.com".to_string(),
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            event_type: EventType::ServiceDown,
            message: "Service api is down".to_string(),
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["product_id"], 9);
        assert_eq!(json["event_type"], "service_down");
        assert_eq!(json["user_email"], "owner@example.com");
        assert_eq!(event.key(), "9");
    }

    #[test]
    fn event_type_strings_round_trip() {
        let down: EventType = serde_json::from_str(r#""service_down""#).unwrap();
        let up: EventType = serde_json::from_str(r#""service_up""#).unwrap();
        assert_eq!(down, EventType::ServiceDown);
        assert_eq!(up, EventType::ServiceUp);
    }
}
