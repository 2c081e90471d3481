use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Owner of one or more products. Rows are created and mutated by the
/// external auth collaborator; the core only reads the notification email.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub name: String,
    pub provider: String,
    pub provider_id: String,
    pub created_at: DateTime<Utc>,
}

/// A customer-registered service to be monitored.
///
/// `auth_token` is unique and immutable after creation; a product with an
/// empty `health_api` is never probed.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    pub auth_token: Uuid,
    pub health_api: String,
}

/// A single log record in the partitioned `logs` hypertable.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Log {
    pub id: i64,
    pub product_id: i64,
    pub log_data: String,
    pub timestamp: DateTime<Utc>,
}

/// A log row ready for insertion. Ids are assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLog {
    pub product_id: i64,
    pub log_data: String,
    pub timestamp: DateTime<Utc>,
}

/// An outage incident. At most one row per product has `end_time = NULL`.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Downtime {
    pub id: i64,
    pub product_id: i64,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub status: String,
    pub is_notification_sent: bool,
}

/// Downtime status values stored in `downtimes.status`.
///
/// `Degraded` exists in the schema but has no producer in the core; it is
/// reserved for future classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DowntimeStatus {
    Down,
    Degraded,
    Up,
}

impl DowntimeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DowntimeStatus::Down => "down",
            DowntimeStatus::Degraded => "degraded",
            DowntimeStatus::Up => "up",
        }
    }
}

impl std::fmt::Display for DowntimeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A remediation suggestion produced by the analysis collaborator.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct QuickFix {
    pub id: i64,
    pub downtime_id: i64,
    pub product_id: i64,
    pub title: String,
    pub description: String,
    pub priority: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuickFixPriority {
    High,
    Medium,
    Low,
}

impl QuickFixPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuickFixPriority::High => "high",
            QuickFixPriority::Medium => "medium",
            QuickFixPriority::Low => "low",
        }
    }
}

impl std::fmt::Display for QuickFixPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_str() {
        for status in [
            DowntimeStatus::Down,
            DowntimeStatus::Degraded,
            DowntimeStatus::Up,
        ] {
            assert_eq!(status.to_string(), status.as_str());
        }
    }

    #[test]
    fn priority_strings_match_contract() {
        assert_eq!(QuickFixPriority::High.as_str(), "high");
        assert_eq!(QuickFixPriority::Medium.as_str(), "medium");
        assert_eq!(QuickFixPriority::Low.as_str(), "low");
    }
}
