//! Message handling: decode, normalize, insert.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::{debug, error, warn};

use opsbuddy_bus::{HandlerError, LogBatchMessage, MessageHandler};
use opsbuddy_store::{NewLog, logs};

use crate::metrics::WriterMetrics;

/// Parse an RFC 3339 timestamp; a bad value maps to `now` so the row is
/// never dropped. The bool reports whether the original value survived.
pub fn normalize_timestamp(raw: &str, now: DateTime<Utc>) -> (DateTime<Utc>, bool) {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(parsed) => (parsed.with_timezone(&Utc), true),
        Err(_) => (now, false),
    }
}

/// Turn a wire batch into rows, normalizing every timestamp. Rows are
/// never dropped; a bad timestamp costs only its original value.
pub fn rows_from_batch(
    metrics: &WriterMetrics,
    product_id: i64,
    batch: LogBatchMessage,
    now: DateTime<Utc>,
) -> Vec<NewLog> {
    batch
        .logs
        .into_iter()
        .map(|record| {
            let (timestamp, parsed) = normalize_timestamp(&record.timestamp, now);
            if !parsed {
                warn!(
                    product_id,
                    raw = %record.timestamp,
                    "unparseable timestamp; substituting insertion time"
                );
                WriterMetrics::incr(&metrics.timestamp_fallbacks);
            }

            NewLog {
                product_id,
                log_data: record.message,
                timestamp,
            }
        })
        .collect()
}

/// Consumes log batches and writes them to the partitioned table.
pub struct LogWriter {
    pool: PgPool,
    metrics: Arc<WriterMetrics>,
}

impl LogWriter {
    pub fn new(pool: PgPool, metrics: Arc<WriterMetrics>) -> Self {
        Self { pool, metrics }
    }
}

#[async_trait]
impl MessageHandler for LogWriter {
    /// A malformed key or payload is logged and skipped (storing the
    /// offset), since redelivery can never fix it. An insert failure is
    /// returned, leaving the offset unstored for redelivery.
    async fn handle(&self, key: &str, payload: &[u8]) -> std::result::Result<(), HandlerError> {
        let Ok(product_id) = key.parse::<i64>() else {
            error!(key, "message key is not a product id; skipping");
            WriterMetrics::incr(&self.metrics.malformed_messages);
            return Ok(());
        };

        let batch: LogBatchMessage = match serde_json::from_slice(payload) {
            Ok(batch) => batch,
            Err(error) => {
                error!(product_id, error = %error, "undecodable batch; skipping");
                WriterMetrics::incr(&self.metrics.malformed_messages);
                return Ok(());
            }
        };

        let rows = rows_from_batch(&self.metrics, product_id, batch, Utc::now());
        let count = rows.len();

        match logs::insert_batch(&self.pool, &rows).await {
            Ok(inserted) => {
                WriterMetrics::incr(&self.metrics.messages_processed);
                WriterMetrics::add(&self.metrics.rows_inserted, inserted);
                debug!(product_id, rows = count, "batch written");
                Ok(())
            }
            Err(error) => {
                WriterMetrics::incr(&self.metrics.insert_failures);
                Err(format!("batch insert failed: {error}").into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_formed_timestamps_survive_normalization() {
        let now = Utc::now();
        let (parsed, ok) = normalize_timestamp("2024-01-01T00:00:00Z", now);
        assert!(ok);
        assert_eq!(parsed.to_rfc3339(), "2024-01-01T00:00:00+00:00");

        let (offset, ok) = normalize_timestamp("2024-06-15T12:30:00+02:00", now);
        assert!(ok);
        assert_eq!(offset.to_rfc3339(), "2024-06-15T10:30:00+00:00");
    }

    #[test]
    fn bad_timestamps_map_to_insertion_time() {
        let now = Utc::now();
        for raw in ["", "yesterday", "2024-13-40T99:00:00Z", "1718000000"] {
            let (fallback, ok) = normalize_timestamp(raw, now);
            assert!(!ok, "{raw:?} should not parse");
            assert_eq!(fallback, now);
        }
    }

    #[test]
    fn batches_keep_every_row_and_normalize_only_the_bad_ones() {
        use opsbuddy_bus::LogRecord;

        let metrics = WriterMetrics::default();
        let now = Utc::now();
        let batch = LogBatchMessage {
            product_id: "7".to_string(),
            logs: vec![
                LogRecord {
                    timestamp: "2024-01-01T00:00:00Z".to_string(),
                    message: "good".to_string(),
                },
                LogRecord {
                    timestamp: "not a time".to_string(),
                    message: "bad".to_string(),
                },
                LogRecord {
                    timestamp: "2024-01-02T00:00:00Z".to_string(),
                    message: "also good".to_string(),
                },
            ],
        };

        let rows = rows_from_batch(&metrics, 7, batch, now);

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].timestamp.to_rfc3339(), "2024-01-01T00:00:00+00:00");
        assert_eq!(rows[1].timestamp, now);
        assert_eq!(rows[1].log_data, "bad");
        assert_eq!(rows[2].timestamp.to_rfc3339(), "2024-01-02T00:00:00+00:00");
        assert!(rows.iter().all(|row| row.product_id == 7));
        assert_eq!(metrics.snapshot().timestamp_fallbacks, 1);
    }
}
