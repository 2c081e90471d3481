use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Process-local counters exposed on the `/metrics` endpoint.
#[derive(Debug, Default)]
pub struct WriterMetrics {
    pub messages_processed: AtomicU64,
    pub malformed_messages: AtomicU64,
    pub rows_inserted: AtomicU64,
    pub insert_failures: AtomicU64,
    pub timestamp_fallbacks: AtomicU64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub messages_processed: u64,
    pub malformed_messages: u64,
    pub rows_inserted: u64,
    pub insert_failures: u64,
    pub timestamp_fallbacks: u64,
}

impl WriterMetrics {
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            messages_processed: self.messages_processed.load(Ordering::Relaxed),
            malformed_messages: self.malformed_messages.load(Ordering::Relaxed),
            rows_inserted: self.rows_inserted.load(Ordering::Relaxed),
            insert_failures: self.insert_failures.load(Ordering::Relaxed),
            timestamp_fallbacks: self.timestamp_fallbacks.load(Ordering::Relaxed),
        }
    }

    pub fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }
}
