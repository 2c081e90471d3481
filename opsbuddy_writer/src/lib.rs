//! Bus consumer / time-series writer.
//!
//! Drains the `logs` topic, normalizes timestamps, and inserts rows into
//! the partitioned `logs` table in bounded batches. Offsets are stored
//! only after a successful insert, so a crash mid-insert redelivers the
//! message (at-least-once; duplicate rows on rare redelivery are
//! tolerated). Liveness and metrics are served over HTTP.

pub mod error;
pub mod http;
pub mod metrics;
pub mod retention;
pub mod writer;

pub use error::{Result, WriterError};
pub use http::HttpServer;
pub use metrics::WriterMetrics;
pub use retention::{RetentionOptions, run_retention_sweep};
pub use writer::{LogWriter, normalize_timestamp, rows_from_batch};
