//! Health-check engine.
//!
//! A min-heap of per-product probe records drives a fixed worker pool.
//! Workers issue HTTP liveness probes, walk the retry/backoff state
//! machine, and record outage transitions transactionally through the
//! [`OutageTracker`] seam. A separate ticker rediscovers newly registered
//! products without a restart.
//!
//! An item is either in the heap or held by a worker, never both; workers
//! re-push items with their next deadline after processing.

pub mod engine;
pub mod error;
pub mod heap;
pub mod outage;
pub mod pool;
pub mod probe;

pub use engine::{EngineOptions, HealthCheckEngine, ProbeRunner, ProductSource, StoreProductSource};
pub use error::{HealthCheckError, Result};
pub use heap::{PingHeap, PingItem};
pub use outage::{OutageTracker, PgOutageTracker};
pub use pool::{PingProcessor, WorkerPool};
pub use probe::{HttpProber, Prober};
