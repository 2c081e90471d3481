//! Scheduler loop, probe state machine, and product rediscovery.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use snafu::ResultExt;
use sqlx::PgPool;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use opsbuddy_store::products::{self, ProbeTarget};

use crate::error::{Result, StoreSnafu};
use crate::heap::{PingHeap, PingItem};
use crate::outage::OutageTracker;
use crate::pool::{PingProcessor, WorkerPool};
use crate::probe::Prober;

/// Engine timing knobs.
#[derive(Debug, Clone, Copy)]
pub struct EngineOptions {
    /// Number of probe workers.
    pub worker_count: usize,
    /// Steady probe interval for healthy (and declared-down) products.
    pub ping_interval: Duration,
    /// Base delay for the exponential retry backoff.
    pub backoff_base: Duration,
    /// Consecutive failures before a product is declared down.
    pub max_retries: u32,
    /// Scheduler sweep cadence.
    pub scheduler_tick: Duration,
    /// Product rediscovery cadence.
    pub rediscovery_interval: Duration,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            worker_count: 5,
            ping_interval: Duration::from_secs(10),
            backoff_base: Duration::from_secs(2),
            max_retries: 3,
            scheduler_tick: Duration::from_secs(2),
            rediscovery_interval: Duration::from_secs(60),
        }
    }
}

/// The product rows the engine schedules from. The store is the
/// implementation in production; tests seed an in-memory source.
#[async_trait]
pub trait ProductSource: Send + Sync {
    /// Every probe-eligible product, for the initial heap load.
    async fn probe_targets(&self) -> Result<Vec<ProbeTarget>>;

    /// Probe-eligible products registered after `since`.
    async fn probe_targets_created_after(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<ProbeTarget>>;
}

pub struct StoreProductSource {
    pool: PgPool,
}

impl StoreProductSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProductSource for StoreProductSource {
    async fn probe_targets(&self) -> Result<Vec<ProbeTarget>> {
        products::probe_targets(&self.pool).await.context(StoreSnafu)
    }

    async fn probe_targets_created_after(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<ProbeTarget>> {
        products::probe_targets_created_after(&self.pool, since)
            .await
            .context(StoreSnafu)
    }
}

/// Probes one item and applies the retry/backoff state machine.
///
/// Transitions, starting from `(retry_count = 0, is_down = false)`:
/// - success: reset retries, mark up if the item was latched down,
///   reschedule at the steady interval;
/// - failure below the retry budget: reschedule at `base * 2^(n-1)`;
/// - failure exhausting the budget: latch down (marking the outage only on
///   the first latch), reset retries, reschedule at the steady interval so
///   recovery is noticed promptly.
pub struct ProbeRunner {
    heap: Arc<PingHeap>,
    prober: Arc<dyn Prober>,
    tracker: Arc<dyn OutageTracker>,
    options: EngineOptions,
}

impl ProbeRunner {
    pub fn new(
        heap: Arc<PingHeap>,
        prober: Arc<dyn Prober>,
        tracker: Arc<dyn OutageTracker>,
        options: EngineOptions,
    ) -> Self {
        Self {
            heap,
            prober,
            tracker,
            options,
        }
    }

    async fn on_success(&self, mut item: PingItem) {
        debug!(product_id = item.product_id, "health check succeeded");

        if item.is_down {
            if let Err(error) = self.tracker.mark_service_up(item.product_id).await {
                warn!(product_id = item.product_id, error = %error,
                    "failed to record recovery");
            }
        }

        item.is_down = false;
        item.retry_count = 0;
        item.next_ping_at = Instant::now() + self.options.ping_interval;
        self.heap.push(item);
    }

    async fn on_failure(&self, mut item: PingItem) {
        item.retry_count += 1;
        debug!(
            product_id = item.product_id,
            attempt = item.retry_count,
            max = self.options.max_retries,
            "health check failed"
        );

        if item.retry_count < self.options.max_retries {
            let backoff = self.options.backoff_base * 2u32.pow(item.retry_count - 1);
            item.next_ping_at = Instant::now() + backoff;
            self.heap.push(item);
            return;
        }

        if !item.is_down {
            info!(
                product_id = item.product_id,
                attempts = self.options.max_retries,
                "product declared down"
            );
            if let Err(error) = self.tracker.mark_service_down(item.product_id).await {
                warn!(product_id = item.product_id, error = %error,
                    "failed to record downtime");
            }
        }

        // Keep probing at the steady interval while down; the latch
        // suppresses duplicate down events until a recovery.
        item.is_down = true;
        item.retry_count = 0;
        item.next_ping_at = Instant::now() + self.options.ping_interval;
        self.heap.push(item);
    }
}

#[async_trait]
impl PingProcessor for ProbeRunner {
    async fn process(&self, item: PingItem) {
        if self.prober.probe(&item.health_api).await {
            self.on_success(item).await;
        } else {
            self.on_failure(item).await;
        }
    }
}

/// Heap-driven polling engine.
pub struct HealthCheckEngine {
    source: Arc<dyn ProductSource>,
    prober: Arc<dyn Prober>,
    tracker: Arc<dyn OutageTracker>,
    heap: Arc<PingHeap>,
    options: EngineOptions,
}

impl HealthCheckEngine {
    pub fn new(
        source: Arc<dyn ProductSource>,
        prober: Arc<dyn Prober>,
        tracker: Arc<dyn OutageTracker>,
        options: EngineOptions,
    ) -> Self {
        Self {
            source,
            prober,
            tracker,
            heap: Arc::new(PingHeap::new()),
            options,
        }
    }

    /// Load products, start the pool, and run the scheduler and
    /// rediscovery tickers until cancellation.
    pub async fn run(&self, ct: CancellationToken) -> Result<()> {
        let loaded = self.load_products().await?;
        let mut last_queried = Utc::now();
        info!(products = loaded, "health-check engine started");

        let runner = Arc::new(ProbeRunner::new(
            self.heap.clone(),
            self.prober.clone(),
            self.tracker.clone(),
            self.options,
        ));
        let pool = WorkerPool::start(self.options.worker_count, runner, ct.child_token());

        let start = Instant::now();
        let mut scheduler_tick = tokio::time::interval_at(
            start + self.options.scheduler_tick,
            self.options.scheduler_tick,
        );
        let mut rediscovery_tick = tokio::time::interval_at(
            start + self.options.rediscovery_interval,
            self.options.rediscovery_interval,
        );

        loop {
            tokio::select! {
                _ = ct.cancelled() => break,
                _ = scheduler_tick.tick() => {
                    self.dispatch_due(&pool).await;
                }
                _ = rediscovery_tick.tick() => {
                    last_queried = self.rediscover(last_queried).await;
                }
            }
        }

        pool.stop().await;
        info!("health-check engine stopped");
        Ok(())
    }

    async fn load_products(&self) -> Result<usize> {
        let targets = self.source.probe_targets().await?;
        let now = Instant::now();

        for target in &targets {
            self.heap
                .push(PingItem::new(target.id, target.health_api.clone(), now));
        }

        Ok(targets.len())
    }

    /// Submit every item whose deadline has passed. Items are re-pushed by
    /// the worker that processes them, so an item is either in the heap or
    /// held by a worker, never both.
    async fn dispatch_due(&self, pool: &WorkerPool) {
        let now = Instant::now();

        while let Some(deadline) = self.heap.peek_deadline() {
            if deadline > now {
                break;
            }
            let Some(item) = self.heap.pop() else {
                break;
            };
            if !pool.submit(item).await {
                break;
            }
        }
    }

    /// Pick up products registered since the last sweep. Products already
    /// scheduled are skipped; deleted products are not removed here.
    async fn rediscover(&self, last_queried: DateTime<Utc>) -> DateTime<Utc> {
        let now = Utc::now();

        let targets = match self.source.probe_targets_created_after(last_queried).await {
            Ok(targets) => targets,
            Err(error) => {
                warn!(error = %error, "failed to fetch new products");
                return last_queried;
            }
        };

        if targets.is_empty() {
            debug!("no new products found");
            return now;
        }

        let next_ping_at = Instant::now();
        for target in targets {
            if self.heap.contains(target.id) {
                continue;
            }

            info!(product_id = target.id, health_api = %target.health_api,
                "scheduling new product");
            self.heap
                .push(PingItem::new(target.id, target.health_api, next_ping_at));
        }

        now
    }
}
