//! Fixed-size worker pool.
//!
//! Workers read [`PingItem`]s from a bounded channel with capacity twice
//! the worker count; when the pool is saturated, submission blocks the
//! scheduler, which is the engine's backpressure.

use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::heap::PingItem;

/// Processes one scheduled item: probe, walk the state machine, re-push.
#[async_trait]
pub trait PingProcessor: Send + Sync {
    async fn process(&self, item: PingItem);
}

pub struct WorkerPool {
    tx: mpsc::Sender<PingItem>,
    handles: Vec<JoinHandle<()>>,
    ct: CancellationToken,
}

impl WorkerPool {
    /// Spawn `worker_count` workers feeding from a bounded channel.
    pub fn start(
        worker_count: usize,
        processor: Arc<dyn PingProcessor>,
        ct: CancellationToken,
    ) -> Self {
        let (tx, rx) = mpsc::channel::<PingItem>(worker_count * 2);
        let rx = Arc::new(Mutex::new(rx));

        let handles = (0..worker_count)
            .map(|worker_id| {
                let rx = rx.clone();
                let processor = processor.clone();

                tokio::spawn(async move {
                    debug!(worker_id, "worker started");
                    loop {
                        // Exit on channel close, after the queue is drained;
                        // cancellation only stops new submissions.
                        let item = { rx.lock().await.recv().await };

                        let Some(item) = item else {
                            debug!(worker_id, "job channel closed");
                            break;
                        };

                        let product_id = item.product_id;
                        // A panicking probe must not take the worker down
                        // with it; the item is lost until rediscovery, the
                        // pool keeps draining.
                        if std::panic::AssertUnwindSafe(processor.process(item))
                            .catch_unwind()
                            .await
                            .is_err()
                        {
                            warn!(worker_id, product_id, "ping processor panicked");
                        }
                    }
                    debug!(worker_id, "worker stopped");
                })
            })
            .collect();

        Self { tx, handles, ct }
    }

    /// Hand an item to the pool, waiting for capacity. Returns `false`
    /// when the pool is shutting down.
    pub async fn submit(&self, item: PingItem) -> bool {
        tokio::select! {
            _ = self.ct.cancelled() => false,
            sent = self.tx.send(item) => sent.is_ok(),
        }
    }

    /// Cancel, close the submission channel, and join every worker.
    /// In-flight jobs run to completion.
    pub async fn stop(self) {
        self.ct.cancel();
        drop(self.tx);

        for handle in self.handles {
            if let Err(error) = handle.await {
                warn!(error = %error, "worker join failed");
            }
        }
        debug!("worker pool stopped");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    use super::*;
    use tokio::time::Instant;

    #[derive(Default)]
    struct Recorder {
        seen: StdMutex<Vec<i64>>,
    }

    #[async_trait]
    impl PingProcessor for Recorder {
        async fn process(&self, item: PingItem) {
            self.seen.lock().unwrap().push(item.product_id);
        }
    }

    #[tokio::test]
    async fn all_submitted_jobs_are_processed() {
        let recorder = Arc::new(Recorder::default());
        let pool = WorkerPool::start(3, recorder.clone(), CancellationToken::new());

        for product_id in 0..20 {
            assert!(
                pool.submit(PingItem::new(product_id, "http://x", Instant::now()))
                    .await
            );
        }

        pool.stop().await;

        let mut seen = recorder.seen.lock().unwrap().clone();
        seen.sort_unstable();
        assert_eq!(seen, (0..20).collect::<Vec<_>>());
    }

    struct Blocker {
        release: tokio::sync::Semaphore,
    }

    #[async_trait]
    impl PingProcessor for Blocker {
        async fn process(&self, _item: PingItem) {
            self.release
                .acquire()
                .await
                .expect("semaphore open")
                .forget();
        }
    }

    #[tokio::test]
    async fn saturated_pool_blocks_submission() {
        let blocker = Arc::new(Blocker {
            release: tokio::sync::Semaphore::new(0),
        });
        let pool = WorkerPool::start(2, blocker.clone(), CancellationToken::new());

        // 2 jobs occupy the workers, 4 fill the channel.
        for product_id in 0..6 {
            assert!(
                pool.submit(PingItem::new(product_id, "http://x", Instant::now()))
                    .await
            );
        }

        let blocked = tokio::time::timeout(
            Duration::from_millis(50),
            pool.submit(PingItem::new(99, "http://x", Instant::now())),
        )
        .await;
        assert!(blocked.is_err(), "submit should block when saturated");

        blocker.release.add_permits(64);
        pool.stop().await;
    }

    #[tokio::test]
    async fn panicking_processor_does_not_kill_the_pool() {
        struct Panicker;

        #[async_trait]
        impl PingProcessor for Panicker {
            async fn process(&self, item: PingItem) {
                if item.product_id == 1 {
                    panic!("boom");
                }
            }
        }

        let pool = WorkerPool::start(1, Arc::new(Panicker), CancellationToken::new());
        assert!(pool.submit(PingItem::new(1, "http://x", Instant::now())).await);
        assert!(pool.submit(PingItem::new(2, "http://x", Instant::now())).await);
        pool.stop().await;
    }
}
