//! End-to-end engine behavior with in-memory collaborators and paused time.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use opsbuddy_healthcheck::{EngineOptions, HealthCheckEngine};

mod common;
use common::{CountingProber, RecordingTracker, SeededSource, target};

#[tokio::test(start_paused = true)]
async fn loaded_products_are_probed_on_the_steady_interval() {
    let source = SeededSource::with_initial(vec![target(1, "http://one/health")]);
    let prober = Arc::new(CountingProber::default());
    let tracker = Arc::new(RecordingTracker::default());

    let engine = HealthCheckEngine::new(
        source,
        prober.clone(),
        tracker.clone(),
        EngineOptions {
            worker_count: 2,
            ..EngineOptions::default()
        },
    );

    let ct = CancellationToken::new();
    let handle = tokio::spawn({
        let ct = ct.clone();
        async move { engine.run(ct).await }
    });

    // First sweep happens on the 2s tick; the follow-up lands 10s later.
    tokio::time::sleep(Duration::from_secs(3)).await;
    assert_eq!(prober.count_for("http://one/health"), 1);

    tokio::time::sleep(Duration::from_secs(12)).await;
    assert!(prober.count_for("http://one/health") >= 2);

    ct.cancel();
    handle.await.expect("engine task").expect("engine run");
    assert!(tracker.transitions().is_empty());
}

#[tokio::test(start_paused = true)]
async fn rediscovery_schedules_products_registered_after_start() {
    let source = SeededSource::with_initial(vec![]);
    let prober = Arc::new(CountingProber::default());
    let tracker = Arc::new(RecordingTracker::default());

    let engine = HealthCheckEngine::new(
        source.clone(),
        prober.clone(),
        tracker,
        EngineOptions {
            worker_count: 2,
            ..EngineOptions::default()
        },
    );

    let ct = CancellationToken::new();
    let handle = tokio::spawn({
        let ct = ct.clone();
        async move { engine.run(ct).await }
    });

    tokio::time::sleep(Duration::from_secs(1)).await;
    source.add(target(2, "http://two/health"));
    assert_eq!(prober.count_for("http://two/health"), 0);

    // The rediscovery tick fires at 60s and the next scheduler sweep
    // submits the fresh item.
    tokio::time::sleep(Duration::from_secs(63)).await;
    assert!(prober.count_for("http://two/health") >= 1);

    ct.cancel();
    handle.await.expect("engine task").expect("engine run");
}
