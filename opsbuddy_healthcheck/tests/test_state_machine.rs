//! Retry/backoff state machine properties, driven through [`ProbeRunner`]
//! with scripted probe outcomes and a recording tracker.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use opsbuddy_healthcheck::{
    EngineOptions, PingHeap, PingItem, PingProcessor, ProbeRunner,
};

mod common;
use common::{RecordingTracker, ScriptedProber, Transition};

fn runner_with(
    prober: Arc<ScriptedProber>,
) -> (ProbeRunner, Arc<PingHeap>, Arc<RecordingTracker>) {
    let heap = Arc::new(PingHeap::new());
    let tracker = Arc::new(RecordingTracker::default());
    let runner = ProbeRunner::new(
        heap.clone(),
        prober,
        tracker.clone(),
        EngineOptions::default(),
    );
    (runner, heap, tracker)
}

/// Run `rounds` probe cycles, popping the item back out of the heap each
/// time, the way the scheduler/worker pair does.
async fn run_rounds(runner: &ProbeRunner, heap: &PingHeap, product_id: i64, rounds: usize) {
    heap.push(PingItem::new(product_id, "http://svc/health", Instant::now()));
    for _ in 0..rounds {
        let item = heap.pop().expect("item re-pushed after processing");
        runner.process(item).await;
    }
}

#[tokio::test(start_paused = true)]
async fn three_failures_then_success_emit_down_then_up_once() {
    let prober = ScriptedProber::new([false, false, false, true]);
    let (runner, heap, tracker) = runner_with(prober);

    run_rounds(&runner, &heap, 9, 4).await;

    assert_eq!(
        tracker.transitions(),
        vec![Transition::Down(9), Transition::Up(9)]
    );
}

#[tokio::test(start_paused = true)]
async fn two_failures_then_success_emit_nothing() {
    let prober = ScriptedProber::new([false, false, true]);
    let (runner, heap, tracker) = runner_with(prober);

    run_rounds(&runner, &heap, 9, 3).await;

    assert!(tracker.transitions().is_empty());
}

#[tokio::test(start_paused = true)]
async fn continued_failures_after_down_do_not_repeat_the_event() {
    let prober = ScriptedProber::new([false; 9]);
    let (runner, heap, tracker) = runner_with(prober);

    // Three full retry budgets; the latch only fires once.
    run_rounds(&runner, &heap, 9, 9).await;

    assert_eq!(tracker.transitions(), vec![Transition::Down(9)]);
}

#[tokio::test(start_paused = true)]
async fn flapping_alternates_down_and_up() {
    let prober = ScriptedProber::new([
        false, false, false, true, // down, then up
        false, false, false, true, // down, then up again
    ]);
    let (runner, heap, tracker) = runner_with(prober);

    run_rounds(&runner, &heap, 5, 8).await;

    assert_eq!(
        tracker.transitions(),
        vec![
            Transition::Down(5),
            Transition::Up(5),
            Transition::Down(5),
            Transition::Up(5),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn failures_back_off_exponentially_then_settle_at_the_interval() {
    let prober = ScriptedProber::new([false, false, false, true]);
    let (runner, heap, _tracker) = runner_with(prober);
    let now = Instant::now();

    heap.push(PingItem::new(9, "http://svc/health", now));

    // First failure: retry in 2s.
    runner.process(heap.pop().unwrap()).await;
    assert_eq!(heap.peek_deadline(), Some(now + Duration::from_secs(2)));

    // Second failure: retry in 4s.
    runner.process(heap.pop().unwrap()).await;
    assert_eq!(heap.peek_deadline(), Some(now + Duration::from_secs(4)));

    // Third failure exhausts the budget: down, steady 10s cadence.
    runner.process(heap.pop().unwrap()).await;
    assert_eq!(heap.peek_deadline(), Some(now + Duration::from_secs(10)));

    // Recovery keeps the steady cadence.
    runner.process(heap.pop().unwrap()).await;
    assert_eq!(heap.peek_deadline(), Some(now + Duration::from_secs(10)));

    let item = heap.pop().unwrap();
    assert!(!item.is_down);
    assert_eq!(item.retry_count, 0);
}
