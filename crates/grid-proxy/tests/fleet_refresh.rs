mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use grid_cache::MemoryCacheStore;
use grid_common::LivenessState;
use grid_proxy::{DirectoryError, RefreshConfig};

use common::{FakeProbe, Harness};

fn harness(probe: FakeProbe, interval_secs: u64, concurrency: usize) -> Harness {
    Harness::build(
        Arc::new(MemoryCacheStore::new()),
        probe,
        RefreshConfig {
            interval: Duration::from_secs(interval_secs),
            concurrency,
        },
    )
}

#[tokio::test(start_paused = true)]
async fn cycle_respects_concurrency_cap() {
    let h = harness(FakeProbe::with_delay(Duration::from_millis(50)), 120, 8);
    for id in 1..=120 {
        h.directory.add_node(id, 1000 + id, 1);
    }

    let report = h.refresher.refresh_all().await.unwrap();
    assert_eq!(report.total, 120);
    assert_eq!(report.ok, 120);
    assert_eq!(report.failed, 0);

    assert!(h.probe.high_water() <= 8, "high water {}", h.probe.high_water());
    assert_eq!(h.probe.high_water(), 8);
    assert!(h.metrics.probes_inflight_high_water.load(Ordering::SeqCst) <= 8);
    assert_eq!(h.metrics.probes_inflight.load(Ordering::SeqCst), 0);

    for id in [1, 60, 120] {
        assert_eq!(h.queries.get_status(id).await, LivenessState::Up);
    }
}

#[tokio::test]
async fn failing_nodes_do_not_abort_the_cycle() {
    let h = harness(FakeProbe::default(), 120, 4);
    for id in 1..=10 {
        h.directory.add_node(id, 100 + id, 1);
    }
    h.probe.set_down(103, true);
    h.probe.set_down(107, true);

    let report = h.refresher.refresh_all().await.unwrap();
    assert_eq!(report.total, 10);
    assert_eq!(report.ok, 8);
    assert_eq!(report.failed, 2);
    assert_eq!(h.queries.get_status(3).await, LivenessState::Down);
    assert_eq!(h.queries.get_status(4).await, LivenessState::Up);

    assert_eq!(h.metrics.refresh_cycles_total.load(Ordering::SeqCst), 1);
    assert_eq!(h.metrics.refresh_nodes_ok_total.load(Ordering::SeqCst), 8);
    assert_eq!(h.metrics.refresh_nodes_failed_total.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn node_going_silent_between_cycles_is_likely_down() {
    let h = harness(FakeProbe::default(), 120, 4).with_node_42();
    h.directory.add_node(43, 8, 1);

    h.refresher.refresh_all().await.unwrap();
    assert_eq!(h.queries.get_status(42).await, LivenessState::Up);

    h.probe.set_down(7, true);
    let report = h.refresher.refresh_all().await.unwrap();
    assert_eq!(report.failed, 1);
    assert_eq!(h.queries.get_status(42).await, LivenessState::LikelyDown);
    assert_eq!(h.queries.get_status(43).await, LivenessState::Up);
}

#[tokio::test]
async fn directory_failure_fails_the_cycle() {
    let h = harness(FakeProbe::default(), 120, 4).with_node_42();
    h.directory.fail.store(true, Ordering::SeqCst);

    let err = h.refresher.refresh_all().await.unwrap_err();
    assert!(matches!(err, DirectoryError::Query(_)));
    assert_eq!(h.probe.calls(), 0);
    assert_eq!(h.metrics.refresh_cycles_total.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn empty_fleet_is_a_noop_cycle() {
    let h = harness(FakeProbe::default(), 120, 4);
    let report = h.refresher.refresh_all().await.unwrap();
    assert_eq!(report.total, 0);
    assert_eq!(report.ok + report.failed, 0);
}

#[tokio::test(start_paused = true)]
async fn run_refreshes_immediately_then_every_interval() {
    let h = harness(FakeProbe::default(), 120, 4).with_node_42();
    let task = tokio::spawn(h.refresher.clone().run());

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(h.metrics.refresh_cycles_total.load(Ordering::SeqCst), 1);
    assert_eq!(h.queries.get_status(42).await, LivenessState::Up);

    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(h.metrics.refresh_cycles_total.load(Ordering::SeqCst), 2);

    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(h.metrics.refresh_cycles_total.load(Ordering::SeqCst), 3);
    assert_eq!(h.probe.calls(), 3);

    task.abort();
}

#[tokio::test(start_paused = true)]
async fn run_survives_directory_outage() {
    let h = harness(FakeProbe::default(), 120, 4).with_node_42();
    h.directory.fail.store(true, Ordering::SeqCst);
    let task = tokio::spawn(h.refresher.clone().run());

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(h.directory.node_ids_calls.load(Ordering::SeqCst), 1);

    h.directory.fail.store(false, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(h.directory.node_ids_calls.load(Ordering::SeqCst), 2);
    assert_eq!(h.queries.get_status(42).await, LivenessState::Up);

    task.abort();
}

#[tokio::test(start_paused = true)]
async fn manual_refresh_is_refused_while_a_cycle_runs() {
    let h = harness(FakeProbe::with_delay(Duration::from_secs(1)), 120, 4).with_node_42();

    let refresher = h.refresher.clone();
    let running = tokio::spawn(async move { refresher.refresh_all().await });
    while h.probe.inflight() == 0 {
        tokio::task::yield_now().await;
    }

    assert!(h.refresher.try_refresh_all().await.is_none());

    let report = running.await.unwrap().unwrap();
    assert_eq!(report.ok, 1);

    let again = h.refresher.try_refresh_all().await.expect("lock is free again");
    assert_eq!(again.unwrap().ok, 1);
}

#[tokio::test(start_paused = true)]
async fn results_reaped_during_spawning_are_counted_once() {
    let h = harness(FakeProbe::with_delay(Duration::from_millis(10)), 120, 2);
    for id in 1..=200 {
        h.directory.add_node(id, 5000 + id, 1);
    }
    for id in (1..=200).filter(|id| id % 10 == 0) {
        h.probe.set_down(5000 + id, true);
    }

    let report = h.refresher.refresh_all().await.unwrap();
    assert_eq!(report.total, 200);
    assert_eq!(report.ok, 180);
    assert_eq!(report.failed, 20);
    assert!(h.probe.high_water() <= 2);
    assert_eq!(h.metrics.refresh_nodes_ok_total.load(Ordering::SeqCst), 180);
}
