use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::core::config::PollSchedule;
use crate::core::state::runtime::aggregation_cache::{AggregationCache, ResourceKind};

/// One refresh cycle for a resource kind. A cycle publishes into the cache on
/// success; on error the loop records the failure and the previous snapshot stays.
#[async_trait]
pub trait PollTask: Send + Sync {
    fn kind(&self) -> ResourceKind;

    async fn run_cycle(&self) -> anyhow::Result<()>;
}

/// Runs `task` until `cancel` fires. Cycles never overlap: a tick missed while
/// a cycle runs is skipped, and refresh requests made during a cycle collapse
/// into a single extra cycle.
pub async fn run_poll_loop(
    task: Arc<dyn PollTask>,
    cache: Arc<AggregationCache>,
    schedule: PollSchedule,
    cancel: CancellationToken,
) {
    let kind = task.kind();
    let refresh = cache.refresh_trigger(kind);
    info!(
        kind = %kind,
        interval_secs = schedule.interval.as_secs(),
        "Poll loop started"
    );

    // Spread the loops out so they do not hit the API server together.
    if !sleep_or_cancel(jitter(schedule.jitter), &cancel).await {
        return;
    }

    let mut ticker = time::interval(schedule.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!(kind = %kind, "Poll loop shutting down");
                return;
            }
            _ = refresh.notified() => {
                debug!(kind = %kind, "Refresh requested");
            }
            _ = ticker.tick() => {
                if !sleep_or_cancel(jitter(schedule.jitter), &cancel).await {
                    return;
                }
            }
        }

        run_once(task.as_ref(), &cache, schedule.deadline()).await;
    }
}

/// One bounded cycle; failures and overruns are recorded on the snapshot.
pub async fn run_once(task: &dyn PollTask, cache: &AggregationCache, deadline: Duration) {
    let kind = task.kind();
    match time::timeout(deadline, task.run_cycle()).await {
        Ok(Ok(())) => debug!(kind = %kind, "Poll cycle completed"),
        Ok(Err(e)) => {
            warn!(kind = %kind, error = %format!("{e:#}"), "Poll cycle failed");
            cache.mark_error(kind, format!("{e:#}")).await;
        }
        Err(_) => {
            let message = format!("cycle exceeded its {}s deadline", deadline.as_secs());
            warn!(kind = %kind, "Poll cycle abandoned: {}", message);
            cache.mark_error(kind, message).await;
        }
    }
}

fn jitter(max: Duration) -> Duration {
    let max_ms = max.as_millis() as u64;
    if max_ms == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::thread_rng().gen_range(0..=max_ms))
}

/// False when cancelled before the delay elapsed.
async fn sleep_or_cancel(delay: Duration, cancel: &CancellationToken) -> bool {
    if delay.is_zero() {
        return !cancel.is_cancelled();
    }
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = time::sleep(delay) => true,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::Utc;

    use super::*;
    use crate::core::client::fake_cluster_api::{k8s_node, FakeClusterApi};
    use crate::core::state::runtime::aggregation_cache::test_support::{thresholds, tokio_clock};
    use crate::scheduler::tasks::cluster::task::ClusterPollTask;

    fn schedule(interval_secs: u64) -> PollSchedule {
        PollSchedule {
            interval: Duration::from_secs(interval_secs),
            jitter: Duration::ZERO,
            stale_after: Duration::from_secs(interval_secs * 3),
        }
    }

    fn five_nodes_four_ready() -> Arc<FakeClusterApi> {
        Arc::new(FakeClusterApi::with_nodes(vec![
            k8s_node("rpi1", true, Some("control-plane")),
            k8s_node("rpi2", true, None),
            k8s_node("rpi3", true, None),
            k8s_node("rpi4", true, None),
            k8s_node("rpi5", false, None),
        ]))
    }

    #[tokio::test(start_paused = true)]
    async fn publishes_cluster_snapshot() {
        let api = five_nodes_four_ready();
        let cache = Arc::new(AggregationCache::new(thresholds(30)).with_clock(tokio_clock()));
        let task = Arc::new(ClusterPollTask::new(api, cache.clone(), "lab".into()));
        let cancel = CancellationToken::new();

        let handle = tokio::spawn(run_poll_loop(task, cache.clone(), schedule(10), cancel.clone()));
        time::sleep(Duration::from_secs(1)).await;

        let view = cache.cluster().await.unwrap();
        assert_eq!(view.data.cluster.node_count, 5);
        assert_eq!(view.data.cluster.ready_nodes, 4);
        assert!(!view.status.stale);

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn unreachable_api_keeps_last_good_snapshot() {
        let api = five_nodes_four_ready();
        let cache = Arc::new(AggregationCache::new(thresholds(30)).with_clock(tokio_clock()));
        let task = Arc::new(ClusterPollTask::new(api.clone(), cache.clone(), "lab".into()));
        let cancel = CancellationToken::new();

        let handle = tokio::spawn(run_poll_loop(task, cache.clone(), schedule(10), cancel.clone()));
        time::sleep(Duration::from_secs(1)).await;
        let good = cache.cluster().await.unwrap();
        let published_at = good.status.last_success_at.unwrap();

        api.set_unavailable(true);
        time::sleep(Duration::from_secs(30)).await;

        let view = cache.cluster().await.unwrap();
        assert!(Arc::ptr_eq(&good.data, &view.data));
        assert!(view.status.stale);
        assert_eq!(view.status.consecutive_failures, 3);
        assert_eq!(view.status.last_success_at, Some(published_at));
        assert!(cache.now() - published_at > chrono::Duration::seconds(30));
        assert!(view.status.last_error.unwrap().contains("connection refused"));

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_request_runs_an_extra_cycle() {
        let api = five_nodes_four_ready();
        let cache = Arc::new(AggregationCache::new(thresholds(30)));
        let task = Arc::new(ClusterPollTask::new(api.clone(), cache.clone(), "lab".into()));
        let cancel = CancellationToken::new();

        let handle = tokio::spawn(run_poll_loop(task, cache.clone(), schedule(3600), cancel.clone()));
        time::sleep(Duration::from_secs(1)).await;
        let reads_after_first = api.reads();

        cache.request_refresh(ResourceKind::Cluster);
        time::sleep(Duration::from_secs(1)).await;

        assert_eq!(api.reads(), reads_after_first * 2);

        cancel.cancel();
        handle.await.unwrap();
    }

    struct StuckTask {
        started: AtomicUsize,
    }

    #[async_trait]
    impl PollTask for StuckTask {
        fn kind(&self) -> ResourceKind {
            ResourceKind::Services
        }

        async fn run_cycle(&self) -> anyhow::Result<()> {
            self.started.fetch_add(1, Ordering::SeqCst);
            std::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn overrunning_cycle_is_recorded_as_failure() {
        let cache = AggregationCache::new(thresholds(30));
        let task = StuckTask {
            started: AtomicUsize::new(0),
        };

        run_once(&task, &cache, Duration::from_secs(20)).await;

        let status = cache.status(ResourceKind::Services).await;
        assert_eq!(status.consecutive_failures, 1);
        assert!(status.last_error.unwrap().contains("deadline"));
        assert!(status.last_attempt_at.unwrap() <= Utc::now());
        assert_eq!(task.started.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_during_initial_jitter_stops_loop() {
        let cache = Arc::new(AggregationCache::new(thresholds(30)));
        let task = Arc::new(StuckTask {
            started: AtomicUsize::new(0),
        });
        let cancel = CancellationToken::new();
        let mut sched = schedule(10);
        sched.jitter = Duration::from_secs(60);

        cancel.cancel();
        run_poll_loop(task.clone(), cache, sched, cancel).await;

        assert_eq!(task.started.load(Ordering::SeqCst), 0);
    }
}
