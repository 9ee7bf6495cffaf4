//! Shared fixtures for controller tests.

use std::sync::Arc;

use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use serde_json::Value;

use crate::app_state::{build_app_state, AppState};
use crate::core::client::fake_cluster_api::FakeClusterApi;
use crate::core::config::AppConfig;
use crate::core::state::runtime::aggregation_cache::test_support::thresholds;
use crate::core::state::runtime::aggregation_cache::AggregationCache;
use crate::scheduler::poll_loop::PollTask;
use crate::scheduler::tasks::cluster::task::ClusterPollTask;

pub fn state_with(api: Arc<FakeClusterApi>) -> AppState {
    let config = AppConfig::from_lookup(|_| None).unwrap();
    let cache = Arc::new(AggregationCache::new(thresholds(30)));
    build_app_state(Arc::new(config), api, cache)
}

/// Runs one cluster cycle against `api` so the cluster snapshot is warm.
pub async fn warm_cluster(state: &AppState, api: Arc<FakeClusterApi>) {
    ClusterPollTask::new(api, state.cache.clone(), "rpi-k8s-cluster".into())
        .run_cycle()
        .await
        .unwrap();
}

pub async fn into_parts(resp: impl IntoResponse) -> (StatusCode, HeaderMap, Value) {
    let resp = resp.into_response();
    let status = resp.status();
    let headers = resp.headers().clone();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, headers, body)
}

/// Resolves a handler result the way axum would.
pub async fn respond<T: IntoResponse, E: IntoResponse>(
    result: Result<T, E>,
) -> (StatusCode, HeaderMap, Value) {
    match result {
        Ok(ok) => into_parts(ok).await,
        Err(err) => into_parts(err).await,
    }
}
