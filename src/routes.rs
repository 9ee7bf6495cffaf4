use axum::{
    http::{HeaderName, HeaderValue, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::api::routes::{cluster_routes, deployment_routes, hardware_routes, system_routes};
use crate::api::util::json::{LAST_SUCCESS_HEADER, STALE_HEADER};
use crate::app_state::AppState;
use crate::core::config::AppConfig;

/// Build the main application router
pub fn app_router(config: &AppConfig) -> Router<AppState> {
    let api = Router::new()
        .merge(cluster_routes::cluster_routes())
        .merge(hardware_routes::hardware_routes())
        .merge(deployment_routes::deployment_routes())
        .merge(system_routes::system_routes());

    Router::new()
        .route("/", get(root))
        .nest("/api", api)
        .fallback(handler_404)
        .layer(cors_layer(&config.cors_origins))
        .layer(TraceLayer::new_for_http())
}

/// `*` allows any origin; otherwise only the listed ones.
fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return CorsLayer::very_permissive();
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers([
            HeaderName::from_static(STALE_HEADER),
            HeaderName::from_static(LAST_SUCCESS_HEADER),
        ])
}

async fn root() -> &'static str {
    "rpi-k8s-management is running"
}

async fn handler_404() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        "The requested resource was not found",
    )
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{header, Method, Request};
    use tower::ServiceExt;

    use super::*;
    use crate::api::controller::test_support::{into_parts, state_with};
    use crate::core::client::fake_cluster_api::FakeClusterApi;

    async fn call(method: Method, uri: &str) -> (StatusCode, axum::http::HeaderMap, serde_json::Value) {
        let state = state_with(Arc::new(FakeClusterApi::default()));
        let config = AppConfig::from_lookup(|_| None).unwrap();
        let app = app_router(&config).with_state(state);

        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        into_parts(app.oneshot(request).await.unwrap()).await
    }

    #[tokio::test]
    async fn malformed_operation_id_is_a_typed_error() {
        let (status, headers, body) = call(Method::GET, "/api/deployments/not-a-uuid").await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(headers[header::CONTENT_TYPE], "application/json");
        assert_eq!(body["error"], "ValidationError");
    }

    #[tokio::test]
    async fn malformed_delete_query_is_a_typed_error() {
        let (status, _, body) =
            call(Method::DELETE, "/api/deployments/ml/api?delete_service=maybe").await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], "ValidationError");
    }

    #[tokio::test]
    async fn cold_cluster_route_is_503() {
        let (status, _, body) = call(Method::GET, "/api/cluster").await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"], "ServiceUnavailable");
    }

    #[tokio::test]
    async fn health_routes_are_wired() {
        let (status, _, body) = call(Method::GET, "/api/live").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!({ "live": true }));

        let (status, _, _) = call(Method::GET, "/api/ready").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

        let (status, _, _) = call(Method::GET, "/api/deployments").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[test]
    fn router_builds_for_both_cors_modes() {
        let mut config = AppConfig::from_lookup(|_| None).unwrap();
        let _ = app_router(&config);

        config.cors_origins = vec!["http://rpi1.local:3000".into(), "bad\norigin".into()];
        let _ = app_router(&config);
    }
}
