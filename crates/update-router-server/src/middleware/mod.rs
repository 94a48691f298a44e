//! Middleware pipeline for API routes.
//!
//! Stages, outermost first:
//!
//! ```text
//! metrics → request id → logging → authentication → handler
//! ```
//!
//! Metrics sees total latency including auth failures, the request id exists
//! before anything is logged, and logging observes whatever response auth or
//! the handler produced.

pub mod auth;
pub mod logging;
pub mod metrics;
pub mod recorder;
pub mod request_id;

use axum::{Router, middleware::from_fn, middleware::from_fn_with_state};
use tower::ServiceBuilder;

use crate::metrics::Metrics;

/// The assembled middleware stack applied under every API root.
#[derive(Debug, Clone)]
pub struct Pipeline {
    metrics: Metrics,
}

impl Pipeline {
    /// Create a pipeline recording into `metrics`.
    pub fn new(metrics: Metrics) -> Self {
        Self { metrics }
    }

    /// Wrap every route of `router` with the full stack.
    pub fn apply<S>(&self, router: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        router.layer(
            ServiceBuilder::new()
                .layer(from_fn_with_state(
                    self.metrics.clone(),
                    metrics::track_metrics,
                ))
                .layer(request_id::assign_layer())
                .layer(request_id::echo_layer())
                .layer(from_fn(logging::log_requests))
                .layer(from_fn(auth::authenticate)),
        )
    }

    /// Wrap `router` with the request id stages only.
    pub fn apply_request_id<S>(&self, router: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        router.layer(
            ServiceBuilder::new()
                .layer(request_id::assign_layer())
                .layer(request_id::echo_layer()),
        )
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use axum::{
        body::Body,
        http::{Request, StatusCode},
        routing::get,
    };

    use super::*;
    use crate::identity::{IDENTITY_HEADER, Identity};
    use crate::testing::{identity_header, sample, send};

    fn counting_router(calls: Arc<AtomicUsize>) -> Router {
        Router::new().route(
            "/echo",
            get(move |identity: Identity| {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    format!("hello {}", identity.org_id())
                }
            }),
        )
    }

    #[tokio::test]
    async fn test_auth_failure_skips_handler() {
        let metrics = Metrics::new().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let router = Pipeline::new(metrics.clone()).apply(counting_router(calls.clone()));

        let request = Request::get("/echo").body(Body::empty()).unwrap();
        let (status, headers, body) = send(router, request).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(headers.contains_key("x-request-id"));

        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(json["message"].as_str().unwrap().contains(IDENTITY_HEADER));

        // Metrics observe the short-circuited request.
        let text = metrics.render();
        assert!(sample(&text, "http_requests_total", &[r#"code="401""#, r#"handler="/echo""#]).is_some());
    }

    #[tokio::test]
    async fn test_malformed_identity_is_bad_request() {
        let calls = Arc::new(AtomicUsize::new(0));
        let router =
            Pipeline::new(Metrics::new().unwrap()).apply(counting_router(calls.clone()));

        let request = Request::get("/echo")
            .header(IDENTITY_HEADER, "%%%")
            .body(Body::empty())
            .unwrap();
        let (status, _, _) = send(router, request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_identity_reaches_handler() {
        let calls = Arc::new(AtomicUsize::new(0));
        let router =
            Pipeline::new(Metrics::new().unwrap()).apply(counting_router(calls.clone()));

        let request = Request::get("/echo")
            .header(IDENTITY_HEADER, identity_header("acct-1", "User"))
            .body(Body::empty())
            .unwrap();
        let (status, _, body) = send(router, request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(&body[..], b"hello acct-1");
    }

    #[tokio::test]
    async fn test_request_id_is_preserved() {
        let router =
            Pipeline::new(Metrics::new().unwrap()).apply(counting_router(Arc::default()));

        let request = Request::get("/echo")
            .header("x-request-id", "req-42")
            .body(Body::empty())
            .unwrap();
        let (_, headers, _) = send(router, request).await;

        assert_eq!(headers["x-request-id"], "req-42");
    }

    #[tokio::test]
    async fn test_request_id_is_generated() {
        let router = Pipeline::new(Metrics::new().unwrap())
            .apply_request_id(Router::new().route("/ok", get(|| async { "OK" })));

        let request = Request::get("/ok").body(Body::empty()).unwrap();
        let (_, headers, _) = send(router, request).await;

        let id = headers["x-request-id"].to_str().unwrap();
        assert!(uuid::Uuid::parse_str(id).is_ok());
    }
}
