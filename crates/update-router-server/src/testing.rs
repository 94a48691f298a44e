//! Shared helpers for unit tests.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, Bytes},
    http::{HeaderMap, Request, StatusCode, header},
};
use tower::ServiceExt;
use update_router_store::{Event, Store, StoreError, StoreResult};

use crate::events::EventRelay;
use crate::identity::{IDENTITY_HEADER, Identity, Internal};
use crate::metrics::Metrics;
use crate::server::Server;
use crate::state::AppState;

/// API root used by tests.
pub(crate) const API_ROOT: &str = "/api/module-update-router/v1";

/// Store whose every operation fails.
pub(crate) struct FailingStore;

#[async_trait]
impl Store for FailingStore {
    async fn count(&self, _module: &str, _org_id: &str) -> StoreResult<i64> {
        Err(StoreError::Config("connection refused".into()))
    }

    async fn append_event(&self, _payload: Bytes) -> StoreResult<Event> {
        Err(StoreError::Config("connection refused".into()))
    }

    async fn events(&self, _limit: i64, _offset: i64) -> StoreResult<Vec<Event>> {
        Err(StoreError::Config("connection refused".into()))
    }

    async fn close(&self) -> StoreResult<()> {
        Ok(())
    }
}

/// Encoded identity header for `org_id` and `caller_type`.
pub(crate) fn identity_header(org_id: &str, caller_type: &str) -> String {
    Identity {
        org_id: org_id.to_string(),
        account_number: String::new(),
        caller_type: caller_type.to_string(),
        internal: Internal::default(),
    }
    .encode()
}

/// Find the Prometheus sample line for `name` carrying all of `labels`.
pub(crate) fn sample<'a>(text: &'a str, name: &str, labels: &[&str]) -> Option<&'a str> {
    let prefix = format!("{}{{", name);
    text.lines()
        .find(|line| line.starts_with(&prefix) && labels.iter().all(|l| line.contains(l)))
}

/// Send one request through `router`.
pub(crate) async fn send(router: Router, request: Request<Body>) -> (StatusCode, HeaderMap, Bytes) {
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, headers, body)
}

/// Collected response.
pub(crate) struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).unwrap()
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
    }
}

/// A fully assembled server mounted at [`API_ROOT`].
pub(crate) struct TestApp {
    pub router: Router,
    pub metrics: Metrics,
    pub state: AppState,
}

impl TestApp {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self::with_relay(store, None)
    }

    pub fn with_relay(store: Arc<dyn Store>, events: Option<EventRelay>) -> Self {
        let metrics = Metrics::new().unwrap();
        let server = Server::new(
            "127.0.0.1:0",
            &[API_ROOT.to_string()],
            store,
            events,
            metrics.clone(),
        )
        .unwrap();

        Self {
            router: server.router(),
            metrics,
            state: server.state().clone(),
        }
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let (status, headers, body) = send(self.router.clone(), request).await;
        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str, identity: Option<(&str, &str)>) -> TestResponse {
        self.send(build(Request::get(uri), identity, Body::empty()))
            .await
    }

    pub async fn post(&self, uri: &str, identity: Option<(&str, &str)>, body: &str) -> TestResponse {
        self.send(build(Request::post(uri), identity, Body::from(body.to_string())))
            .await
    }
}

fn build(
    mut builder: http::request::Builder,
    identity: Option<(&str, &str)>,
    body: Body,
) -> Request<Body> {
    if let Some((org_id, caller_type)) = identity {
        builder = builder.header(IDENTITY_HEADER, identity_header(org_id, caller_type));
    }
    builder.body(body).unwrap()
}
