//! The application's HTTP server.
//!
//! Owns the routing table and the store's lifetime. `/ping` is mounted at the
//! top level; `/channel` and `/event` are mounted under every API root behind
//! the middleware pipeline.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use axum::Router;
use tokio::net::TcpListener;
use update_router_store::{Store, StoreError};

use crate::events::EventRelay;
use crate::metrics::Metrics;
use crate::middleware::Pipeline;
use crate::routes;
use crate::state::AppState;

/// Server errors.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// API root does not start with `/`.
    #[error("invalid API root {0:?}: must start with '/'")]
    InvalidRoot(String),

    /// The listen address could not be bound.
    #[error("cannot listen on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Serving failed.
    #[error("server error: {0}")]
    Io(#[from] std::io::Error),

    /// Closing the store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// HTTP server: routing table plus store handle.
pub struct Server {
    addr: String,
    router: Router,
    state: AppState,
    closed: AtomicBool,
}

impl Server {
    /// Build the routing table for `api_roots`.
    pub fn new(
        addr: impl Into<String>,
        api_roots: &[String],
        store: Arc<dyn Store>,
        events: Option<EventRelay>,
        metrics: Metrics,
    ) -> Result<Self, ServerError> {
        let state = AppState::new(store, metrics.clone(), events);
        let pipeline = Pipeline::new(metrics);

        let mut router: Router = pipeline.apply_request_id(routes::ping::routes());
        let mut seen = HashSet::new();
        for root in api_roots {
            let root = normalize_root(root)?;
            if !seen.insert(root.clone()) {
                continue;
            }

            let api = pipeline
                .apply(routes::api_routes())
                .with_state(state.clone());
            router = if root.is_empty() {
                router.merge(api)
            } else {
                router.nest(&root, api)
            };
            tracing::debug!(root = %root, "Registered API root");
        }

        Ok(Self {
            addr: addr.into(),
            router,
            state,
            closed: AtomicBool::new(false),
        })
    }

    /// The configured listen address.
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// The routing table.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Shared handler state.
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Bind the configured address and serve until an I/O error occurs.
    pub async fn listen_and_serve(&self) -> Result<(), ServerError> {
        self.serve_with_shutdown(std::future::pending()).await
    }

    /// Bind the configured address and serve until `signal` resolves.
    pub async fn serve_with_shutdown<F>(&self, signal: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(&self.addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: self.addr.clone(),
                source,
            })?;
        self.serve(listener, signal).await
    }

    /// Serve on an already bound listener until `signal` resolves.
    pub async fn serve<F>(&self, listener: TcpListener, signal: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if let Ok(local) = listener.local_addr() {
            tracing::info!("Listening on {}", local);
        }

        axum::serve(listener, self.router())
            .with_graceful_shutdown(signal)
            .await?;
        Ok(())
    }

    /// Close the store. Later calls are no-ops.
    pub async fn close(&self) -> Result<(), ServerError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.state.store().close().await?;
        Ok(())
    }
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("addr", &self.addr)
            .finish_non_exhaustive()
    }
}

/// Strip trailing slashes; `/` becomes the empty root.
fn normalize_root(root: &str) -> Result<String, ServerError> {
    let trimmed = root.trim_end_matches('/');
    if !trimmed.is_empty() && !trimmed.starts_with('/') {
        return Err(ServerError::InvalidRoot(root.to_string()));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Method, Request, StatusCode},
    };
    use update_router_store::MemoryStore;

    use super::*;
    use crate::testing::{API_ROOT, TestApp, identity_header, send};

    fn server(roots: &[&str], store: Arc<MemoryStore>) -> Server {
        let roots: Vec<String> = roots.iter().map(|r| r.to_string()).collect();
        Server::new(
            "127.0.0.1:0",
            &roots,
            store,
            None,
            Metrics::new().unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_normalize_root() {
        assert_eq!(normalize_root("/api/x/v1/").unwrap(), "/api/x/v1");
        assert_eq!(normalize_root("/").unwrap(), "");
        assert!(matches!(
            normalize_root("api"),
            Err(ServerError::InvalidRoot(_))
        ));
    }

    #[tokio::test]
    async fn test_ping_any_method() {
        let app = TestApp::new(Arc::new(MemoryStore::new()));

        for method in [Method::GET, Method::POST, Method::PUT] {
            let request = Request::builder()
                .method(method)
                .uri("/ping")
                .body(Body::empty())
                .unwrap();
            let response = app.send(request).await;
            assert_eq!(response.status, StatusCode::OK);
            assert_eq!(&response.body[..], b"OK");
            assert!(response.headers.contains_key("x-request-id"));
        }
    }

    #[tokio::test]
    async fn test_every_response_carries_request_id() {
        let app = TestApp::new(Arc::new(MemoryStore::new()));

        for uri in [
            format!("{}/channel?module=m", API_ROOT),
            format!("{}/channel", API_ROOT),
            format!("{}/event", API_ROOT),
        ] {
            let request = Request::get(uri.as_str())
                .header("x-request-id", "corr-1")
                .header(crate::identity::IDENTITY_HEADER, identity_header("acct-1", "User"))
                .body(Body::empty())
                .unwrap();
            let response = app.send(request).await;
            assert_eq!(response.headers["x-request-id"], "corr-1", "{}", uri);
        }
    }

    #[tokio::test]
    async fn test_unknown_path_under_root_is_not_found() {
        let app = TestApp::new(Arc::new(MemoryStore::new()));
        let response = app
            .get(&format!("{}/unknown", API_ROOT), Some(("acct-1", "User")))
            .await;
        assert_eq!(response.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_path_outside_roots_is_not_found() {
        let app = TestApp::new(Arc::new(MemoryStore::new()));
        let response = app.get("/other/channel?module=m", Some(("acct-1", "User"))).await;
        assert_eq!(response.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_multiple_roots() {
        let server = server(
            &[
                "/api/module-update-router/v1",
                "/api/module-update-router/v1.0",
                "/api/module-update-router/v1/",
            ],
            Arc::new(MemoryStore::new()),
        );

        for root in ["/api/module-update-router/v1", "/api/module-update-router/v1.0"] {
            let request = Request::get(format!("{}/channel?module=m", root))
                .header(crate::identity::IDENTITY_HEADER, identity_header("acct-1", "User"))
                .body(Body::empty())
                .unwrap();
            let (status, _, _) = send(server.router(), request).await;
            assert_eq!(status, StatusCode::OK, "{}", root);
        }
    }

    #[tokio::test]
    async fn test_invalid_root() {
        let result = Server::new(
            "127.0.0.1:0",
            &["api".to_string()],
            Arc::new(MemoryStore::new()),
            None,
            Metrics::new().unwrap(),
        );
        assert!(matches!(result, Err(ServerError::InvalidRoot(_))));
    }

    #[tokio::test]
    async fn test_close_closes_store_once() {
        let store = Arc::new(MemoryStore::new());
        let server = server(&[API_ROOT], store.clone());

        server.close().await.unwrap();
        assert!(store.is_closed());
        server.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_bind_failure() {
        let server = Server::new(
            "not-an-address",
            &[],
            Arc::new(MemoryStore::new()),
            None,
            Metrics::new().unwrap(),
        )
        .unwrap();
        let result = server.listen_and_serve().await;
        assert!(matches!(result, Err(ServerError::Bind { .. })));
    }

    #[tokio::test]
    async fn test_serve_and_shutdown() {
        let server = server(&[API_ROOT], Arc::new(MemoryStore::new()));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();

        tx.send(()).unwrap();
        server
            .serve(listener, async {
                let _ = rx.await;
            })
            .await
            .unwrap();
    }
}
