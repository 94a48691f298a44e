//! Route definitions for the HTTP API.

pub mod channel;
pub mod event;
pub mod ping;

use axum::{Router, http::StatusCode};

use crate::state::AppState;

/// Routes served under every API root.
///
/// Unknown paths under a root get a plain 404, still passing through the
/// pipeline.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(channel::routes())
        .merge(event::routes())
        .fallback(|| async { StatusCode::NOT_FOUND })
}
