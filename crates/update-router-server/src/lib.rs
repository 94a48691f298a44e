//! update-router-server: HTTP service deciding which update channel a client
//! module should follow.
//!
//! This crate provides:
//! - `GET /ping` liveness probe
//! - `GET <root>/channel?module=<name>`: `{"url": "/release"}` or `{"url": "/testing"}`
//! - `POST <root>/event` and `GET <root>/event`: record and list client events
//!
//! # Architecture
//!
//! The server is built on Axum. Routes under every API root pass through a
//! fixed middleware stack:
//!
//! ```text
//! metrics → request id → access log → identity → handler
//! ```
//!
//! Handlers map their own failures to HTTP statuses with [`ApiError`];
//! middleware only observes responses or, for authentication, rejects before
//! the handler runs.
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use update_router_server::{Metrics, Server};
//! use update_router_store::MemoryStore;
//!
//! let server = Server::new(
//!     "0.0.0.0:8080",
//!     &["/api/module-update-router/v1".to_string()],
//!     Arc::new(MemoryStore::new()),
//!     None,
//!     Metrics::new()?,
//! )?;
//! server.listen_and_serve().await?;
//! ```

pub mod config;
pub mod error;
pub mod events;
pub mod extract;
pub mod identity;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports for convenience
pub use crate::config::Config;
pub use crate::error::{ApiError, ApiResult};
pub use crate::events::EventRelay;
pub use crate::identity::Identity;
pub use crate::metrics::Metrics;
pub use crate::server::{Server, ServerError};
pub use crate::state::AppState;

// Re-export dependent crates
pub use update_router_store;
