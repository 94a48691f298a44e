//! update-router-store: Storage layer for the module update router
//!
//! This crate provides:
//! - The [`Store`] trait the HTTP layer depends on
//! - A PostgreSQL implementation via sqlx ([`PgStore`])
//! - An in-process implementation for development and tests ([`MemoryStore`])
//! - The embedded schema, reset and seed utilities
//!
//! # Data
//!
//! - `accounts_modules`: which organizations are enrolled for which modules.
//!   A positive count for a `(module, org_id)` pair routes that caller to the
//!   testing channel.
//! - `events`: opaque client-reported events, kept in insertion order.
//!
//! # Usage
//!
//! ```rust,ignore
//! use update_router_store::{PgStore, Store, StoreConfig};
//!
//! let store = PgStore::connect(StoreConfig::new(url)).await?;
//! let count = store.count("insights-core", "12345").await?;
//! let events = store.events(-1, 0).await?;
//! ```

pub mod error;
pub mod memory;
pub mod models;
pub mod schema;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use models::Event;
pub use store::{PgStore, Store, StoreConfig};
