//! In-process store used for local development and tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::error::{StoreError, StoreResult};
use crate::models::Event;
use crate::store::Store;

/// Store backed by process memory. Contents are lost on exit.
#[derive(Debug, Default)]
pub struct MemoryStore {
    modules: RwLock<HashMap<(String, String), i64>>,
    events: RwLock<Vec<Event>>,
    closed: AtomicBool,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enroll `org_id` for `module`.
    pub async fn insert_module(&self, module: &str, org_id: &str) -> StoreResult<()> {
        self.ensure_open()?;
        let mut modules = self.modules.write().await;
        *modules
            .entry((module.to_string(), org_id.to_string()))
            .or_insert(0) += 1;
        Ok(())
    }

    /// Whether [`Store::close`] has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn ensure_open(&self) -> StoreResult<()> {
        if self.is_closed() {
            return Err(StoreError::Closed);
        }
        Ok(())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn count(&self, module: &str, org_id: &str) -> StoreResult<i64> {
        self.ensure_open()?;
        let modules = self.modules.read().await;
        Ok(modules
            .get(&(module.to_string(), org_id.to_string()))
            .copied()
            .unwrap_or(0))
    }

    async fn append_event(&self, payload: Bytes) -> StoreResult<Event> {
        self.ensure_open()?;
        let mut events = self.events.write().await;
        let event = Event {
            id: events.len() as i64 + 1,
            received_at: Utc::now(),
            payload: Event::payload_from_bytes(&payload),
        };
        events.push(event.clone());
        Ok(event)
    }

    async fn events(&self, limit: i64, offset: i64) -> StoreResult<Vec<Event>> {
        self.ensure_open()?;
        let events = self.events.read().await;
        let skip = usize::try_from(offset.max(0)).unwrap_or(usize::MAX);
        let iter = events.iter().skip(skip).cloned();
        Ok(match usize::try_from(limit) {
            Ok(take) => iter.take(take).collect(),
            Err(_) => iter.collect(),
        })
    }

    async fn close(&self) -> StoreResult<()> {
        if !self.closed.swap(true, Ordering::AcqRel) {
            tracing::debug!("Closed in-memory store");
        }
        Ok(())
    }
}
