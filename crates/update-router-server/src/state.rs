//! Application state shared across handlers.

use std::sync::Arc;

use update_router_store::Store;

use crate::events::EventRelay;
use crate::metrics::Metrics;

/// Application state shared across all handlers.
///
/// This is cloneable and can be extracted in handlers using `State<AppState>`.
#[derive(Clone)]
pub struct AppState {
    /// Persistence handle.
    store: Arc<dyn Store>,
    /// Metrics sink.
    metrics: Metrics,
    /// Optional relay for accepted events.
    events: Option<EventRelay>,
}

impl AppState {
    /// Create new application state.
    pub fn new(store: Arc<dyn Store>, metrics: Metrics, events: Option<EventRelay>) -> Self {
        Self {
            store,
            metrics,
            events,
        }
    }

    /// Get a reference to the store.
    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    /// Get a reference to the metrics sink.
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Get the event relay, if configured.
    pub fn events(&self) -> Option<&EventRelay> {
        self.events.as_ref()
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("events", &self.events.is_some())
            .finish_non_exhaustive()
    }
}
