use std::sync::Arc;

use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::engine::draft::PlanningSettings;
use crate::engine::publish::DispatchPublisher;
use crate::models::route::RouteStatus;
use crate::observability::metrics::Metrics;
use crate::store::{DispatchStore, MemoryStore};

/// Pushed to WebSocket clients after every save or publish.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchEvent {
    pub route_id: Uuid,
    pub tenant_id: String,
    pub status: RouteStatus,
    pub completed: usize,
    pub failed: usize,
}

pub struct AppState {
    pub store: Arc<dyn DispatchStore>,
    pub publisher: DispatchPublisher,
    pub dispatch_events_tx: broadcast::Sender<DispatchEvent>,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(settings: PlanningSettings, event_buffer_size: usize) -> Self {
        let store: Arc<dyn DispatchStore> = Arc::new(MemoryStore::new(event_buffer_size));
        Self::with_store(store, settings, event_buffer_size)
    }

    pub fn with_store(
        store: Arc<dyn DispatchStore>,
        settings: PlanningSettings,
        event_buffer_size: usize,
    ) -> Self {
        let (dispatch_events_tx, _unused_rx) = broadcast::channel(event_buffer_size.max(1));
        let metrics = Metrics::new();

        Self {
            publisher: DispatchPublisher::new(store.clone(), settings, metrics.clone()),
            store,
            dispatch_events_tx,
            metrics,
        }
    }
}
