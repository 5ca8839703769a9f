use std::fmt;
use std::sync::Arc;

use serde::{Serialize, Serializer};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::models::courier::{CourierStatusRecord, STATE_AVAILABLE, STATE_READY_FOR_ROUTE};
use crate::store::DispatchStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CourierAvailability {
    /// No courier selected, no record, or no event received yet.
    Unknown,
    /// The record belongs to another tenant's fleet.
    CrossTenant,
    /// Lower-cased state as reported by the courier's device.
    Reported(String),
}

impl CourierAvailability {
    pub fn from_record(record: Option<&CourierStatusRecord>, tenant_id: &str) -> Self {
        match record {
            None => CourierAvailability::Unknown,
            Some(record) if record.tenant_id != tenant_id => CourierAvailability::CrossTenant,
            Some(record) => {
                let state = record.state.trim().to_lowercase();
                if state.is_empty() {
                    CourierAvailability::Unknown
                } else {
                    CourierAvailability::Reported(state)
                }
            }
        }
    }

    /// `available` and `ready_for_route` both count; anything else fails closed.
    pub fn is_available(&self) -> bool {
        matches!(self, CourierAvailability::Reported(state)
            if state == STATE_AVAILABLE || state == STATE_READY_FOR_ROUTE)
    }

    pub fn as_str(&self) -> &str {
        match self {
            CourierAvailability::Unknown => "unknown",
            CourierAvailability::CrossTenant => "cross_tenant",
            CourierAvailability::Reported(state) => state,
        }
    }
}

impl fmt::Display for CourierAvailability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for CourierAvailability {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Follows one courier's live status record. State changes only arrive from
/// the store's change feed; dropping the tracker or calling `unsubscribe`
/// stops the background task.
pub struct CourierAvailabilityTracker {
    state_rx: watch::Receiver<CourierAvailability>,
    task: Option<JoinHandle<()>>,
}

impl CourierAvailabilityTracker {
    pub fn subscribe(
        store: Arc<dyn DispatchStore>,
        tenant_id: impl Into<String>,
        courier_id: Option<String>,
    ) -> Self {
        let (state_tx, state_rx) = watch::channel(CourierAvailability::Unknown);

        let Some(courier_id) = courier_id else {
            return Self {
                state_rx,
                task: None,
            };
        };

        let tenant_id = tenant_id.into();
        // Subscribe before the initial read so no write between the two is lost.
        let mut feed = store.subscribe_courier_status();

        let task = tokio::spawn(async move {
            match store.courier_status(&courier_id).await {
                Ok(record) => {
                    let _ = state_tx
                        .send(CourierAvailability::from_record(record.as_ref(), &tenant_id));
                }
                Err(err) => {
                    warn!(courier_id = %courier_id, error = %err, "courier status read failed");
                    let _ = state_tx.send(CourierAvailability::Unknown);
                }
            }

            loop {
                match feed.recv().await {
                    Ok(record) if record.courier_id == courier_id => {
                        let next = CourierAvailability::from_record(Some(&record), &tenant_id);
                        debug!(courier_id = %courier_id, state = %next, "courier status changed");
                        if state_tx.send(next).is_err() {
                            break;
                        }
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(courier_id = %courier_id, skipped, "courier status feed lagged");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });

        Self {
            state_rx,
            task: Some(task),
        }
    }

    pub fn current(&self) -> CourierAvailability {
        self.state_rx.borrow().clone()
    }

    /// Waits for the next pushed state. Returns `None` once the feed is gone.
    pub async fn changed(&mut self) -> Option<CourierAvailability> {
        self.state_rx.changed().await.ok()?;
        Some(self.state_rx.borrow_and_update().clone())
    }

    /// Waits for the initial status read. Trackers without a courier resolve
    /// to `Unknown` immediately.
    pub async fn first_reading(&mut self) -> CourierAvailability {
        if self.task.is_none() {
            return self.current();
        }
        match self.changed().await {
            Some(state) => state,
            None => self.current(),
        }
    }

    pub fn unsubscribe(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Point-in-time availability through a short-lived tracker.
pub async fn read_availability(
    store: Arc<dyn DispatchStore>,
    tenant_id: &str,
    courier_id: Option<&str>,
) -> CourierAvailability {
    let courier_id = courier_id
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string);

    let mut tracker = CourierAvailabilityTracker::subscribe(store, tenant_id, courier_id);
    let state = tracker.first_reading().await;
    tracker.unsubscribe();
    state
}

impl Drop for CourierAvailabilityTracker {
    fn drop(&mut self) {
        self.stop();
    }
}
