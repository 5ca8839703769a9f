use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::{DashMap, DashSet};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::audit::{AuditEntry, NewAuditEntry};
use crate::models::courier::{CourierProfile, CourierStatusRecord};
use crate::models::order::{AssignmentPatch, Order};
use crate::models::route::Route;
use crate::store::DispatchStore;

pub struct MemoryStore {
    orders: DashMap<String, Order>,
    couriers: DashMap<String, CourierProfile>,
    statuses: DashMap<String, CourierStatusRecord>,
    audit: DashMap<String, Vec<AuditEntry>>,
    routes: DashMap<Uuid, (u64, Route)>,
    route_seq: AtomicU64,
    status_tx: broadcast::Sender<CourierStatusRecord>,
    rejected_orders: DashSet<String>,
    rejected_audits: DashSet<String>,
}

impl MemoryStore {
    pub fn new(event_buffer_size: usize) -> Self {
        let (status_tx, _unused_rx) = broadcast::channel(event_buffer_size.max(1));

        Self {
            orders: DashMap::new(),
            couriers: DashMap::new(),
            statuses: DashMap::new(),
            audit: DashMap::new(),
            routes: DashMap::new(),
            route_seq: AtomicU64::new(0),
            status_tx,
            rejected_orders: DashSet::new(),
            rejected_audits: DashSet::new(),
        }
    }

    /// Makes every later assignment write to `order_id` fail, the way a
    /// rejected remote write would.
    pub fn reject_writes_for(&self, order_id: impl Into<String>) {
        self.rejected_orders.insert(order_id.into());
    }

    pub fn accept_writes_for(&self, order_id: &str) {
        self.rejected_orders.remove(order_id);
    }

    /// Makes every later audit append for `entity_id` fail.
    pub fn reject_audits_for(&self, entity_id: impl Into<String>) {
        self.rejected_audits.insert(entity_id.into());
    }

    pub fn order_count(&self) -> usize {
        self.orders.len()
    }

    pub fn route_count(&self) -> usize {
        self.routes.len()
    }

    pub fn audit_count(&self) -> usize {
        self.audit.iter().map(|entry| entry.value().len()).sum()
    }

    fn publish_status(&self, record: CourierStatusRecord) {
        // No receivers is fine: nobody is watching this courier yet.
        let _ = self.status_tx.send(record);
    }
}

#[async_trait]
impl DispatchStore for MemoryStore {
    async fn order(&self, order_id: &str) -> Result<Option<Order>, StoreError> {
        Ok(self.orders.get(order_id).map(|entry| entry.value().clone()))
    }

    async fn upsert_order(&self, order: Order) -> Result<(), StoreError> {
        self.orders.insert(order.id.clone(), order);
        Ok(())
    }

    async fn write_assignment(
        &self,
        order_id: &str,
        patch: &AssignmentPatch,
    ) -> Result<(), StoreError> {
        if self.rejected_orders.contains(order_id) {
            return Err(StoreError::WriteFailed(format!(
                "order {order_id} rejected the assignment write"
            )));
        }

        let mut order = self
            .orders
            .get_mut(order_id)
            .ok_or_else(|| StoreError::NotFound(format!("order {order_id} not found")))?;
        order.apply(patch);
        Ok(())
    }

    async fn couriers_by_role(
        &self,
        tenant_id: &str,
        role: &str,
    ) -> Result<Vec<CourierProfile>, StoreError> {
        let mut couriers: Vec<CourierProfile> = self
            .couriers
            .iter()
            .filter(|entry| {
                let profile = entry.value();
                profile.tenant_id == tenant_id && profile.role.eq_ignore_ascii_case(role)
            })
            .map(|entry| entry.value().clone())
            .collect();
        couriers.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(couriers)
    }

    async fn upsert_courier(&self, profile: CourierProfile) -> Result<(), StoreError> {
        self.couriers.insert(profile.id.clone(), profile);
        Ok(())
    }

    async fn courier_status(
        &self,
        courier_id: &str,
    ) -> Result<Option<CourierStatusRecord>, StoreError> {
        Ok(self.statuses.get(courier_id).map(|entry| entry.value().clone()))
    }

    async fn upsert_courier_status(&self, record: CourierStatusRecord) -> Result<(), StoreError> {
        self.statuses.insert(record.courier_id.clone(), record.clone());
        self.publish_status(record);
        Ok(())
    }

    async fn set_courier_state(&self, courier_id: &str, state: &str) -> Result<(), StoreError> {
        let record = {
            let mut record = self.statuses.get_mut(courier_id).ok_or_else(|| {
                StoreError::NotFound(format!("no status record for courier {courier_id}"))
            })?;
            record.state = state.to_string();
            record.clone()
        };
        self.publish_status(record);
        Ok(())
    }

    fn subscribe_courier_status(&self) -> broadcast::Receiver<CourierStatusRecord> {
        self.status_tx.subscribe()
    }

    async fn append_audit(&self, entry: NewAuditEntry) -> Result<AuditEntry, StoreError> {
        if self.rejected_audits.contains(&entry.entity_id) {
            return Err(StoreError::WriteFailed(format!(
                "audit append for {} rejected",
                entry.entity_id
            )));
        }

        let stamped = AuditEntry::stamp(entry, Utc::now());
        self.audit
            .entry(stamped.entity_id.clone())
            .or_default()
            .push(stamped.clone());
        Ok(stamped)
    }

    async fn audit_trail(
        &self,
        entity_id: &str,
        tenant_id: &str,
    ) -> Result<Vec<AuditEntry>, StoreError> {
        let Some(entries) = self.audit.get(entity_id) else {
            return Ok(Vec::new());
        };

        Ok(entries
            .iter()
            .rev()
            .filter(|entry| entry.tenant_id == tenant_id)
            .cloned()
            .collect())
    }

    async fn save_route(&self, route: &Route) -> Result<(), StoreError> {
        match self.routes.entry(route.id) {
            Entry::Occupied(mut existing) => {
                if existing.get().1.tenant_id != route.tenant_id {
                    return Err(StoreError::Conflict(format!(
                        "route {} belongs to another tenant",
                        route.id
                    )));
                }
                let current = existing.get().1.status;
                if !current.can_become(route.status) {
                    return Err(StoreError::Conflict(format!(
                        "route {} is already {}",
                        route.id,
                        current.as_str()
                    )));
                }
                existing.get_mut().1 = route.clone();
            }
            Entry::Vacant(slot) => {
                let seq = self.route_seq.fetch_add(1, Ordering::Relaxed);
                slot.insert((seq, route.clone()));
            }
        }
        Ok(())
    }

    async fn route(&self, route_id: Uuid) -> Result<Option<Route>, StoreError> {
        Ok(self.routes.get(&route_id).map(|entry| entry.value().1.clone()))
    }

    async fn routes(&self, tenant_id: &str) -> Result<Vec<Route>, StoreError> {
        let mut routes: Vec<(u64, Route)> = self
            .routes
            .iter()
            .filter(|entry| entry.value().1.tenant_id == tenant_id)
            .map(|entry| entry.value().clone())
            .collect();
        routes.sort_by(|a, b| {
            b.1.created_at
                .cmp(&a.1.created_at)
                .then_with(|| b.0.cmp(&a.0))
        });
        Ok(routes.into_iter().map(|(_, route)| route).collect())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use serde_json::json;
    use uuid::Uuid;

    use super::MemoryStore;
    use crate::models::audit::{Actor, NewAuditEntry};
    use crate::models::courier::CourierStatusRecord;
    use crate::models::route::{KpiSnapshot, Route, RouteHeader, RouteStatus};
    use crate::store::DispatchStore;

    fn actor() -> Actor {
        Actor {
            id: "u1".to_string(),
            name: "Dana".to_string(),
            role: "dispatcher".to_string(),
        }
    }

    fn route(status: RouteStatus) -> Route {
        Route {
            id: Uuid::new_v4(),
            tenant_id: "t1".to_string(),
            header: RouteHeader::default(),
            status,
            kpis: KpiSnapshot::default(),
            stops: Vec::new(),
            created_by: actor(),
            created_at: Utc::now(),
            published_at: None,
        }
    }

    #[tokio::test]
    async fn published_route_cannot_be_saved_as_draft() {
        let store = MemoryStore::new(16);
        let mut route = route(RouteStatus::Published);
        store.save_route(&route).await.unwrap();

        route.status = RouteStatus::Draft;
        assert!(store.save_route(&route).await.is_err());
        let saved = store.route(route.id).await.unwrap().unwrap();
        assert_eq!(saved.status, RouteStatus::Published);
    }

    #[tokio::test]
    async fn route_id_of_another_tenant_is_refused() {
        let store = MemoryStore::new(16);
        let original = route(RouteStatus::Draft);
        store.save_route(&original).await.unwrap();

        let mut foreign = original.clone();
        foreign.tenant_id = "t2".to_string();
        assert!(store.save_route(&foreign).await.is_err());

        assert_eq!(store.routes("t1").await.unwrap().len(), 1);
        assert!(store.routes("t2").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn audit_trail_is_newest_first_and_tenant_scoped() {
        let store = MemoryStore::new(16);
        for (tenant, reason) in [("t1", "first"), ("t2", "other"), ("t1", "second")] {
            store
                .append_audit(NewAuditEntry {
                    entity_id: "o1".to_string(),
                    tenant_id: tenant.to_string(),
                    changes: Vec::new(),
                    actor: actor(),
                    reason: reason.to_string(),
                    metadata: json!({}),
                })
                .await
                .unwrap();
        }

        let trail = store.audit_trail("o1", "t1").await.unwrap();
        let reasons: Vec<&str> = trail.iter().map(|e| e.reason.as_str()).collect();
        assert_eq!(reasons, vec!["second", "first"]);
    }

    #[tokio::test]
    async fn state_change_is_broadcast() {
        let store = MemoryStore::new(16);
        store
            .upsert_courier_status(CourierStatusRecord {
                courier_id: "c1".to_string(),
                tenant_id: "t1".to_string(),
                location: None,
                state: "available".to_string(),
                last_ping: Utc::now(),
            })
            .await
            .unwrap();

        let mut rx = store.subscribe_courier_status();
        store.set_courier_state("c1", "ready_for_route").await.unwrap();

        let record = rx.recv().await.unwrap();
        assert_eq!(record.state, "ready_for_route");
        assert!(store.set_courier_state("missing", "available").await.is_err());
    }
}
