//! Storage collaborator used by the dispatch engine.
//!
//! The engine only talks to documents through [`DispatchStore`]; the real
//! document database and its change notifications live outside this crate.
//! [`MemoryStore`] backs the HTTP service and the tests.

pub mod memory;

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::error::StoreError;
use crate::models::audit::{AuditEntry, NewAuditEntry};
use crate::models::courier::{CourierProfile, CourierStatusRecord};
use crate::models::order::{AssignmentPatch, Order};
use crate::models::route::Route;

pub use memory::MemoryStore;

#[async_trait]
pub trait DispatchStore: Send + Sync {
    async fn order(&self, order_id: &str) -> Result<Option<Order>, StoreError>;

    async fn upsert_order(&self, order: Order) -> Result<(), StoreError>;

    /// Overwrites the order's assignment fields with `patch`.
    async fn write_assignment(
        &self,
        order_id: &str,
        patch: &AssignmentPatch,
    ) -> Result<(), StoreError>;

    async fn couriers_by_role(
        &self,
        tenant_id: &str,
        role: &str,
    ) -> Result<Vec<CourierProfile>, StoreError>;

    async fn upsert_courier(&self, profile: CourierProfile) -> Result<(), StoreError>;

    async fn courier_status(
        &self,
        courier_id: &str,
    ) -> Result<Option<CourierStatusRecord>, StoreError>;

    async fn upsert_courier_status(&self, record: CourierStatusRecord) -> Result<(), StoreError>;

    async fn set_courier_state(&self, courier_id: &str, state: &str) -> Result<(), StoreError>;

    /// Change feed of every courier status write.
    fn subscribe_courier_status(&self) -> broadcast::Receiver<CourierStatusRecord>;

    /// Stamps the entry with the server time and appends it.
    async fn append_audit(&self, entry: NewAuditEntry) -> Result<AuditEntry, StoreError>;

    /// Entries for one order, newest first.
    async fn audit_trail(
        &self,
        entity_id: &str,
        tenant_id: &str,
    ) -> Result<Vec<AuditEntry>, StoreError>;

    /// Creates the route or overwrites the one with the same id. A published
    /// route is never demoted back to draft.
    async fn save_route(&self, route: &Route) -> Result<(), StoreError>;

    async fn route(&self, route_id: uuid::Uuid) -> Result<Option<Route>, StoreError>;

    /// Routes for a tenant, newest first.
    async fn routes(&self, tenant_id: &str) -> Result<Vec<Route>, StoreError>;
}
