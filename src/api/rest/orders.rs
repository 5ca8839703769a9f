use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use chrono::NaiveTime;
use serde::Deserialize;

use crate::error::AppError;
use crate::models::audit::AuditEntry;
use crate::models::courier::GeoPoint;
use crate::models::order::Order;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/orders", post(create_order))
        .route("/orders/:id", get(get_order))
        .route("/orders/:id/audit", get(order_audit_trail))
}

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    pub id: String,
    pub tenant_id: String,
    pub customer: String,
    #[serde(default)]
    pub address: String,
    pub location: Option<GeoPoint>,
    pub weight_kg: Option<f64>,
    pub volume_m3: Option<f64>,
    pub units: Option<u32>,
    pub zone: Option<String>,
    pub window_start: Option<NaiveTime>,
    pub window_end: Option<NaiveTime>,
}

#[derive(Deserialize)]
pub struct TenantQuery {
    pub tenant_id: String,
}

async fn create_order(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<Json<Order>, AppError> {
    if payload.id.trim().is_empty() {
        return Err(AppError::BadRequest("id cannot be empty".to_string()));
    }
    if payload.tenant_id.trim().is_empty() {
        return Err(AppError::BadRequest("tenant_id cannot be empty".to_string()));
    }

    let mut order = Order::new(payload.id, payload.tenant_id, payload.customer);
    order.address = payload.address;
    order.location = payload.location;
    order.weight_kg = payload.weight_kg;
    order.volume_m3 = payload.volume_m3;
    order.units = payload.units;
    order.zone = payload.zone;
    order.window_start = payload.window_start;
    order.window_end = payload.window_end;

    state.store.upsert_order(order.clone()).await?;
    Ok(Json(order))
}

async fn get_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Order>, AppError> {
    let order = state
        .store
        .order(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("order {} not found", id)))?;

    Ok(Json(order))
}

async fn order_audit_trail(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<TenantQuery>,
) -> Result<Json<Vec<AuditEntry>>, AppError> {
    let trail = state.store.audit_trail(&id, &query.tenant_id).await?;
    Ok(Json(trail))
}
