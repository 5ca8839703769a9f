use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::{get, put};
use axum::Json;
use axum::Router;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::api::rest::orders::TenantQuery;
use crate::api::rest::ws::courier_availability_ws;
use crate::engine::availability::{read_availability, CourierAvailability};
use crate::engine::roster::eligible_couriers;
use crate::error::AppError;
use crate::models::courier::{CourierProfile, CourierStatusRecord, GeoPoint};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/couriers", get(list_couriers))
        .route("/couriers/:id", put(upsert_courier))
        .route("/couriers/:id/status", put(report_status))
        .route("/couriers/:id/availability", get(get_availability))
        .route("/couriers/:id/availability/ws", get(courier_availability_ws))
}

#[derive(Deserialize)]
pub struct UpsertCourierRequest {
    pub display_name: String,
    pub role: String,
    pub tenant_id: String,
}

#[derive(Deserialize)]
pub struct StatusReport {
    pub tenant_id: String,
    pub location: Option<GeoPoint>,
    pub state: String,
}

#[derive(Serialize)]
pub struct RosterResponse {
    pub couriers: Vec<CourierProfile>,
    pub failing_feeds: Vec<String>,
}

#[derive(Serialize)]
pub struct AvailabilityResponse {
    pub courier_id: String,
    pub state: CourierAvailability,
    pub available: bool,
}

impl AvailabilityResponse {
    pub fn new(courier_id: String, state: CourierAvailability) -> Self {
        Self {
            courier_id,
            available: state.is_available(),
            state,
        }
    }
}

async fn upsert_courier(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<UpsertCourierRequest>,
) -> Result<Json<CourierProfile>, AppError> {
    if payload.display_name.trim().is_empty() {
        return Err(AppError::BadRequest("display_name cannot be empty".to_string()));
    }

    let profile = CourierProfile {
        id,
        display_name: payload.display_name,
        role: payload.role,
        tenant_id: payload.tenant_id,
    };

    state.store.upsert_courier(profile.clone()).await?;
    Ok(Json(profile))
}

async fn list_couriers(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TenantQuery>,
) -> Json<RosterResponse> {
    let roster = eligible_couriers(state.store.as_ref(), &query.tenant_id).await;

    Json(RosterResponse {
        couriers: roster.values().cloned().collect(),
        failing_feeds: roster.failing_feeds().map(str::to_string).collect(),
    })
}

async fn report_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<StatusReport>,
) -> Result<Json<CourierStatusRecord>, AppError> {
    if payload.state.trim().is_empty() {
        return Err(AppError::BadRequest("state cannot be empty".to_string()));
    }

    let record = CourierStatusRecord {
        courier_id: id,
        tenant_id: payload.tenant_id,
        location: payload.location,
        state: payload.state.trim().to_lowercase(),
        last_ping: Utc::now(),
    };

    state.store.upsert_courier_status(record.clone()).await?;
    Ok(Json(record))
}

async fn get_availability(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<TenantQuery>,
) -> Json<AvailabilityResponse> {
    let availability = read_availability(state.store.clone(), &query.tenant_id, Some(&id)).await;
    Json(AvailabilityResponse::new(id, availability))
}
