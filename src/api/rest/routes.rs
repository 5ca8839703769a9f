use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::Json;
use axum::Router;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::rest::orders::TenantQuery;
use crate::engine::draft::{DraftRoute, PlanSummary, PublishChecks};
use crate::engine::publish::{PublishReport, PublishRequest};
use crate::engine::stops::Direction;
use crate::engine::validation::ValidationReport;
use crate::error::AppError;
use crate::models::audit::Actor;
use crate::models::route::{Route, RouteStatus};
use crate::models::stop::StopPatch;
use crate::state::{AppState, DispatchEvent};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/routes", post(save_route).get(list_routes))
        .route("/routes/preview", post(preview_route))
        .route("/routes/draft/edit", post(edit_draft))
}

#[derive(Deserialize)]
pub struct PreviewRequest {
    pub tenant_id: String,
    pub draft: DraftRoute,
}

#[derive(Serialize)]
pub struct PreviewResponse {
    pub summary: PlanSummary,
    pub validation: ValidationReport,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DraftEdit {
    Add { order_id: String },
    Remove { index: usize },
    Move { index: usize, direction: Direction },
    Update { index: usize, patch: StopPatch },
}

#[derive(Deserialize)]
pub struct EditRequest {
    pub tenant_id: String,
    pub draft: DraftRoute,
    pub edit: DraftEdit,
}

#[derive(Serialize)]
pub struct EditResponse {
    pub draft: DraftRoute,
    pub summary: PlanSummary,
}

#[derive(Deserialize)]
pub struct SaveRouteRequest {
    pub tenant_id: String,
    pub actor: Actor,
    pub status: RouteStatus,
    pub draft: DraftRoute,
}

async fn preview_route(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<PreviewRequest>,
) -> Json<PreviewResponse> {
    let settings = state.publisher.settings();
    let draft = payload.draft;
    let summary = draft.summary(settings);

    let checks = PublishChecks::gather(&state.store, &payload.tenant_id, &draft).await;
    let validation = draft.validate(Some(&payload.tenant_id), &summary, settings, &checks);

    Json(PreviewResponse {
        summary,
        validation,
    })
}

async fn edit_draft(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<EditRequest>,
) -> Result<Json<EditResponse>, AppError> {
    let mut draft = payload.draft;

    match payload.edit {
        DraftEdit::Add { order_id } => {
            let order = state
                .store
                .order(&order_id)
                .await?
                .filter(|order| order.tenant_id == payload.tenant_id)
                .ok_or_else(|| AppError::NotFound(format!("order {} not found", order_id)))?;
            draft.stops.add_stop(&order)?;
        }
        DraftEdit::Remove { index } => {
            draft.stops.remove_stop(index)?;
        }
        DraftEdit::Move { index, direction } => {
            draft.stops.move_stop(index, direction);
        }
        DraftEdit::Update { index, patch } => {
            draft.stops.update_stop(index, patch)?;
        }
    }

    let summary = draft.summary(state.publisher.settings());
    Ok(Json(EditResponse { draft, summary }))
}

async fn save_route(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SaveRouteRequest>,
) -> Result<(StatusCode, Json<PublishReport>), AppError> {
    let request = PublishRequest {
        tenant_id: payload.tenant_id,
        actor: payload.actor,
        status: payload.status,
    };
    let report = state.publisher.publish(&payload.draft, &request).await?;

    let failed = report.failed().count();
    let _ = state.dispatch_events_tx.send(DispatchEvent {
        route_id: report.route.id,
        tenant_id: report.route.tenant_id.clone(),
        status: report.route.status,
        completed: report.completed(),
        failed,
    });

    let status = if report.is_complete() {
        StatusCode::OK
    } else {
        info!(route_id = %report.route.id, failed, "route published with failures");
        StatusCode::MULTI_STATUS
    };

    Ok((status, Json(report)))
}

async fn list_routes(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TenantQuery>,
) -> Result<Json<Vec<Route>>, AppError> {
    let routes = state.store.routes(&query.tenant_id).await?;
    Ok(Json(routes))
}
