use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::engine::audit::{diff_records, log_change, ChangeRecord};
use crate::engine::draft::{DraftRoute, PlanSummary, PlanningSettings, PublishChecks};
use crate::error::{PublishError, StoreError};
use crate::models::audit::Actor;
use crate::models::courier::STATE_READY_FOR_ROUTE;
use crate::models::order::{AssignmentPatch, AssignmentSummary};
use crate::models::route::{Route, RouteStatus};
use crate::models::stop::Stop;
use crate::observability::metrics::Metrics;
use crate::store::DispatchStore;

const PUBLISH_REASON: &str = "route published";

/// Who is saving the draft, for which tenant, and in which status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishRequest {
    pub tenant_id: String,
    pub actor: Actor,
    pub status: RouteStatus,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepOutcome {
    /// Order patched. `audit_id` is empty when nothing tracked changed.
    Assigned { audit_id: Option<Uuid> },
    WriteFailed { error: String },
    /// Order patched but the audit append failed.
    AuditFailed { error: String },
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StopStep {
    pub index: usize,
    pub order_id: String,
    pub outcome: StepOutcome,
}

impl StopStep {
    pub fn written(&self) -> bool {
        !matches!(self.outcome, StepOutcome::WriteFailed { .. })
    }

    pub fn succeeded(&self) -> bool {
        matches!(self.outcome, StepOutcome::Assigned { .. })
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CourierUpdate {
    NotAssigned,
    Skipped,
    MarkedReady,
    Failed { error: String },
}

/// Result of a save or publish. Stop steps are independent: a failed step
/// does not undo earlier ones.
#[derive(Debug, Clone, Serialize)]
pub struct PublishReport {
    pub route: Route,
    pub steps: Vec<StopStep>,
    pub courier: CourierUpdate,
}

impl PublishReport {
    /// Stops whose order now carries the assignment.
    pub fn completed(&self) -> usize {
        self.steps.iter().filter(|step| step.written()).count()
    }

    pub fn failed(&self) -> impl Iterator<Item = &StopStep> {
        self.steps.iter().filter(|step| !step.succeeded())
    }

    pub fn is_complete(&self) -> bool {
        self.failed().next().is_none() && !matches!(self.courier, CourierUpdate::Failed { .. })
    }
}

pub struct DispatchPublisher {
    store: Arc<dyn DispatchStore>,
    settings: PlanningSettings,
    metrics: Metrics,
}

impl DispatchPublisher {
    pub fn new(store: Arc<dyn DispatchStore>, settings: PlanningSettings, metrics: Metrics) -> Self {
        Self {
            store,
            settings,
            metrics,
        }
    }

    pub fn settings(&self) -> &PlanningSettings {
        &self.settings
    }

    /// Saves `draft` and, when publishing, assigns every stop's order to the
    /// route's courier in sequence order, auditing each change.
    pub async fn publish(
        &self,
        draft: &DraftRoute,
        request: &PublishRequest,
    ) -> Result<PublishReport, PublishError> {
        let started = Instant::now();
        let result = self.run(draft, request).await;

        let outcome = match &result {
            Ok(report) if report.is_complete() => "success",
            Ok(_) => "partial",
            Err(_) => "error",
        };
        self.metrics
            .publish_latency_seconds
            .with_label_values(&[outcome])
            .observe(started.elapsed().as_secs_f64());
        self.metrics
            .routes_saved_total
            .with_label_values(&[request.status.as_str(), outcome])
            .inc();

        result
    }

    async fn run(
        &self,
        draft: &DraftRoute,
        request: &PublishRequest,
    ) -> Result<PublishReport, PublishError> {
        let summary = draft.summary(&self.settings);
        let route_id = draft.id.unwrap_or_else(Uuid::new_v4);

        let existing = self.store.route(route_id).await?;
        if let Some(existing) = &existing {
            if existing.tenant_id != request.tenant_id {
                warn!(
                    route_id = %route_id,
                    tenant_id = %request.tenant_id,
                    "route belongs to another tenant"
                );
                return Err(StoreError::NotFound(format!("route {route_id} not found")).into());
            }
            if !existing.status.can_become(request.status) {
                return Err(PublishError::AlreadyPublished(route_id));
            }
        }

        if request.status == RouteStatus::Published {
            let checks = PublishChecks::gather(&self.store, &request.tenant_id, draft).await;
            let report =
                draft.validate(Some(&request.tenant_id), &summary, &self.settings, &checks);
            if !report.is_ok() {
                for issue in &report.issues {
                    self.metrics
                        .validation_failures_total
                        .with_label_values(&[issue.kind()])
                        .inc();
                }
                warn!(
                    route_id = %route_id,
                    issues = report.issues.len(),
                    "publish refused by validation"
                );
                return Err(PublishError::Validation(report.reasons()));
            }
        }

        let now = Utc::now();
        let route = Route {
            id: route_id,
            tenant_id: request.tenant_id.clone(),
            header: draft.header.clone(),
            status: request.status,
            kpis: summary.kpis.clone(),
            stops: draft.stops.as_slice().to_vec(),
            created_by: existing
                .as_ref()
                .map(|r| r.created_by.clone())
                .unwrap_or_else(|| request.actor.clone()),
            created_at: existing.as_ref().map(|r| r.created_at).unwrap_or(now),
            published_at: match request.status {
                RouteStatus::Published => Some(now),
                RouteStatus::Draft => None,
            },
        };

        self.store.save_route(&route).await?;
        info!(
            route_id = %route.id,
            status = route.status.as_str(),
            stops = route.stops.len(),
            "route saved"
        );

        if route.status == RouteStatus::Draft {
            return Ok(PublishReport {
                route,
                steps: Vec::new(),
                courier: CourierUpdate::Skipped,
            });
        }

        let total = route.stops.len();
        let mut steps = Vec::with_capacity(total);
        for (index, stop) in route.stops.iter().enumerate() {
            let outcome = self
                .assign_stop(&route, stop, index, total, &summary, &request.actor)
                .await;
            let label = match &outcome {
                StepOutcome::Assigned { .. } => "assigned",
                StepOutcome::WriteFailed { .. } => "write_failed",
                StepOutcome::AuditFailed { .. } => "audit_failed",
            };
            self.metrics
                .stop_writes_total
                .with_label_values(&[label])
                .inc();
            steps.push(StopStep {
                index,
                order_id: stop.order_id.clone(),
                outcome,
            });
        }

        let courier = self.mark_courier_ready(&route).await;

        let report = PublishReport {
            route,
            steps,
            courier,
        };
        info!(
            route_id = %report.route.id,
            completed = report.completed(),
            total,
            "route published"
        );
        Ok(report)
    }

    async fn assign_stop(
        &self,
        route: &Route,
        stop: &Stop,
        index: usize,
        total: usize,
        summary: &PlanSummary,
        actor: &Actor,
    ) -> StepOutcome {
        let before = match self.store.order(&stop.order_id).await {
            Ok(Some(order)) if order.tenant_id == route.tenant_id => order,
            Ok(Some(_)) => {
                warn!(
                    order_id = %stop.order_id,
                    tenant_id = %route.tenant_id,
                    "order belongs to another tenant"
                );
                return StepOutcome::WriteFailed {
                    error: format!("order {} not found", stop.order_id),
                };
            }
            Ok(None) => {
                warn!(order_id = %stop.order_id, "order missing; stop not assigned");
                return StepOutcome::WriteFailed {
                    error: format!("order {} not found", stop.order_id),
                };
            }
            Err(err) => {
                warn!(order_id = %stop.order_id, error = %err, "order read failed");
                return StepOutcome::WriteFailed {
                    error: err.to_string(),
                };
            }
        };

        let eta = summary
            .eta
            .stops
            .get(index)
            .and_then(|s| s.eta)
            .map(|eta| eta.format("%H:%M").to_string());

        let patch = AssignmentPatch {
            courier_id: route.header.courier_id.clone(),
            courier_name: route.header.courier_name.clone(),
            sequence: index + 1,
            sequence_total: total,
            route_id: route.id,
            route_title: route.header.name.clone(),
            route_date: route.header.date,
            route_status: route.status,
            window: stop.window,
            summary: AssignmentSummary {
                label: format!("{}/{}", index + 1, total),
                customer: stop.customer.clone(),
                address: stop.address.clone(),
                eta,
            },
            assigned_by: actor.clone(),
            assigned_at: Utc::now(),
        };

        if let Err(err) = self.store.write_assignment(&stop.order_id, &patch).await {
            warn!(order_id = %stop.order_id, error = %err, "assignment write failed");
            return StepOutcome::WriteFailed {
                error: err.to_string(),
            };
        }

        let mut after = before.clone();
        after.apply(&patch);
        let changes = diff_records(&before, &after);
        let record = ChangeRecord {
            entity_id: &stop.order_id,
            tenant_id: &route.tenant_id,
            actor,
            reason: PUBLISH_REASON,
            metadata: json!({
                "route_id": route.id,
                "sequence": index + 1,
                "sequence_total": total,
            }),
        };

        match log_change(self.store.as_ref(), record, changes).await {
            Ok(entry) => {
                if entry.is_some() {
                    self.metrics.audit_entries_total.inc();
                }
                StepOutcome::Assigned {
                    audit_id: entry.map(|e| e.id),
                }
            }
            Err(err) => {
                warn!(order_id = %stop.order_id, error = %err, "audit append failed");
                StepOutcome::AuditFailed {
                    error: err.to_string(),
                }
            }
        }
    }

    async fn mark_courier_ready(&self, route: &Route) -> CourierUpdate {
        let Some(courier_id) = route
            .header
            .courier_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
        else {
            return CourierUpdate::NotAssigned;
        };

        match self
            .store
            .set_courier_state(courier_id, STATE_READY_FOR_ROUTE)
            .await
        {
            Ok(()) => CourierUpdate::MarkedReady,
            Err(err) => {
                warn!(courier_id, error = %err, "failed to mark courier ready");
                CourierUpdate::Failed {
                    error: err.to_string(),
                }
            }
        }
    }
}
