use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::audit::Actor;
use crate::models::courier::GeoPoint;
use crate::models::route::RouteStatus;
use crate::models::stop::TimeWindow;

/// Order record as held by the storage layer. Assignment fields stay empty
/// until a route containing the order is published.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    pub id: String,
    pub tenant_id: String,
    pub customer: String,
    pub address: String,
    pub location: Option<GeoPoint>,
    pub weight_kg: Option<f64>,
    pub volume_m3: Option<f64>,
    pub units: Option<u32>,
    pub zone: Option<String>,
    pub window_start: Option<NaiveTime>,
    pub window_end: Option<NaiveTime>,

    #[serde(default)]
    pub assigned_courier_id: Option<String>,
    #[serde(default)]
    pub assigned_courier_name: Option<String>,
    #[serde(default)]
    pub route_id: Option<Uuid>,
    #[serde(default)]
    pub route_title: Option<String>,
    #[serde(default)]
    pub route_date: Option<NaiveDate>,
    #[serde(default)]
    pub route_status: Option<RouteStatus>,
    #[serde(default)]
    pub route_sequence: Option<usize>,
    #[serde(default)]
    pub route_sequence_total: Option<usize>,
    #[serde(default)]
    pub assignment_summary: Option<AssignmentSummary>,
    #[serde(default)]
    pub assigned_by: Option<Actor>,
    #[serde(default)]
    pub assigned_at: Option<DateTime<Utc>>,
}

impl Order {
    pub fn new(id: impl Into<String>, tenant_id: impl Into<String>, customer: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tenant_id: tenant_id.into(),
            customer: customer.into(),
            address: String::new(),
            location: None,
            weight_kg: None,
            volume_m3: None,
            units: None,
            zone: None,
            window_start: None,
            window_end: None,
            assigned_courier_id: None,
            assigned_courier_name: None,
            route_id: None,
            route_title: None,
            route_date: None,
            route_status: None,
            route_sequence: None,
            route_sequence_total: None,
            assignment_summary: None,
            assigned_by: None,
            assigned_at: None,
        }
    }

    pub fn window(&self) -> TimeWindow {
        TimeWindow {
            start: self.window_start,
            end: self.window_end,
        }
    }

    /// Overwrites the fixed assignment field set with `patch`.
    pub fn apply(&mut self, patch: &AssignmentPatch) {
        self.assigned_courier_id = patch.courier_id.clone();
        self.assigned_courier_name = patch.courier_name.clone();
        self.route_id = Some(patch.route_id);
        self.route_title = Some(patch.route_title.clone());
        self.route_date = patch.route_date;
        self.route_status = Some(patch.route_status);
        self.route_sequence = Some(patch.sequence);
        self.route_sequence_total = Some(patch.sequence_total);
        self.window_start = patch.window.start;
        self.window_end = patch.window.end;
        self.assignment_summary = Some(patch.summary.clone());
        self.assigned_by = Some(patch.assigned_by.clone());
        self.assigned_at = Some(patch.assigned_at);
    }
}

/// Display block shown on the courier's task list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AssignmentSummary {
    pub label: String,
    pub customer: String,
    pub address: String,
    pub eta: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AssignmentPatch {
    pub courier_id: Option<String>,
    pub courier_name: Option<String>,
    pub sequence: usize,
    pub sequence_total: usize,
    pub route_id: Uuid,
    pub route_title: String,
    pub route_date: Option<NaiveDate>,
    pub route_status: RouteStatus,
    pub window: TimeWindow,
    pub summary: AssignmentSummary,
    pub assigned_by: Actor,
    pub assigned_at: DateTime<Utc>,
}
