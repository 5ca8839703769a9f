use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::audit::Actor;
use crate::models::stop::Stop;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RouteStatus {
    Draft,
    Published,
}

impl RouteStatus {
    /// Routes only move forward: draft to published.
    pub fn can_become(self, next: RouteStatus) -> bool {
        !(self == RouteStatus::Published && next == RouteStatus::Draft)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RouteStatus::Draft => "draft",
            RouteStatus::Published => "published",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ServiceType {
    #[default]
    SameDay,
    NextDay,
    Scheduled,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RequiredCourierState {
    #[default]
    Any,
    Available,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct VehicleCapacity {
    pub kg: Option<f64>,
    pub m3: Option<f64>,
    pub units: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct VehicleEquipment {
    #[serde(default)]
    pub refrigerated: bool,
    #[serde(default)]
    pub lift_gate: bool,
    #[serde(default)]
    pub hand_truck: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Vehicle {
    pub name: String,
    #[serde(default)]
    pub capacity: VehicleCapacity,
    #[serde(default)]
    pub constraints: Vec<String>,
    #[serde(default)]
    pub equipment: VehicleEquipment,
}

/// Everything about a route except its stops.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct RouteHeader {
    pub name: String,
    pub date: Option<NaiveDate>,
    pub window_start: Option<NaiveTime>,
    pub window_end: Option<NaiveTime>,
    pub zone: Option<String>,
    #[serde(default)]
    pub service_type: ServiceType,
    pub sla_minutes: Option<u32>,
    pub notes: Option<String>,
    #[serde(default)]
    pub vehicle: Vehicle,
    pub courier_id: Option<String>,
    pub courier_name: Option<String>,
    #[serde(default)]
    pub required_courier_state: RequiredCourierState,
    pub max_stops: Option<usize>,
}

/// Planning figures captured when the route is saved.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct KpiSnapshot {
    pub stop_count: usize,
    pub total_kg: f64,
    pub total_m3: f64,
    pub total_units: f64,
    pub utilization_kg: Option<f64>,
    pub utilization_m3: Option<f64>,
    pub utilization_units: Option<f64>,
    pub distance_km: f64,
    pub transit_minutes: f64,
    pub service_minutes: f64,
    pub total_minutes: f64,
    pub stops_per_hour: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Route {
    pub id: Uuid,
    pub tenant_id: String,
    #[serde(flatten)]
    pub header: RouteHeader,
    pub status: RouteStatus,
    pub kpis: KpiSnapshot,
    pub stops: Vec<Stop>,
    pub created_by: Actor,
    pub created_at: DateTime<Utc>,
    pub published_at: Option<DateTime<Utc>>,
}
