use std::fmt;

use serde::{Serialize, Serializer};

use crate::engine::availability::CourierAvailability;
use crate::engine::capacity::{CapacityReport, Dimension};
use crate::engine::roster::Roster;
use crate::models::courier::CourierProfile;
use crate::models::route::{RequiredCourierState, RouteHeader};
use crate::models::stop::Stop;

#[derive(Debug, Clone, PartialEq)]
pub enum ValidationIssue {
    MissingTenant,
    MissingName,
    MissingDate,
    MissingWindow,
    InvertedWindow,
    NoCourier,
    CourierNotEligible(String),
    NoStops,
    TooManyStops { count: usize, max: usize },
    OverCapacity { dimension: Dimension, total: f64, limit: f64 },
    MissingCoordinates(String),
    UnknownOrder(String),
    InvertedStopWindow(String),
    StopOutsideWindow(String),
    CourierUnavailable(CourierAvailability),
}

impl ValidationIssue {
    /// Stable label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ValidationIssue::MissingTenant => "missing_tenant",
            ValidationIssue::MissingName => "missing_name",
            ValidationIssue::MissingDate => "missing_date",
            ValidationIssue::MissingWindow => "missing_window",
            ValidationIssue::InvertedWindow => "inverted_window",
            ValidationIssue::NoCourier => "no_courier",
            ValidationIssue::CourierNotEligible(_) => "courier_not_eligible",
            ValidationIssue::NoStops => "no_stops",
            ValidationIssue::TooManyStops { .. } => "too_many_stops",
            ValidationIssue::OverCapacity { .. } => "over_capacity",
            ValidationIssue::MissingCoordinates(_) => "missing_coordinates",
            ValidationIssue::UnknownOrder(_) => "unknown_order",
            ValidationIssue::InvertedStopWindow(_) => "inverted_stop_window",
            ValidationIssue::StopOutsideWindow(_) => "stop_outside_window",
            ValidationIssue::CourierUnavailable(_) => "courier_unavailable",
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::MissingTenant => write!(f, "tenant is missing"),
            ValidationIssue::MissingName => write!(f, "route name is missing"),
            ValidationIssue::MissingDate => write!(f, "route date is missing"),
            ValidationIssue::MissingWindow => write!(f, "route window start and end are required"),
            ValidationIssue::InvertedWindow => write!(f, "route window must start before it ends"),
            ValidationIssue::NoCourier => write!(f, "no courier selected"),
            ValidationIssue::CourierNotEligible(id) => {
                write!(f, "courier {id} is not an eligible courier for this tenant")
            }
            ValidationIssue::NoStops => write!(f, "route has no stops"),
            ValidationIssue::TooManyStops { count, max } => {
                write!(f, "route has {count} stops, maximum is {max}")
            }
            ValidationIssue::OverCapacity {
                dimension,
                total,
                limit,
            } => write!(
                f,
                "load exceeds vehicle capacity: {total:.2} {unit} > {limit:.2} {unit}",
                unit = dimension.unit()
            ),
            ValidationIssue::MissingCoordinates(order_id) => {
                write!(f, "stop {order_id} has no resolved coordinates")
            }
            ValidationIssue::UnknownOrder(order_id) => {
                write!(f, "order {order_id} does not exist for this tenant")
            }
            ValidationIssue::InvertedStopWindow(order_id) => {
                write!(f, "stop {order_id} time window must start before it ends")
            }
            ValidationIssue::StopOutsideWindow(order_id) => {
                write!(f, "stop {order_id} time window falls outside the route window")
            }
            ValidationIssue::CourierUnavailable(state) => {
                write!(f, "courier is not available (state: {state})")
            }
        }
    }
}

impl Serialize for ValidationIssue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Default)]
pub struct ValidationReport {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn is_ok(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn reasons(&self) -> Vec<String> {
        self.issues.iter().map(ToString::to_string).collect()
    }
}

/// Everything the publish checklist looks at.
pub struct ValidationInput<'a> {
    pub tenant_id: Option<&'a str>,
    pub header: &'a RouteHeader,
    pub stops: &'a [Stop],
    /// Stops whose order is missing or owned by another tenant.
    pub unknown_orders: &'a [String],
    pub capacity: &'a CapacityReport,
    pub max_stops: Option<usize>,
    pub eligible_couriers: &'a Roster<CourierProfile>,
    pub courier_state: &'a CourierAvailability,
}

/// Runs every publish rule and collects all violations. Publishing is
/// allowed only when the report is empty.
pub fn validate(input: &ValidationInput<'_>) -> ValidationReport {
    let mut issues = Vec::new();
    let header = input.header;

    if input.tenant_id.is_none_or(|t| t.trim().is_empty()) {
        issues.push(ValidationIssue::MissingTenant);
    }
    if header.name.trim().is_empty() {
        issues.push(ValidationIssue::MissingName);
    }
    if header.date.is_none() {
        issues.push(ValidationIssue::MissingDate);
    }

    let window = match (header.window_start, header.window_end) {
        (Some(start), Some(end)) if start < end => Some((start, end)),
        (Some(_), Some(_)) => {
            issues.push(ValidationIssue::InvertedWindow);
            None
        }
        _ => {
            issues.push(ValidationIssue::MissingWindow);
            None
        }
    };

    match header.courier_id.as_deref().map(str::trim) {
        None | Some("") => issues.push(ValidationIssue::NoCourier),
        Some(id) if !input.eligible_couriers.contains(id) => {
            issues.push(ValidationIssue::CourierNotEligible(id.to_string()));
        }
        Some(_) => {}
    }

    if input.stops.is_empty() {
        issues.push(ValidationIssue::NoStops);
    }
    if let Some(max) = input.max_stops {
        if input.stops.len() > max {
            issues.push(ValidationIssue::TooManyStops {
                count: input.stops.len(),
                max,
            });
        }
    }

    for load in input.capacity.overages() {
        if let Some(limit) = load.limit {
            issues.push(ValidationIssue::OverCapacity {
                dimension: load.dimension,
                total: load.total,
                limit,
            });
        }
    }

    for stop in input.stops {
        if !stop.has_location() {
            issues.push(ValidationIssue::MissingCoordinates(stop.order_id.clone()));
        }
    }

    for order_id in input.unknown_orders {
        issues.push(ValidationIssue::UnknownOrder(order_id.clone()));
    }

    for stop in input.stops {
        if stop.window.is_inverted() {
            issues.push(ValidationIssue::InvertedStopWindow(stop.order_id.clone()));
        } else if let Some((start, end)) = window {
            if !stop.window.within(start, end) {
                issues.push(ValidationIssue::StopOutsideWindow(stop.order_id.clone()));
            }
        }
    }

    if header.required_courier_state == RequiredCourierState::Available
        && !input.courier_state.is_available()
    {
        issues.push(ValidationIssue::CourierUnavailable(input.courier_state.clone()));
    }

    ValidationReport { issues }
}
