use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const STATE_AVAILABLE: &str = "available";
pub const STATE_READY_FOR_ROUTE: &str = "ready_for_route";
pub const STATE_DENIED: &str = "denied";

/// Roles that may be assigned a route.
pub const COURIER_ROLES: [&str; 3] = ["courier", "driver", "messenger"];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lng.is_finite()
    }
}

/// Roster entry for a member of a tenant's fleet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CourierProfile {
    pub id: String,
    pub display_name: String,
    pub role: String,
    pub tenant_id: String,
}

impl CourierProfile {
    pub fn is_courier(&self) -> bool {
        let role = self.role.trim().to_lowercase();
        COURIER_ROLES.contains(&role.as_str())
    }
}

/// Live status reported by the courier's device.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CourierStatusRecord {
    pub courier_id: String,
    pub tenant_id: String,
    pub location: Option<GeoPoint>,
    pub state: String,
    pub last_ping: DateTime<Utc>,
}
