use std::sync::Arc;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::engine::availability::{read_availability, CourierAvailability};
use crate::engine::capacity::CapacityReport;
use crate::engine::eta::{EtaEstimator, EtaPlan};
use crate::engine::roster::{eligible_couriers, Roster};
use crate::engine::stops::StopList;
use crate::engine::validation::{validate, ValidationInput, ValidationReport};
use crate::models::courier::CourierProfile;
use crate::models::route::{KpiSnapshot, RouteHeader};
use crate::models::stop::Stop;
use crate::store::DispatchStore;

/// Engine-wide planning knobs.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlanningSettings {
    pub eta: EtaEstimator,
    pub default_max_stops: Option<usize>,
}

/// A route being assembled. Held by whoever is editing it and only persisted
/// through an explicit save or publish.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DraftRoute {
    /// Set once the draft has been saved, so later saves overwrite it.
    #[serde(default)]
    pub id: Option<Uuid>,
    pub header: RouteHeader,
    #[serde(default)]
    pub stops: StopList,
}

/// Figures derived from a draft. Never stored on the draft itself.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PlanSummary {
    pub capacity: CapacityReport,
    pub eta: EtaPlan,
    pub kpis: KpiSnapshot,
}

/// Live facts a draft is checked against before it may be published.
#[derive(Debug, Clone)]
pub struct PublishChecks {
    pub eligible_couriers: Roster<CourierProfile>,
    pub courier_state: CourierAvailability,
    pub unknown_orders: Vec<String>,
}

impl PublishChecks {
    pub async fn gather(
        store: &Arc<dyn DispatchStore>,
        tenant_id: &str,
        draft: &DraftRoute,
    ) -> Self {
        let eligible_couriers = eligible_couriers(store.as_ref(), tenant_id).await;
        let courier_state =
            read_availability(store.clone(), tenant_id, draft.header.courier_id.as_deref()).await;
        let unknown_orders =
            unknown_orders(store.as_ref(), tenant_id, draft.stops.as_slice()).await;

        Self {
            eligible_couriers,
            courier_state,
            unknown_orders,
        }
    }
}

/// Stops whose order is missing or belongs to another tenant. Read failures
/// count as missing.
async fn unknown_orders(
    store: &dyn DispatchStore,
    tenant_id: &str,
    stops: &[Stop],
) -> Vec<String> {
    let mut unknown = Vec::new();
    for stop in stops {
        match store.order(&stop.order_id).await {
            Ok(Some(order)) if order.tenant_id == tenant_id => {}
            Ok(_) => unknown.push(stop.order_id.clone()),
            Err(err) => {
                warn!(order_id = %stop.order_id, error = %err, "order lookup failed");
                unknown.push(stop.order_id.clone());
            }
        }
    }
    unknown
}

impl DraftRoute {
    pub fn new(header: RouteHeader) -> Self {
        Self {
            id: None,
            header,
            stops: StopList::new(),
        }
    }

    pub fn start_time(&self) -> Option<NaiveDateTime> {
        Some(self.header.date?.and_time(self.header.window_start?))
    }

    pub fn max_stops(&self, settings: &PlanningSettings) -> Option<usize> {
        self.header.max_stops.or(settings.default_max_stops)
    }

    pub fn summary(&self, settings: &PlanningSettings) -> PlanSummary {
        let stops = self.stops.as_slice();
        let capacity = CapacityReport::compute(stops, &self.header.vehicle.capacity);
        let eta = settings.eta.estimate(stops, self.start_time());

        let kpis = KpiSnapshot {
            stop_count: stops.len(),
            total_kg: capacity.weight.total,
            total_m3: capacity.volume.total,
            total_units: capacity.units.total,
            utilization_kg: capacity.weight.utilization,
            utilization_m3: capacity.volume.utilization,
            utilization_units: capacity.units.utilization,
            distance_km: eta.distance_km,
            transit_minutes: eta.transit_minutes,
            service_minutes: eta.service_minutes,
            total_minutes: eta.total_minutes,
            stops_per_hour: eta.stops_per_hour,
        };

        PlanSummary {
            capacity,
            eta,
            kpis,
        }
    }

    pub fn validate(
        &self,
        tenant_id: Option<&str>,
        summary: &PlanSummary,
        settings: &PlanningSettings,
        checks: &PublishChecks,
    ) -> ValidationReport {
        validate(&ValidationInput {
            tenant_id,
            header: &self.header,
            stops: self.stops.as_slice(),
            unknown_orders: &checks.unknown_orders,
            capacity: &summary.capacity,
            max_stops: self.max_stops(settings),
            eligible_couriers: &checks.eligible_couriers,
            courier_state: &checks.courier_state,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveTime};

    use std::sync::Arc;

    use super::{DraftRoute, PlanningSettings, PublishChecks};
    use crate::engine::availability::CourierAvailability;
    use crate::store::{DispatchStore, MemoryStore};
    use crate::engine::stops::Direction;
    use crate::models::courier::GeoPoint;
    use crate::models::order::Order;
    use crate::models::route::{RouteHeader, VehicleCapacity};

    fn order(id: &str, lat: f64, weight: f64) -> Order {
        let mut order = Order::new(id, "t1", format!("customer {id}"));
        order.location = Some(GeoPoint { lat, lng: -70.65 });
        order.weight_kg = Some(weight);
        order
    }

    fn draft() -> DraftRoute {
        let mut header = RouteHeader {
            name: "Norte".to_string(),
            date: NaiveDate::from_ymd_opt(2026, 3, 2),
            window_start: NaiveTime::from_hms_opt(8, 30, 0),
            window_end: NaiveTime::from_hms_opt(13, 0, 0),
            ..RouteHeader::default()
        };
        header.vehicle.capacity = VehicleCapacity {
            kg: Some(50.0),
            ..VehicleCapacity::default()
        };
        DraftRoute::new(header)
    }

    #[test]
    fn summary_tracks_every_edit() {
        let settings = PlanningSettings::default();
        let mut draft = draft();
        draft.stops.add_stop(&order("A", -33.40, 10.0)).unwrap();
        draft.stops.add_stop(&order("B", -33.45, 15.0)).unwrap();

        let first = draft.summary(&settings);
        assert_eq!(first.kpis.stop_count, 2);
        assert_eq!(first.kpis.total_kg, 25.0);
        assert_eq!(first.kpis.utilization_kg, Some(50.0));
        assert_eq!(first.kpis.utilization_m3, None);
        assert_eq!(
            first.eta.stops[0].eta,
            Some(
                NaiveDate::from_ymd_opt(2026, 3, 2)
                    .unwrap()
                    .and_hms_opt(8, 30, 0)
                    .unwrap()
            )
        );

        draft.stops.move_stop(1, Direction::Up);
        draft.stops.remove_stop(1).unwrap();
        let second = draft.summary(&settings);
        assert_eq!(second.kpis.stop_count, 1);
        assert_eq!(second.kpis.total_kg, 15.0);
        assert_eq!(second.eta.stops[0].order_id, "B");
    }

    #[test]
    fn clock_etas_need_date_and_window_start() {
        let settings = PlanningSettings::default();
        let mut draft = draft();
        draft.header.date = None;
        draft.stops.add_stop(&order("A", -33.40, 1.0)).unwrap();

        let summary = draft.summary(&settings);
        assert_eq!(summary.eta.stops[0].eta, None);
        assert_eq!(summary.kpis.total_minutes, 10.0);
    }

    #[test]
    fn header_max_stops_overrides_default() {
        let settings = PlanningSettings {
            default_max_stops: Some(40),
            ..PlanningSettings::default()
        };
        let mut draft = draft();
        assert_eq!(draft.max_stops(&settings), Some(40));
        draft.header.max_stops = Some(3);
        assert_eq!(draft.max_stops(&settings), Some(3));
    }

    #[tokio::test]
    async fn checks_flag_missing_and_foreign_orders() {
        let memory = Arc::new(MemoryStore::new(8));
        memory.upsert_order(order("A", -33.40, 1.0)).await.unwrap();
        let mut foreign = order("B", -33.41, 1.0);
        foreign.tenant_id = "t2".to_string();
        memory.upsert_order(foreign.clone()).await.unwrap();
        let store: Arc<dyn DispatchStore> = memory;

        let mut draft = draft();
        draft.stops.add_stop(&order("A", -33.40, 1.0)).unwrap();
        draft.stops.add_stop(&foreign).unwrap();
        draft.stops.add_stop(&order("C", -33.42, 1.0)).unwrap();

        let checks = PublishChecks::gather(&store, "t1", &draft).await;
        assert_eq!(checks.unknown_orders, vec!["B".to_string(), "C".to_string()]);
        assert_eq!(checks.courier_state, CourierAvailability::Unknown);
        assert!(checks.eligible_couriers.is_empty());
    }
}
