use chrono::{Duration, NaiveDateTime};
use serde::Serialize;

use crate::geo::leg_km;
use crate::models::stop::Stop;

pub const DEFAULT_SPEED_KMH: f64 = 30.0;

/// Arrival estimate for one stop, relative to the route start.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StopEta {
    pub order_id: String,
    pub sequence: usize,
    pub leg_km: f64,
    pub arrival_offset_minutes: f64,
    pub eta: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Default)]
pub struct EtaPlan {
    pub stops: Vec<StopEta>,
    pub distance_km: f64,
    pub transit_minutes: f64,
    pub service_minutes: f64,
    pub total_minutes: f64,
    pub stops_per_hour: Option<f64>,
}

/// Straight-line planning estimate at a constant average speed.
#[derive(Debug, Clone, Copy)]
pub struct EtaEstimator {
    km_per_minute: f64,
}

impl Default for EtaEstimator {
    fn default() -> Self {
        Self::from_kmh(DEFAULT_SPEED_KMH)
    }
}

impl EtaEstimator {
    pub fn from_kmh(speed_kmh: f64) -> Self {
        let speed_kmh = if speed_kmh.is_finite() && speed_kmh > 0.0 {
            speed_kmh
        } else {
            DEFAULT_SPEED_KMH
        };
        Self {
            km_per_minute: speed_kmh / 60.0,
        }
    }

    pub fn km_per_minute(&self) -> f64 {
        self.km_per_minute
    }

    /// Walks the stops in order. Each stop is reached after the travel leg
    /// from its predecessor and left after its own dwell time. Clock ETAs are
    /// filled in only when `start` is known.
    pub fn estimate(&self, stops: &[Stop], start: Option<NaiveDateTime>) -> EtaPlan {
        let mut cursor = 0.0_f64;
        let mut distance_km = 0.0;
        let mut transit_minutes = 0.0;
        let mut service_minutes = 0.0;
        let mut etas = Vec::with_capacity(stops.len());

        for (index, stop) in stops.iter().enumerate() {
            let leg = match index {
                0 => 0.0,
                _ => leg_km(stops[index - 1].location.as_ref(), stop.location.as_ref()),
            };
            let travel = leg / self.km_per_minute;
            cursor += travel;
            distance_km += leg;
            transit_minutes += travel;

            etas.push(StopEta {
                order_id: stop.order_id.clone(),
                sequence: stop.sequence,
                leg_km: leg,
                arrival_offset_minutes: cursor,
                eta: start.map(|start| start + offset(cursor)),
            });

            let dwell = f64::from(stop.service_minutes);
            cursor += dwell;
            service_minutes += dwell;
        }

        let total_minutes = transit_minutes + service_minutes;
        let stops_per_hour = if total_minutes > 0.0 {
            Some(stops.len() as f64 / (total_minutes / 60.0))
        } else {
            None
        };

        EtaPlan {
            stops: etas,
            distance_km,
            transit_minutes,
            service_minutes,
            total_minutes,
            stops_per_hour,
        }
    }
}

fn offset(minutes: f64) -> Duration {
    Duration::seconds((minutes * 60.0).round() as i64)
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

    use super::EtaEstimator;
    use crate::geo::distance_km;
    use crate::models::courier::GeoPoint;
    use crate::models::order::Order;
    use crate::models::stop::Stop;

    fn stop(id: &str, lat: f64, lng: f64, dwell: u32) -> Stop {
        let mut stop = Stop::from_order(&Order::new(id, "t", "c"), 0);
        stop.location = Some(GeoPoint { lat, lng });
        stop.service_minutes = dwell;
        stop
    }

    fn nine_am() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 2)
            .unwrap()
            .and_time(NaiveTime::from_hms_opt(9, 0, 0).unwrap())
    }

    #[test]
    fn first_stop_is_reached_at_window_start() {
        let stops = vec![stop("A", -33.44, -70.66, 10)];
        let plan = EtaEstimator::default().estimate(&stops, Some(nine_am()));

        assert_eq!(plan.stops[0].eta, Some(nine_am()));
        assert_eq!(plan.stops[0].arrival_offset_minutes, 0.0);
        assert_eq!(plan.total_minutes, 10.0);
        assert_eq!(plan.stops_per_hour, Some(6.0));
    }

    #[test]
    fn eta_adds_travel_then_previous_dwell() {
        let stops = vec![
            stop("A", -33.44, -70.66, 10),
            stop("B", -33.45, -70.60, 15),
        ];
        let estimator = EtaEstimator::default();
        let plan = estimator.estimate(&stops, Some(nine_am()));

        let leg = distance_km(
            stops[0].location.as_ref().unwrap(),
            stops[1].location.as_ref().unwrap(),
        );
        let expected = 10.0 + leg / 0.5;
        assert!((estimator.km_per_minute() - 0.5).abs() < 1e-12);
        assert!((plan.stops[1].arrival_offset_minutes - expected).abs() < 1e-9);
        assert!((plan.transit_minutes - leg / 0.5).abs() < 1e-9);
        assert_eq!(plan.service_minutes, 25.0);
        assert!((plan.distance_km - leg).abs() < 1e-9);
    }

    #[test]
    fn etas_never_decrease_along_the_route() {
        let stops = vec![
            stop("A", -33.40, -70.60, 5),
            stop("B", -33.50, -70.70, 0),
            stop("C", -33.50, -70.70, 0),
            stop("D", -33.30, -70.50, 20),
            stop("E", f64::NAN, -70.50, 10),
        ];
        let plan = EtaEstimator::from_kmh(25.0).estimate(&stops, Some(nine_am()));

        for pair in plan.stops.windows(2) {
            assert!(pair[1].arrival_offset_minutes >= pair[0].arrival_offset_minutes);
            assert!(pair[1].eta >= pair[0].eta);
        }
    }

    #[test]
    fn unresolved_locations_add_no_travel() {
        let mut unresolved = stop("B", 0.0, 0.0, 10);
        unresolved.location = None;
        let stops = vec![stop("A", -33.44, -70.66, 10), unresolved];
        let plan = EtaEstimator::default().estimate(&stops, None);

        assert_eq!(plan.stops[1].leg_km, 0.0);
        assert_eq!(plan.stops[1].arrival_offset_minutes, 10.0);
        assert_eq!(plan.stops[1].eta, None);
    }

    #[test]
    fn throughput_is_undefined_for_zero_minutes() {
        let plan = EtaEstimator::default().estimate(&[], Some(nine_am()));
        assert_eq!(plan.stops_per_hour, None);

        let instant = vec![stop("A", 1.0, 1.0, 0)];
        let plan = EtaEstimator::default().estimate(&instant, Some(nine_am()));
        assert_eq!(plan.stops_per_hour, None);
    }

    #[test]
    fn invalid_speed_falls_back_to_default() {
        assert_eq!(EtaEstimator::from_kmh(0.0).km_per_minute(), 0.5);
        assert_eq!(EtaEstimator::from_kmh(f64::NAN).km_per_minute(), 0.5);
    }
}
