use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::models::courier::GeoPoint;
use crate::models::order::Order;

pub const DEFAULT_PRIORITY: u8 = 3;
pub const DEFAULT_SERVICE_MINUTES: u32 = 10;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum StopKind {
    #[default]
    Delivery,
    PickupAndDelivery,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct TimeWindow {
    pub start: Option<NaiveTime>,
    pub end: Option<NaiveTime>,
}

impl TimeWindow {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    pub fn is_inverted(&self) -> bool {
        matches!((self.start, self.end), (Some(start), Some(end)) if start > end)
    }

    /// True when the window is well formed and every bound set on `self`
    /// lies inside `outer`.
    pub fn within(&self, outer_start: NaiveTime, outer_end: NaiveTime) -> bool {
        let inside = |t: NaiveTime| t >= outer_start && t <= outer_end;
        !self.is_inverted() && self.start.is_none_or(inside) && self.end.is_none_or(inside)
    }
}

/// Delivery evidence filled in by the courier after the visit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ProofOfDelivery {
    pub signature_ref: Option<String>,
    pub photo_ref: Option<String>,
    pub failure_reason: Option<String>,
    pub customer_comment: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Stop {
    pub order_id: String,
    pub customer: String,
    pub address: String,
    pub location: Option<GeoPoint>,
    #[serde(default)]
    pub kind: StopKind,
    pub weight_kg: Option<f64>,
    pub volume_m3: Option<f64>,
    pub units: Option<u32>,
    pub priority: u8,
    #[serde(default)]
    pub window: TimeWindow,
    pub service_minutes: u32,
    pub contact_name: Option<String>,
    pub contact_phone: Option<String>,
    #[serde(default)]
    pub fragile: bool,
    #[serde(default = "default_stackable")]
    pub stackable: bool,
    pub declared_value: Option<f64>,
    pub insured_amount: Option<f64>,
    pub document_ref: Option<String>,
    pub notes: Option<String>,
    pub sequence: usize,
    #[serde(default)]
    pub proof: ProofOfDelivery,
}

fn default_stackable() -> bool {
    true
}

impl Stop {
    /// Planning stop for `order`, with the default priority and dwell time.
    pub fn from_order(order: &Order, sequence: usize) -> Self {
        Self {
            order_id: order.id.clone(),
            customer: order.customer.clone(),
            address: order.address.clone(),
            location: order.location,
            kind: StopKind::Delivery,
            weight_kg: order.weight_kg,
            volume_m3: order.volume_m3,
            units: order.units,
            priority: DEFAULT_PRIORITY,
            window: order.window(),
            service_minutes: DEFAULT_SERVICE_MINUTES,
            contact_name: None,
            contact_phone: None,
            fragile: false,
            stackable: true,
            declared_value: None,
            insured_amount: None,
            document_ref: None,
            notes: None,
            sequence,
            proof: ProofOfDelivery::default(),
        }
    }

    pub fn has_location(&self) -> bool {
        self.location.is_some_and(|p| p.is_finite())
    }
}

/// Partial edit of a stop; `None` fields are left untouched.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StopPatch {
    pub customer: Option<String>,
    pub address: Option<String>,
    pub location: Option<GeoPoint>,
    pub kind: Option<StopKind>,
    pub weight_kg: Option<f64>,
    pub volume_m3: Option<f64>,
    pub units: Option<u32>,
    pub priority: Option<u8>,
    pub window: Option<TimeWindow>,
    pub service_minutes: Option<u32>,
    pub contact_name: Option<String>,
    pub contact_phone: Option<String>,
    pub fragile: Option<bool>,
    pub stackable: Option<bool>,
    pub declared_value: Option<f64>,
    pub insured_amount: Option<f64>,
    pub document_ref: Option<String>,
    pub notes: Option<String>,
    pub proof: Option<ProofOfDelivery>,
}

impl StopPatch {
    pub(crate) fn apply_to(self, stop: &mut Stop) {
        macro_rules! merge {
            ($($field:ident),* $(,)?) => {
                $(if let Some(value) = self.$field {
                    stop.$field = value;
                })*
            };
        }
        macro_rules! merge_optional {
            ($($field:ident),* $(,)?) => {
                $(if let Some(value) = self.$field {
                    stop.$field = Some(value);
                })*
            };
        }

        merge!(
            customer,
            address,
            kind,
            priority,
            window,
            service_minutes,
            fragile,
            stackable,
            proof,
        );
        merge_optional!(
            location,
            weight_kg,
            volume_m3,
            units,
            contact_name,
            contact_phone,
            declared_value,
            insured_amount,
            document_ref,
            notes,
        );
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveTime;

    use super::TimeWindow;

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn open_bounds_fit_any_route_window() {
        assert!(TimeWindow::default().within(hm(9, 0), hm(12, 0)));
        let from_ten = TimeWindow {
            start: Some(hm(10, 0)),
            end: None,
        };
        assert!(from_ten.within(hm(9, 0), hm(12, 0)));
        assert!(TimeWindow::new(hm(9, 0), hm(12, 0)).within(hm(9, 0), hm(12, 0)));
    }

    #[test]
    fn inverted_window_never_fits() {
        let backwards = TimeWindow::new(hm(11, 0), hm(10, 0));
        assert!(backwards.is_inverted());
        assert!(!backwards.within(hm(9, 0), hm(12, 0)));
    }
}
