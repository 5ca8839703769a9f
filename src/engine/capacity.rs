use serde::Serialize;

use crate::models::route::VehicleCapacity;
use crate::models::stop::Stop;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Weight,
    Volume,
    Units,
}

impl Dimension {
    pub fn unit(self) -> &'static str {
        match self {
            Dimension::Weight => "kg",
            Dimension::Volume => "m3",
            Dimension::Units => "units",
        }
    }
}

/// Load on one dimension. `utilization` is a percentage, `None` when the
/// vehicle has no positive limit configured for it.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct DimensionLoad {
    pub dimension: Dimension,
    pub total: f64,
    pub limit: Option<f64>,
    pub utilization: Option<f64>,
}

impl DimensionLoad {
    fn new(dimension: Dimension, total: f64, limit: Option<f64>) -> Self {
        let limit = limit.filter(|l| l.is_finite() && *l > 0.0);
        Self {
            dimension,
            total,
            limit,
            utilization: limit.map(|l| total / l * 100.0),
        }
    }

    pub fn is_over_limit(&self) -> bool {
        self.limit.is_some_and(|limit| self.total > limit)
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct CapacityReport {
    pub weight: DimensionLoad,
    pub volume: DimensionLoad,
    pub units: DimensionLoad,
}

impl CapacityReport {
    pub fn compute(stops: &[Stop], capacity: &VehicleCapacity) -> Self {
        let sum = |value: fn(&Stop) -> f64| -> f64 {
            stops
                .iter()
                .map(value)
                .filter(|v| v.is_finite())
                .sum()
        };

        let weight = sum(|s| s.weight_kg.unwrap_or(0.0));
        let volume = sum(|s| s.volume_m3.unwrap_or(0.0));
        let units = sum(|s| f64::from(s.units.unwrap_or(0)));

        Self {
            weight: DimensionLoad::new(Dimension::Weight, weight, capacity.kg),
            volume: DimensionLoad::new(Dimension::Volume, volume, capacity.m3),
            units: DimensionLoad::new(Dimension::Units, units, capacity.units),
        }
    }

    pub fn dimensions(&self) -> [DimensionLoad; 3] {
        [self.weight, self.volume, self.units]
    }

    pub fn overages(&self) -> impl Iterator<Item = DimensionLoad> {
        self.dimensions().into_iter().filter(DimensionLoad::is_over_limit)
    }
}
