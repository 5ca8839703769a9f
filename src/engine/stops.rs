use serde::{Deserialize, Serialize};

use crate::error::StopError;
use crate::models::order::Order;
use crate::models::stop::{Stop, StopPatch};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
}

/// Ordered stops of a draft route. Order ids are unique and `sequence`
/// always equals the stop's position.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(transparent)]
pub struct StopList {
    stops: Vec<Stop>,
}

impl StopList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a list from stops coming off the wire, dropping repeated order
    /// ids and renumbering.
    pub fn from_stops(stops: Vec<Stop>) -> Self {
        let mut list = Self::new();
        for stop in stops {
            if !list.contains(&stop.order_id) {
                list.stops.push(stop);
            }
        }
        list.resequence();
        list
    }

    pub fn len(&self) -> usize {
        self.stops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }

    pub fn as_slice(&self) -> &[Stop] {
        &self.stops
    }

    pub fn iter(&self) -> impl Iterator<Item = &Stop> {
        self.stops.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Stop> {
        self.stops.get(index)
    }

    pub fn contains(&self, order_id: &str) -> bool {
        self.stops.iter().any(|stop| stop.order_id == order_id)
    }

    pub fn add_stop(&mut self, order: &Order) -> Result<&Stop, StopError> {
        if self.contains(&order.id) {
            return Err(StopError::DuplicateStop(order.id.clone()));
        }

        let sequence = self.stops.len();
        self.stops.push(Stop::from_order(order, sequence));
        Ok(&self.stops[sequence])
    }

    pub fn remove_stop(&mut self, index: usize) -> Result<Stop, StopError> {
        self.check_index(index)?;
        let removed = self.stops.remove(index);
        self.resequence();
        Ok(removed)
    }

    /// Swaps the stop with its neighbour. Returns false, leaving the list
    /// untouched, when the move would fall off either end.
    pub fn move_stop(&mut self, index: usize, direction: Direction) -> bool {
        let target = match direction {
            Direction::Up => index.checked_sub(1),
            Direction::Down => index.checked_add(1),
        };

        match target {
            Some(target) if index < self.stops.len() && target < self.stops.len() => {
                self.stops.swap(index, target);
                self.resequence();
                true
            }
            _ => false,
        }
    }

    pub fn update_stop(&mut self, index: usize, patch: StopPatch) -> Result<&Stop, StopError> {
        self.check_index(index)?;
        if let Some(priority) = patch.priority {
            if !(1..=5).contains(&priority) {
                return Err(StopError::InvalidPriority(priority));
            }
        }

        patch.apply_to(&mut self.stops[index]);
        Ok(&self.stops[index])
    }

    pub fn into_vec(self) -> Vec<Stop> {
        self.stops
    }

    fn check_index(&self, index: usize) -> Result<(), StopError> {
        if index >= self.stops.len() {
            return Err(StopError::IndexOutOfRange {
                index,
                len: self.stops.len(),
            });
        }
        Ok(())
    }

    fn resequence(&mut self) {
        for (position, stop) in self.stops.iter_mut().enumerate() {
            stop.sequence = position;
        }
    }
}

impl<'de> Deserialize<'de> for StopList {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let stops = Vec::<Stop>::deserialize(deserializer)?;
        Ok(Self::from_stops(stops))
    }
}
