use std::collections::{BTreeMap, HashMap};

use tracing::warn;

use crate::models::courier::{CourierProfile, COURIER_ROLES};
use crate::store::DispatchStore;

pub trait Keyed {
    fn key(&self) -> &str;
}

impl Keyed for CourierProfile {
    fn key(&self) -> &str {
        &self.id
    }
}

/// Entities from several live feeds merged by id. The last write for a key
/// wins regardless of which feed delivered it, so replays and out-of-order
/// delivery converge to the same roster.
#[derive(Debug, Clone)]
pub struct Roster<T> {
    entries: BTreeMap<String, T>,
    feed_errors: HashMap<String, String>,
}

impl<T> Default for Roster<T> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
            feed_errors: HashMap::new(),
        }
    }
}

impl<T: Keyed> Roster<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges a snapshot from `feed` and clears any error recorded for it.
    pub fn apply(&mut self, feed: &str, items: impl IntoIterator<Item = T>) {
        for item in items {
            self.entries.insert(item.key().to_string(), item);
        }
        self.feed_errors.remove(feed);
    }

    /// Marks `feed` as failing. Entries it delivered earlier are kept.
    pub fn record_error(&mut self, feed: &str, error: impl Into<String>) {
        self.feed_errors.insert(feed.to_string(), error.into());
    }

    pub fn feed_error(&self, feed: &str) -> Option<&str> {
        self.feed_errors.get(feed).map(String::as_str)
    }

    pub fn failing_feeds(&self) -> impl Iterator<Item = &str> {
        self.feed_errors.keys().map(String::as_str)
    }

    pub fn get(&self, key: &str) -> Option<&T> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.entries.values()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

/// Courier roster for a tenant: one feed per courier-like role, merged.
pub async fn eligible_couriers(store: &dyn DispatchStore, tenant_id: &str) -> Roster<CourierProfile> {
    let mut roster = Roster::new();

    for role in COURIER_ROLES {
        let feed = format!("couriers:{role}");
        match store.couriers_by_role(tenant_id, role).await {
            Ok(couriers) => roster.apply(&feed, couriers),
            Err(err) => {
                warn!(tenant_id, feed = %feed, error = %err, "courier feed unavailable");
                roster.record_error(&feed, err.to_string());
            }
        }
    }

    roster
}
