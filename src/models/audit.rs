use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Actor {
    pub id: String,
    pub name: String,
    pub role: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldChange {
    pub field: String,
    pub before: Value,
    pub after: Value,
}

/// Audit record before the store stamps it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewAuditEntry {
    pub entity_id: String,
    pub tenant_id: String,
    pub changes: Vec<FieldChange>,
    pub actor: Actor,
    pub reason: String,
    pub metadata: Value,
}

/// Immutable, append-only record of a change to an entity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuditEntry {
    pub id: Uuid,
    pub entity_id: String,
    pub tenant_id: String,
    pub changes: Vec<FieldChange>,
    pub actor: Actor,
    pub reason: String,
    pub metadata: Value,
    pub recorded_at: DateTime<Utc>,
}

impl AuditEntry {
    pub fn stamp(entry: NewAuditEntry, recorded_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            entity_id: entry.entity_id,
            tenant_id: entry.tenant_id,
            changes: entry.changes,
            actor: entry.actor,
            reason: entry.reason,
            metadata: entry.metadata,
            recorded_at,
        }
    }
}
