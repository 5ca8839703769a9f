use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::error::StoreError;
use crate::models::audit::{Actor, AuditEntry, FieldChange, NewAuditEntry};
use crate::store::DispatchStore;

/// Order fields whose changes are recorded.
pub const TRACKED_ORDER_FIELDS: [&str; 13] = [
    "customer",
    "address",
    "zone",
    "window_start",
    "window_end",
    "assigned_courier_id",
    "assigned_courier_name",
    "route_id",
    "route_title",
    "route_date",
    "route_status",
    "route_sequence",
    "route_sequence_total",
];

/// Field-level diff of two JSON objects over `fields`. Strings are compared
/// trimmed and a missing field equals `null`.
pub fn diff(before: &Value, after: &Value, fields: &[&str]) -> Vec<FieldChange> {
    fields
        .iter()
        .filter_map(|field| {
            let old = normalize(before.get(*field));
            let new = normalize(after.get(*field));
            (old != new).then(|| FieldChange {
                field: (*field).to_string(),
                before: old,
                after: new,
            })
        })
        .collect()
}

/// Diff of two serializable records over the tracked order fields.
pub fn diff_records<T: Serialize>(before: &T, after: &T) -> Vec<FieldChange> {
    let before = serde_json::to_value(before).unwrap_or(Value::Null);
    let after = serde_json::to_value(after).unwrap_or(Value::Null);
    diff(&before, &after, &TRACKED_ORDER_FIELDS)
}

fn normalize(value: Option<&Value>) -> Value {
    match value {
        None | Some(Value::Null) => Value::Null,
        Some(Value::String(s)) => Value::String(s.trim().to_string()),
        Some(other) => other.clone(),
    }
}

/// What is being logged and why.
#[derive(Debug, Clone)]
pub struct ChangeRecord<'a> {
    pub entity_id: &'a str,
    pub tenant_id: &'a str,
    pub actor: &'a Actor,
    pub reason: &'a str,
    pub metadata: Value,
}

/// Appends one audit entry for `changes`. An empty diff is not logged and
/// yields `Ok(None)`.
pub async fn log_change(
    store: &dyn DispatchStore,
    record: ChangeRecord<'_>,
    changes: Vec<FieldChange>,
) -> Result<Option<AuditEntry>, StoreError> {
    if changes.is_empty() {
        debug!(entity_id = record.entity_id, "no field changes; audit skipped");
        return Ok(None);
    }

    let fields = changes.len();
    let entry = store
        .append_audit(NewAuditEntry {
            entity_id: record.entity_id.to_string(),
            tenant_id: record.tenant_id.to_string(),
            changes,
            actor: record.actor.clone(),
            reason: record.reason.to_string(),
            metadata: record.metadata,
        })
        .await?;

    info!(
        entity_id = %entry.entity_id,
        audit_id = %entry.id,
        fields,
        "audit entry appended"
    );

    Ok(Some(entry))
}
