//! Best-effort audit recording for mutating API calls.

use serde_json::Value;
use supplychainx_models::{AuditAction, AuditEntry, User};

use crate::AppState;

/// Appends an entry on behalf of `actor`. A failed write is logged and
/// swallowed, so auditing never fails the request it describes.
pub async fn record(
    state: &AppState,
    actor: &User,
    action: AuditAction,
    entity_type: &str,
    entity_id: Option<i64>,
    details: Value,
) {
    let entry = AuditEntry::new(action, entity_type, entity_id, Some(actor.email.clone()), details);
    record_entry(state, entry).await;
}

pub async fn record_entry(state: &AppState, entry: AuditEntry) {
    let action = entry.action;
    let entity_type = entry.entity_type.clone();

    if let Err(e) = state.repos.audit.record(entry).await {
        tracing::warn!(
            action = %action,
            entity_type = %entity_type,
            error = %e,
            "Failed to record audit entry"
        );
    }
}
