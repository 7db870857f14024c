use chrono::Utc;
use diesel::prelude::*;
use serde_json::Value;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::models::NewAuditLog;
use crate::schema::audit_logs;

pub const SUCCESS: &str = "Success";
pub const FAILURE: &str = "Failure";

/// Append an audit entry. Best-effort: a failed write is reported to the
/// operational log and swallowed, never propagated to the caller. The
/// primary operation's success is not gated on audit durability.
pub fn record(
    conn: &mut SqliteConnection,
    user_id: Option<&str>,
    action: &str,
    details: Value,
    ip_address: Option<&str>,
    status: &str,
) {
    let id = Uuid::new_v4().to_string();
    let details_json = details.to_string();
    let entry = NewAuditLog {
        id: &id,
        timestamp: Utc::now().naive_utc(),
        user_id,
        action,
        details: Some(&details_json),
        ip_address,
        status,
    };

    if let Err(e) = diesel::insert_into(audit_logs::table)
        .values(&entry)
        .execute(conn)
    {
        log::warn!("audit write failed for action '{}': {}", action, e);
    }
}

/// Convenience wrapper taking the authenticated caller.
pub fn record_for(conn: &mut SqliteConnection, user: &AuthUser, action: &str, details: Value) {
    record(
        conn,
        Some(&user.id),
        action,
        details,
        user.ip.as_deref(),
        SUCCESS,
    );
}
