use chrono::NaiveDateTime;
use diesel::prelude::*;
use rocket::http::Status;
use rocket::serde::json::{json, Json, Value};
use rocket::{get, post, State};
use serde::Deserialize;

use crate::access::{ADMIN, AUDITOR};
use crate::audit;
use crate::auth::AuthUser;
use crate::db::{get_conn, DbPool};
use crate::error::{ApiError, ApiResult};
use crate::models::AuditLog;
use crate::routes::assets::parse_date;
use crate::schema::audit_logs;

#[derive(Deserialize)]
pub struct CreateAuditLogRequest {
    pub action: String,
    pub details: Option<Value>,
    pub status: Option<String>,
}

#[get("/?<user_id>&<action>&<start_date>&<end_date>")]
pub async fn list_audit_logs(
    user: AuthUser,
    pool: &State<DbPool>,
    user_id: Option<String>,
    action: Option<String>,
    start_date: Option<String>,
    end_date: Option<String>,
) -> ApiResult<Json<Value>> {
    user.require_role(&[ADMIN, AUDITOR])?;

    let start = parse_date(start_date.as_deref())?;
    let end = parse_date(end_date.as_deref())?;

    let mut conn = get_conn(pool)?;

    let mut query = audit_logs::table
        .select(AuditLog::as_select())
        .order(audit_logs::timestamp.desc())
        .into_boxed();
    if let Some(uid) = user_id {
        query = query.filter(audit_logs::user_id.eq(uid));
    }
    if let Some(a) = action {
        query = query.filter(audit_logs::action.eq(a));
    }
    if let (Some(start), Some(end)) = (start, end) {
        let start_ts: NaiveDateTime = start.and_hms_opt(0, 0, 0).unwrap();
        let end_ts: NaiveDateTime = end.and_hms_opt(23, 59, 59).unwrap();
        query = query.filter(audit_logs::timestamp.between(start_ts, end_ts));
    }

    let logs = query.load::<AuditLog>(&mut conn)?;
    Ok(Json(json!({ "logs": logs })))
}

/// Manual audit entry, for external triggers an operator wants on record.
#[post("/", format = "json", data = "<req>")]
pub async fn create_audit_log(
    user: AuthUser,
    pool: &State<DbPool>,
    req: Json<CreateAuditLogRequest>,
) -> ApiResult<(Status, Json<Value>)> {
    user.require_role(&[ADMIN])?;

    if req.action.trim().is_empty() {
        return Err(ApiError::Validation(vec!["action is required".into()]));
    }

    let mut conn = get_conn(pool)?;

    audit::record(
        &mut conn,
        Some(&user.id),
        &req.action,
        req.details.clone().unwrap_or_else(|| json!({})),
        user.ip.as_deref(),
        req.status.as_deref().unwrap_or(audit::SUCCESS),
    );

    log::info!("manual audit entry by {}: {}", user.username, req.action);

    Ok((
        Status::Created,
        Json(json!({ "message": "Audit log created" })),
    ))
}
