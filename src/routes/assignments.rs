use chrono::NaiveDate;
use diesel::prelude::*;
use rocket::http::Status;
use rocket::serde::json::{json, Json, Value};
use rocket::{get, patch, post, State};
use serde::Deserialize;

use crate::audit;
use crate::auth::AuthUser;
use crate::db::{get_conn, DbPool};
use crate::error::{ApiError, ApiResult};
use crate::ledger::{self, AssignmentInput};
use crate::models::Assignment;
use crate::schema::assignments;

#[derive(Deserialize)]
pub struct CreateAssignmentRequest {
    pub asset_id: String,
    pub assigned_to_user_id: String,
    pub assignment_date: NaiveDate,
    pub base_of_assignment_id: String,
    pub purpose: String,
    pub expected_return_date: Option<NaiveDate>,
}

#[derive(Deserialize)]
pub struct ReturnAssignmentRequest {
    pub returned_date: NaiveDate,
}

#[post("/", format = "json", data = "<req>")]
pub async fn create_assignment(
    user: AuthUser,
    pool: &State<DbPool>,
    req: Json<CreateAssignmentRequest>,
) -> ApiResult<(Status, Json<Value>)> {
    let mut errors = Vec::new();
    if req.asset_id.is_empty() {
        errors.push("asset_id is required".to_string());
    }
    if req.assigned_to_user_id.is_empty() {
        errors.push("assigned_to_user_id is required".to_string());
    }
    if req.base_of_assignment_id.is_empty() {
        errors.push("base_of_assignment_id is required".to_string());
    }
    if req.purpose.trim().is_empty() {
        errors.push("purpose is required".to_string());
    }
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    let mut conn = get_conn(pool)?;

    let assignment = ledger::record_assignment(
        &mut conn,
        AssignmentInput {
            asset_id: &req.asset_id,
            assigned_to_user_id: &req.assigned_to_user_id,
            assignment_date: req.assignment_date,
            base_of_assignment_id: &req.base_of_assignment_id,
            purpose: Some(&req.purpose),
            expected_return_date: req.expected_return_date,
            recorded_by_user_id: &user.id,
        },
    )?;

    log::info!(
        "asset assigned: {} to user {}",
        assignment.id,
        assignment.assigned_to_user_id
    );
    audit::record_for(
        &mut conn,
        &user,
        "Asset Assigned",
        json!({
            "assignment_id": assignment.id,
            "asset_id": assignment.asset_id,
            "assigned_to_user_id": assignment.assigned_to_user_id,
        }),
    );

    Ok((
        Status::Created,
        Json(json!({ "message": "Asset assigned successfully", "assignment": assignment })),
    ))
}

#[get("/?<base_id>&<is_active>&<assigned_to_user_id>")]
pub async fn list_assignments(
    _user: AuthUser,
    pool: &State<DbPool>,
    base_id: Option<String>,
    is_active: Option<bool>,
    assigned_to_user_id: Option<String>,
) -> ApiResult<Json<Value>> {
    let mut conn = get_conn(pool)?;

    let mut query = assignments::table
        .select(Assignment::as_select())
        .order(assignments::created_at.desc())
        .into_boxed();
    if let Some(base) = base_id {
        query = query.filter(assignments::base_of_assignment_id.eq(base));
    }
    if let Some(active) = is_active {
        query = query.filter(assignments::is_active.eq(active));
    }
    if let Some(assignee) = assigned_to_user_id {
        query = query.filter(assignments::assigned_to_user_id.eq(assignee));
    }

    let result = query.load::<Assignment>(&mut conn)?;
    Ok(Json(json!({ "assignments": result })))
}

#[get("/<assignment_id>")]
pub async fn get_assignment(
    _user: AuthUser,
    pool: &State<DbPool>,
    assignment_id: &str,
) -> ApiResult<Json<Value>> {
    let mut conn = get_conn(pool)?;

    let assignment = assignments::table
        .find(assignment_id)
        .select(Assignment::as_select())
        .first::<Assignment>(&mut conn)
        .optional()?
        .ok_or_else(|| ApiError::NotFound("assignment".into()))?;

    Ok(Json(json!({ "assignment": assignment })))
}

#[patch("/<assignment_id>/return", format = "json", data = "<req>")]
pub async fn return_asset(
    user: AuthUser,
    pool: &State<DbPool>,
    assignment_id: &str,
    req: Json<ReturnAssignmentRequest>,
) -> ApiResult<Json<Value>> {
    let mut conn = get_conn(pool)?;

    let assignment = ledger::return_assignment(&mut conn, assignment_id, req.returned_date)?;

    log::info!("asset returned for assignment {}", assignment_id);
    audit::record_for(
        &mut conn,
        &user,
        "Asset Returned",
        json!({ "assignment_id": assignment_id, "returned_date": req.returned_date }),
    );

    Ok(Json(json!({
        "message": "Asset return recorded successfully",
        "assignment": assignment,
    })))
}
