use chrono::NaiveDate;
use diesel::prelude::*;
use rocket::http::Status;
use rocket::serde::json::{json, Json, Value};
use rocket::{get, post, State};
use serde::Deserialize;

use crate::access;
use crate::audit;
use crate::auth::AuthUser;
use crate::db::{get_conn, DbPool};
use crate::error::{ApiError, ApiResult};
use crate::ledger::{self, ExpenditureInput};
use crate::models::Expenditure;
use crate::routes::assets::parse_date;
use crate::schema::expenditures;

#[derive(Deserialize)]
pub struct CreateExpenditureRequest {
    pub asset_id: String,
    pub quantity_expended: i32,
    pub expenditure_date: NaiveDate,
    pub base_id: String,
    pub reason: String,
}

#[post("/", format = "json", data = "<req>")]
pub async fn create_expenditure(
    user: AuthUser,
    pool: &State<DbPool>,
    req: Json<CreateExpenditureRequest>,
) -> ApiResult<(Status, Json<Value>)> {
    user.require_base_access(access::target_base(None, None, Some(&req.base_id), None))?;

    let mut errors = Vec::new();
    if req.asset_id.is_empty() {
        errors.push("asset_id is required".to_string());
    }
    if req.base_id.is_empty() {
        errors.push("base_id is required".to_string());
    }
    if req.quantity_expended < 1 {
        errors.push("quantity must be at least 1".to_string());
    }
    if req.reason.trim().is_empty() {
        errors.push("reason is required".to_string());
    }
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    let mut conn = get_conn(pool)?;

    let expenditure = ledger::record_expenditure(
        &mut conn,
        ExpenditureInput {
            asset_id: &req.asset_id,
            quantity_expended: req.quantity_expended,
            expenditure_date: req.expenditure_date,
            base_id: &req.base_id,
            reason: Some(&req.reason),
            reported_by_user_id: &user.id,
        },
    )?;

    log::info!(
        "expenditure recorded: {} for asset {}",
        expenditure.id,
        expenditure.asset_id
    );
    audit::record_for(
        &mut conn,
        &user,
        "Expenditure Created",
        json!({
            "expenditure_id": expenditure.id,
            "asset_id": expenditure.asset_id,
            "quantity_expended": expenditure.quantity_expended,
            "base_id": expenditure.base_id,
        }),
    );

    Ok((
        Status::Created,
        Json(json!({ "message": "Expenditure recorded successfully", "expenditure": expenditure })),
    ))
}

#[get("/?<base_id>&<start_date>&<end_date>")]
pub async fn list_expenditures(
    _user: AuthUser,
    pool: &State<DbPool>,
    base_id: Option<String>,
    start_date: Option<String>,
    end_date: Option<String>,
) -> ApiResult<Json<Value>> {
    let start = parse_date(start_date.as_deref())?;
    let end = parse_date(end_date.as_deref())?;

    let mut conn = get_conn(pool)?;

    let mut query = expenditures::table
        .select(Expenditure::as_select())
        .order(expenditures::created_at.desc())
        .into_boxed();
    if let Some(base) = base_id {
        query = query.filter(expenditures::base_id.eq(base));
    }
    if let (Some(start), Some(end)) = (start, end) {
        query = query.filter(expenditures::expenditure_date.between(start, end));
    }

    let result = query.load::<Expenditure>(&mut conn)?;
    Ok(Json(json!({ "expenditures": result })))
}

#[get("/<expenditure_id>")]
pub async fn get_expenditure(
    _user: AuthUser,
    pool: &State<DbPool>,
    expenditure_id: &str,
) -> ApiResult<Json<Value>> {
    let mut conn = get_conn(pool)?;

    let expenditure = expenditures::table
        .find(expenditure_id)
        .select(Expenditure::as_select())
        .first::<Expenditure>(&mut conn)
        .optional()?
        .ok_or_else(|| ApiError::NotFound("expenditure".into()))?;

    Ok(Json(json!({ "expenditure": expenditure })))
}
