use chrono::{NaiveDate, Utc};
use diesel::prelude::*;
use rocket::http::Status;
use rocket::serde::json::{json, Json, Value};
use rocket::{get, post, put, State};
use serde::Deserialize;
use uuid::Uuid;

use crate::access::{self, ADMIN, BASE_COMMANDER, LOGISTICS_OFFICER};
use crate::audit;
use crate::auth::AuthUser;
use crate::db::{get_conn, DbPool};
use crate::error::{ApiError, ApiResult};
use crate::ledger;
use crate::models::{Asset, NewAsset};
use crate::schema::{assets, equipment_types};

#[derive(Deserialize)]
pub struct CreateAssetRequest {
    pub equipment_type_id: String,
    pub model_name: String,
    pub serial_number: Option<String>,
    pub base_id: String,
    pub quantity: Option<i32>,
    pub status: Option<String>,
    pub initial_balance: Option<i32>,
}

#[derive(Deserialize)]
pub struct UpdateBalanceRequest {
    pub balance: i32,
}

#[post("/", format = "json", data = "<req>")]
pub async fn create_asset(
    user: AuthUser,
    pool: &State<DbPool>,
    req: Json<CreateAssetRequest>,
) -> ApiResult<(Status, Json<Value>)> {
    user.require_role(&[ADMIN, BASE_COMMANDER, LOGISTICS_OFFICER])?;
    user.require_base_access(access::target_base(None, None, Some(&req.base_id), None))?;

    let mut errors = Vec::new();
    if req.equipment_type_id.is_empty() {
        errors.push("equipment_type_id is required".to_string());
    }
    if req.model_name.is_empty() {
        errors.push("model_name is required".to_string());
    }
    if req.initial_balance.is_some_and(|b| b < 0) {
        errors.push("initial_balance must not be negative".to_string());
    }
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    let mut conn = get_conn(pool)?;

    let type_known: i64 = equipment_types::table
        .filter(equipment_types::id.eq(&req.equipment_type_id))
        .count()
        .get_result(&mut conn)?;
    if type_known == 0 {
        return Err(ApiError::NotFound("equipment type".into()));
    }

    let asset_id = Uuid::new_v4().to_string();
    diesel::insert_into(assets::table)
        .values(&NewAsset {
            id: &asset_id,
            equipment_type_id: &req.equipment_type_id,
            model_name: Some(&req.model_name),
            serial_number: req.serial_number.as_deref(),
            current_base_id: Some(&req.base_id),
            quantity: req.quantity.unwrap_or(1),
            status: req.status.as_deref().unwrap_or("Operational"),
            current_balance: req.initial_balance.unwrap_or(0),
        })
        .execute(&mut conn)?;

    let asset = assets::table
        .find(&asset_id)
        .select(Asset::as_select())
        .first::<Asset>(&mut conn)?;

    log::info!("asset created: {} by {}", asset.id, user.username);
    audit::record_for(
        &mut conn,
        &user,
        "Asset Created",
        json!({
            "asset_id": asset.id,
            "equipment_type_id": asset.equipment_type_id,
            "base_id": asset.current_base_id,
            "initial_balance": asset.current_balance,
        }),
    );

    Ok((
        Status::Created,
        Json(json!({ "message": "Asset created successfully", "asset": asset })),
    ))
}

#[get("/?<base_id>&<equipment_type>&<status>")]
pub async fn list_assets(
    _user: AuthUser,
    pool: &State<DbPool>,
    base_id: Option<String>,
    equipment_type: Option<String>,
    status: Option<String>,
) -> ApiResult<Json<Value>> {
    let mut conn = get_conn(pool)?;

    let mut query = assets::table
        .inner_join(equipment_types::table)
        .select(Asset::as_select())
        .order(assets::created_at.desc())
        .into_boxed();

    if let Some(base) = base_id {
        query = query.filter(assets::current_base_id.eq(base));
    }
    if let Some(type_name) = equipment_type {
        query = query.filter(equipment_types::type_name.like(format!("%{}%", type_name)));
    }
    if let Some(s) = status {
        query = query.filter(assets::status.eq(s));
    }

    let result = query.load::<Asset>(&mut conn)?;
    Ok(Json(json!({ "assets": result })))
}

#[get("/<asset_id>")]
pub async fn get_asset(
    _user: AuthUser,
    pool: &State<DbPool>,
    asset_id: &str,
) -> ApiResult<Json<Value>> {
    let mut conn = get_conn(pool)?;

    let asset = assets::table
        .find(asset_id)
        .select(Asset::as_select())
        .first::<Asset>(&mut conn)
        .optional()?
        .ok_or_else(|| ApiError::NotFound("asset".into()))?;

    Ok(Json(json!({ "asset": asset })))
}

#[get("/metrics/dashboard?<base_id>&<start_date>&<end_date>")]
pub async fn dashboard(
    _user: AuthUser,
    pool: &State<DbPool>,
    base_id: Option<String>,
    start_date: Option<String>,
    end_date: Option<String>,
) -> ApiResult<Json<Value>> {
    let start = parse_date(start_date.as_deref())?;
    let end = parse_date(end_date.as_deref())?;

    let mut conn = get_conn(pool)?;
    let metrics = ledger::dashboard_metrics(&mut conn, base_id.as_deref(), start, end)?;

    Ok(Json(json!({ "metrics": metrics })))
}

#[put("/<asset_id>/balance", format = "json", data = "<req>")]
pub async fn update_balance(
    user: AuthUser,
    pool: &State<DbPool>,
    asset_id: &str,
    req: Json<UpdateBalanceRequest>,
) -> ApiResult<Json<Value>> {
    user.require_role(&[ADMIN, BASE_COMMANDER])?;

    if req.balance < 0 {
        return Err(ApiError::Validation(vec![
            "balance must not be negative".into(),
        ]));
    }

    let mut conn = get_conn(pool)?;

    let updated = diesel::update(assets::table.find(asset_id))
        .set((
            assets::current_balance.eq(req.balance),
            assets::last_updated_at.eq(Utc::now().naive_utc()),
        ))
        .execute(&mut conn)?;
    if updated == 0 {
        return Err(ApiError::NotFound("asset".into()));
    }

    log::info!("asset balance set: {} -> {}", asset_id, req.balance);
    audit::record_for(
        &mut conn,
        &user,
        "Asset Balance Updated",
        json!({ "asset_id": asset_id, "new_balance": req.balance }),
    );

    Ok(Json(json!({ "message": "Asset balance updated successfully" })))
}

pub fn parse_date(value: Option<&str>) -> ApiResult<Option<NaiveDate>> {
    match value {
        None => Ok(None),
        Some(raw) => raw
            .parse::<NaiveDate>()
            .map(Some)
            .map_err(|_| ApiError::Validation(vec![format!("invalid date: {}", raw)])),
    }
}
