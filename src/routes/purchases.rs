use chrono::NaiveDate;
use diesel::prelude::*;
use rocket::http::Status;
use rocket::serde::json::{json, Json, Value};
use rocket::{get, post, State};
use serde::Deserialize;

use crate::access::{self, ADMIN, LOGISTICS_OFFICER};
use crate::audit;
use crate::auth::AuthUser;
use crate::db::{get_conn, DbPool};
use crate::error::{ApiError, ApiResult};
use crate::ledger::{self, PurchaseInput};
use crate::models::Purchase;
use crate::routes::assets::parse_date;
use crate::schema::purchases;

#[derive(Deserialize)]
pub struct CreatePurchaseRequest {
    pub asset_id: String,
    pub quantity: i32,
    pub unit_cost: Option<f64>,
    pub total_cost: Option<f64>,
    pub purchase_date: NaiveDate,
    pub supplier_info: Option<String>,
    pub receiving_base_id: String,
    pub purchase_order_number: Option<String>,
}

#[post("/", format = "json", data = "<req>")]
pub async fn create_purchase(
    user: AuthUser,
    pool: &State<DbPool>,
    req: Json<CreatePurchaseRequest>,
) -> ApiResult<(Status, Json<Value>)> {
    user.require_role(&[ADMIN, LOGISTICS_OFFICER])?;
    user.require_base_access(access::target_base(
        None,
        None,
        None,
        Some(&req.receiving_base_id),
    ))?;

    let mut errors = Vec::new();
    if req.asset_id.is_empty() {
        errors.push("asset_id is required".to_string());
    }
    if req.receiving_base_id.is_empty() {
        errors.push("receiving_base_id is required".to_string());
    }
    if req.quantity < 1 {
        errors.push("quantity must be at least 1".to_string());
    }
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    let mut conn = get_conn(pool)?;

    let purchase = ledger::record_purchase(
        &mut conn,
        PurchaseInput {
            asset_id: &req.asset_id,
            quantity: req.quantity,
            unit_cost: req.unit_cost,
            total_cost: req.total_cost,
            purchase_date: req.purchase_date,
            supplier_info: req.supplier_info.as_deref(),
            receiving_base_id: &req.receiving_base_id,
            purchase_order_number: req.purchase_order_number.as_deref(),
            recorded_by_user_id: &user.id,
        },
    )?;

    log::info!("purchase created: {} by {}", purchase.id, user.username);
    audit::record_for(
        &mut conn,
        &user,
        "Purchase Created",
        json!({
            "purchase_id": purchase.id,
            "asset_id": purchase.asset_id,
            "quantity": purchase.quantity,
            "total_cost": purchase.total_cost,
            "base_id": purchase.receiving_base_id,
        }),
    );

    Ok((
        Status::Created,
        Json(json!({ "message": "Purchase recorded successfully", "purchase": purchase })),
    ))
}

#[get("/?<base_id>&<start_date>&<end_date>")]
pub async fn list_purchases(
    _user: AuthUser,
    pool: &State<DbPool>,
    base_id: Option<String>,
    start_date: Option<String>,
    end_date: Option<String>,
) -> ApiResult<Json<Value>> {
    let start = parse_date(start_date.as_deref())?;
    let end = parse_date(end_date.as_deref())?;

    let mut conn = get_conn(pool)?;

    let mut query = purchases::table
        .select(Purchase::as_select())
        .order(purchases::created_at.desc())
        .into_boxed();
    if let Some(base) = base_id {
        query = query.filter(purchases::receiving_base_id.eq(base));
    }
    if let (Some(start), Some(end)) = (start, end) {
        query = query.filter(purchases::purchase_date.between(start, end));
    }

    let result = query.load::<Purchase>(&mut conn)?;
    Ok(Json(json!({ "purchases": result })))
}

#[get("/<purchase_id>")]
pub async fn get_purchase(
    _user: AuthUser,
    pool: &State<DbPool>,
    purchase_id: &str,
) -> ApiResult<Json<Value>> {
    let mut conn = get_conn(pool)?;

    let purchase = purchases::table
        .find(purchase_id)
        .select(Purchase::as_select())
        .first::<Purchase>(&mut conn)
        .optional()?
        .ok_or_else(|| ApiError::NotFound("purchase".into()))?;

    Ok(Json(json!({ "purchase": purchase })))
}
