use chrono::NaiveDateTime;
use diesel::prelude::*;
use rocket::http::Status;
use rocket::serde::json::{json, Json, Value};
use rocket::{get, patch, post, State};
use serde::Deserialize;

use crate::access::{ADMIN, BASE_COMMANDER, LOGISTICS_OFFICER};
use crate::audit;
use crate::auth::AuthUser;
use crate::db::{get_conn, DbPool};
use crate::error::{ApiError, ApiResult};
use crate::ledger::{self, TransferInput, TRANSFER_COMPLETED};
use crate::models::Transfer;
use crate::schema::transfers;

#[derive(Deserialize)]
pub struct CreateTransferRequest {
    pub asset_id: String,
    pub asset_serial_number: Option<String>,
    pub quantity: i32,
    pub source_base_id: String,
    pub destination_base_id: String,
    pub transfer_date: NaiveDateTime,
    pub reason: String,
}

#[derive(Deserialize)]
pub struct UpdateTransferStatusRequest {
    pub status: String,
}

#[post("/", format = "json", data = "<req>")]
pub async fn create_transfer(
    user: AuthUser,
    pool: &State<DbPool>,
    req: Json<CreateTransferRequest>,
) -> ApiResult<(Status, Json<Value>)> {
    user.require_role(&[ADMIN, LOGISTICS_OFFICER])?;
    // transfer bodies carry no base_id/receiving_base_id field, so the
    // base-scoping stage has no target and imposes no restriction
    user.require_base_access(None)?;

    let mut errors = Vec::new();
    if req.asset_id.is_empty() {
        errors.push("asset_id is required".to_string());
    }
    if req.source_base_id.is_empty() {
        errors.push("source_base_id is required".to_string());
    }
    if req.destination_base_id.is_empty() {
        errors.push("destination_base_id is required".to_string());
    }
    if req.quantity < 1 {
        errors.push("quantity must be at least 1".to_string());
    }
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    let mut conn = get_conn(pool)?;

    let transfer = ledger::record_transfer(
        &mut conn,
        TransferInput {
            asset_id: &req.asset_id,
            asset_serial_number: req.asset_serial_number.as_deref(),
            quantity: req.quantity,
            source_base_id: &req.source_base_id,
            destination_base_id: &req.destination_base_id,
            transfer_date: req.transfer_date,
            reason: Some(&req.reason),
            initiated_by_user_id: &user.id,
        },
    )?;

    log::info!("transfer initiated: {} by {}", transfer.id, user.username);
    audit::record_for(
        &mut conn,
        &user,
        "Transfer Created",
        json!({
            "transfer_id": transfer.id,
            "asset_id": transfer.asset_id,
            "source_base_id": transfer.source_base_id,
            "destination_base_id": transfer.destination_base_id,
            "quantity": transfer.quantity,
        }),
    );

    Ok((
        Status::Created,
        Json(json!({ "message": "Transfer initiated successfully", "transfer": transfer })),
    ))
}

#[get("/?<base_id>&<status>")]
pub async fn list_transfers(
    _user: AuthUser,
    pool: &State<DbPool>,
    base_id: Option<String>,
    status: Option<String>,
) -> ApiResult<Json<Value>> {
    let mut conn = get_conn(pool)?;

    let mut query = transfers::table
        .select(Transfer::as_select())
        .order(transfers::created_at.desc())
        .into_boxed();
    if let Some(base) = base_id {
        // a transfer is relevant to a base on either end
        query = query.filter(
            transfers::source_base_id
                .eq(base.clone())
                .or(transfers::destination_base_id.eq(base)),
        );
    }
    if let Some(s) = status {
        query = query.filter(transfers::status.eq(s));
    }

    let result = query.load::<Transfer>(&mut conn)?;
    Ok(Json(json!({ "transfers": result })))
}

#[get("/<transfer_id>")]
pub async fn get_transfer(
    _user: AuthUser,
    pool: &State<DbPool>,
    transfer_id: &str,
) -> ApiResult<Json<Value>> {
    let mut conn = get_conn(pool)?;

    let transfer = transfers::table
        .find(transfer_id)
        .select(Transfer::as_select())
        .first::<Transfer>(&mut conn)
        .optional()?
        .ok_or_else(|| ApiError::NotFound("transfer".into()))?;

    Ok(Json(json!({ "transfer": transfer })))
}

#[patch("/<transfer_id>/status", format = "json", data = "<req>")]
pub async fn update_status(
    user: AuthUser,
    pool: &State<DbPool>,
    transfer_id: &str,
    req: Json<UpdateTransferStatusRequest>,
) -> ApiResult<Json<Value>> {
    user.require_role(&[ADMIN, BASE_COMMANDER])?;

    let mut conn = get_conn(pool)?;

    let receiver = if req.status == TRANSFER_COMPLETED {
        Some(user.id.as_str())
    } else {
        None
    };
    let transfer = ledger::update_transfer_status(&mut conn, transfer_id, &req.status, receiver)?;

    log::info!(
        "transfer {} marked {} by {}",
        transfer_id,
        req.status,
        user.username
    );
    audit::record_for(
        &mut conn,
        &user,
        "Transfer Status Updated",
        json!({ "transfer_id": transfer_id, "new_status": req.status }),
    );

    Ok(Json(json!({
        "message": format!("Transfer status updated to {}", req.status),
        "transfer": transfer,
    })))
}
