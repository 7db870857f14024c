use diesel::prelude::*;
use rocket::http::Status;
use rocket::serde::json::{json, Json, Value};
use rocket::{get, post, State};
use serde::Deserialize;
use uuid::Uuid;

use crate::access::{ADMIN, LOGISTICS_OFFICER};
use crate::audit;
use crate::auth::AuthUser;
use crate::db::{get_conn, DbPool};
use crate::error::{ApiError, ApiResult};
use crate::models::{EquipmentType, NewEquipmentType};
use crate::schema::equipment_types;

#[derive(Deserialize)]
pub struct CreateEquipmentTypeRequest {
    pub type_name: String,
    pub category: Option<String>,
    pub description: Option<String>,
    pub is_fungible: Option<bool>,
}

#[post("/", format = "json", data = "<req>")]
pub async fn create_equipment_type(
    user: AuthUser,
    pool: &State<DbPool>,
    req: Json<CreateEquipmentTypeRequest>,
) -> ApiResult<(Status, Json<Value>)> {
    user.require_role(&[ADMIN, LOGISTICS_OFFICER])?;

    if req.type_name.trim().is_empty() {
        return Err(ApiError::Validation(vec!["type_name is required".into()]));
    }

    let mut conn = get_conn(pool)?;

    let type_id = Uuid::new_v4().to_string();
    diesel::insert_into(equipment_types::table)
        .values(&NewEquipmentType {
            id: &type_id,
            type_name: &req.type_name,
            category: req.category.as_deref(),
            description: req.description.as_deref(),
            is_fungible: req.is_fungible.unwrap_or(false),
        })
        .execute(&mut conn)?;

    let equipment_type = equipment_types::table
        .find(&type_id)
        .select(EquipmentType::as_select())
        .first::<EquipmentType>(&mut conn)?;

    log::info!(
        "equipment type created: {} by {}",
        equipment_type.type_name,
        user.username
    );
    audit::record_for(
        &mut conn,
        &user,
        "Equipment Type Created",
        json!({ "equipment_type_id": equipment_type.id, "type_name": equipment_type.type_name }),
    );

    Ok((
        Status::Created,
        Json(json!({
            "message": "Equipment type created successfully",
            "equipment_type": equipment_type,
        })),
    ))
}

#[get("/")]
pub async fn list_equipment_types(
    _user: AuthUser,
    pool: &State<DbPool>,
) -> ApiResult<Json<Value>> {
    let mut conn = get_conn(pool)?;

    let result = equipment_types::table
        .order(equipment_types::type_name.asc())
        .select(EquipmentType::as_select())
        .load::<EquipmentType>(&mut conn)?;

    Ok(Json(json!({ "equipment_types": result })))
}
