use diesel::prelude::*;
use rocket::http::Status;
use rocket::serde::json::{json, Json, Value};
use rocket::{get, post, State};
use serde::Deserialize;
use uuid::Uuid;

use crate::access::ADMIN;
use crate::audit;
use crate::auth::AuthUser;
use crate::db::{get_conn, DbPool};
use crate::error::{ApiError, ApiResult};
use crate::models::{Base, NewBase};
use crate::schema::bases;

#[derive(Deserialize)]
pub struct CreateBaseRequest {
    pub base_name: String,
    pub location: Option<String>,
    pub description: Option<String>,
}

#[post("/", format = "json", data = "<req>")]
pub async fn create_base(
    user: AuthUser,
    pool: &State<DbPool>,
    req: Json<CreateBaseRequest>,
) -> ApiResult<(Status, Json<Value>)> {
    user.require_role(&[ADMIN])?;

    if req.base_name.trim().is_empty() {
        return Err(ApiError::Validation(vec!["base_name is required".into()]));
    }

    let mut conn = get_conn(pool)?;

    let base_id = Uuid::new_v4().to_string();
    diesel::insert_into(bases::table)
        .values(&NewBase {
            id: &base_id,
            base_name: &req.base_name,
            location: req.location.as_deref(),
            description: req.description.as_deref(),
        })
        .execute(&mut conn)?;

    let base = bases::table
        .find(&base_id)
        .select(Base::as_select())
        .first::<Base>(&mut conn)?;

    log::info!("base created: {} by {}", base.base_name, user.username);
    audit::record_for(
        &mut conn,
        &user,
        "Base Created",
        json!({ "base_id": base.id, "base_name": base.base_name }),
    );

    Ok((
        Status::Created,
        Json(json!({ "message": "Base created successfully", "base": base })),
    ))
}

#[get("/")]
pub async fn list_bases(_user: AuthUser, pool: &State<DbPool>) -> ApiResult<Json<Value>> {
    let mut conn = get_conn(pool)?;

    let result = bases::table
        .order(bases::base_name.asc())
        .select(Base::as_select())
        .load::<Base>(&mut conn)?;

    Ok(Json(json!({ "bases": result })))
}

#[get("/<base_id>")]
pub async fn get_base(
    _user: AuthUser,
    pool: &State<DbPool>,
    base_id: &str,
) -> ApiResult<Json<Value>> {
    let mut conn = get_conn(pool)?;

    let base = bases::table
        .find(base_id)
        .select(Base::as_select())
        .first::<Base>(&mut conn)
        .optional()?
        .ok_or_else(|| ApiError::NotFound("base".into()))?;

    Ok(Json(json!({ "base": base })))
}
