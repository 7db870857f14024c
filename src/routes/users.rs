use bcrypt::{hash, DEFAULT_COST};
use diesel::prelude::*;
use rocket::http::Status;
use rocket::serde::json::{json, Json, Value};
use rocket::{get, post, State};
use serde::Deserialize;
use uuid::Uuid;

use crate::access::ADMIN;
use crate::audit;
use crate::auth::{load_memberships, AuthUser};
use crate::db::{get_conn, DbPool};
use crate::error::{ApiError, ApiResult};
use crate::models::{NewUser, User, UserProfile};
use crate::schema::{bases, roles, user_bases, user_roles, users};

#[derive(Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub password: String,
    pub email: String,
    pub full_name: String,
    #[serde(rename = "roleId")]
    pub role_id: Option<i32>,
}

#[derive(Deserialize)]
pub struct AssignRoleRequest {
    #[serde(rename = "roleId")]
    pub role_id: i32,
}

#[derive(Deserialize)]
pub struct AssignBaseRequest {
    #[serde(rename = "baseId")]
    pub base_id: String,
}

#[get("/?<page>&<limit>")]
pub async fn list_users(
    user: AuthUser,
    pool: &State<DbPool>,
    page: Option<i64>,
    limit: Option<i64>,
) -> ApiResult<Json<Value>> {
    user.require_role(&[ADMIN])?;

    let page = page.unwrap_or(1).max(1);
    let limit = limit.unwrap_or(10).clamp(1, 100);

    let mut conn = get_conn(pool)?;

    let rows = users::table
        .filter(users::is_active.eq(true))
        .order(users::created_at.asc())
        .limit(limit)
        .offset((page - 1) * limit)
        .select(User::as_select())
        .load::<User>(&mut conn)?;

    let mut result = Vec::with_capacity(rows.len());
    for row in rows {
        let (role_names, base_ids) = load_memberships(&mut conn, &row.id)?;
        result.push(UserProfile {
            id: row.id,
            username: row.username,
            email: row.email,
            full_name: row.full_name,
            roles: role_names,
            bases: base_ids,
        });
    }

    Ok(Json(json!({
        "users": result,
        "pagination": { "page": page, "limit": limit, "total": result.len() },
    })))
}

#[get("/<user_id>")]
pub async fn get_user(
    user: AuthUser,
    pool: &State<DbPool>,
    user_id: &str,
) -> ApiResult<Json<Value>> {
    user.require_role(&[ADMIN])?;

    let mut conn = get_conn(pool)?;

    let row = users::table
        .filter(users::id.eq(user_id))
        .filter(users::is_active.eq(true))
        .select(User::as_select())
        .first::<User>(&mut conn)
        .optional()?
        .ok_or_else(|| ApiError::NotFound("user".into()))?;

    let (role_names, base_ids) = load_memberships(&mut conn, &row.id)?;

    Ok(Json(json!({
        "user": UserProfile {
            id: row.id,
            username: row.username,
            email: row.email,
            full_name: row.full_name,
            roles: role_names,
            bases: base_ids,
        },
    })))
}

#[post("/", format = "json", data = "<req>")]
pub async fn create_user(
    user: AuthUser,
    pool: &State<DbPool>,
    req: Json<CreateUserRequest>,
) -> ApiResult<(Status, Json<Value>)> {
    user.require_role(&[ADMIN])?;

    let mut errors = Vec::new();
    if req.username.len() < 3 {
        errors.push("username must be at least 3 characters".to_string());
    }
    if req.password.len() < 6 {
        errors.push("password must be at least 6 characters".to_string());
    }
    if !req.email.contains('@') {
        errors.push("email must be a valid address".to_string());
    }
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    let mut conn = get_conn(pool)?;

    let user_id = Uuid::new_v4().to_string();
    let password_hash =
        hash(&req.password, DEFAULT_COST).map_err(|e| ApiError::Internal(e.to_string()))?;

    diesel::insert_into(users::table)
        .values(&NewUser {
            id: &user_id,
            username: &req.username,
            password_hash: &password_hash,
            email: &req.email,
            full_name: &req.full_name,
        })
        .execute(&mut conn)?;

    if let Some(role_id) = req.role_id {
        diesel::insert_or_ignore_into(user_roles::table)
            .values((
                user_roles::user_id.eq(&user_id),
                user_roles::role_id.eq(role_id),
            ))
            .execute(&mut conn)?;
    }

    log::info!("user created: {} by {}", req.username, user.username);
    audit::record_for(
        &mut conn,
        &user,
        "User Created",
        json!({ "user_id": user_id, "username": req.username }),
    );

    Ok((
        Status::Created,
        Json(json!({ "message": "User created successfully", "user_id": user_id })),
    ))
}

/// Assigning a role the user already holds is a no-op (set semantics).
#[post("/<user_id>/roles", format = "json", data = "<req>")]
pub async fn assign_role(
    user: AuthUser,
    pool: &State<DbPool>,
    user_id: &str,
    req: Json<AssignRoleRequest>,
) -> ApiResult<Json<Value>> {
    user.require_role(&[ADMIN])?;

    let mut conn = get_conn(pool)?;

    let target: i64 = users::table
        .filter(users::id.eq(user_id))
        .count()
        .get_result(&mut conn)?;
    if target == 0 {
        return Err(ApiError::NotFound("user".into()));
    }

    let role_name: String = roles::table
        .filter(roles::id.eq(req.role_id))
        .select(roles::role_name)
        .first(&mut conn)
        .optional()?
        .ok_or_else(|| ApiError::NotFound("role".into()))?;

    diesel::insert_or_ignore_into(user_roles::table)
        .values((
            user_roles::user_id.eq(user_id),
            user_roles::role_id.eq(req.role_id),
        ))
        .execute(&mut conn)?;

    log::info!("role {} assigned to user {}", role_name, user_id);
    audit::record_for(
        &mut conn,
        &user,
        "Role Assigned",
        json!({ "user_id": user_id, "assigned_role_id": req.role_id }),
    );

    Ok(Json(json!({ "message": "Role assigned successfully" })))
}

/// Same set semantics as role assignment.
#[post("/<user_id>/bases", format = "json", data = "<req>")]
pub async fn assign_base(
    user: AuthUser,
    pool: &State<DbPool>,
    user_id: &str,
    req: Json<AssignBaseRequest>,
) -> ApiResult<Json<Value>> {
    user.require_role(&[ADMIN])?;

    let mut conn = get_conn(pool)?;

    let target: i64 = users::table
        .filter(users::id.eq(user_id))
        .count()
        .get_result(&mut conn)?;
    if target == 0 {
        return Err(ApiError::NotFound("user".into()));
    }

    let base_name: String = bases::table
        .filter(bases::id.eq(&req.base_id))
        .select(bases::base_name)
        .first(&mut conn)
        .optional()?
        .ok_or_else(|| ApiError::NotFound("base".into()))?;

    diesel::insert_or_ignore_into(user_bases::table)
        .values((
            user_bases::user_id.eq(user_id),
            user_bases::base_id.eq(&req.base_id),
        ))
        .execute(&mut conn)?;

    log::info!("base {} assigned to user {}", base_name, user_id);
    audit::record_for(
        &mut conn,
        &user,
        "Base Assigned",
        json!({ "user_id": user_id, "assigned_base_id": req.base_id }),
    );

    Ok(Json(json!({ "message": "Base assigned successfully" })))
}
