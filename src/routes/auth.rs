use bcrypt::{hash, verify, DEFAULT_COST};
use diesel::prelude::*;
use rocket::http::Status;
use rocket::serde::json::{json, Json, Value};
use rocket::{get, post, State};
use serde::Deserialize;
use uuid::Uuid;

use crate::audit;
use crate::auth::{issue_token, load_memberships, AuthUser};
use crate::config::AppConfig;
use crate::db::{get_conn, DbPool};
use crate::error::{ApiError, ApiResult};
use crate::models::{NewUser, User, UserProfile};
use crate::schema::users;

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub email: String,
    pub full_name: String,
}

fn validate_register(req: &RegisterRequest) -> ApiResult<()> {
    let mut errors = Vec::new();
    if req.username.len() < 3 || !req.username.chars().all(|c| c.is_ascii_alphanumeric()) {
        errors.push("username must be at least 3 alphanumeric characters".to_string());
    }
    if req.password.len() < 6 {
        errors.push("password must be at least 6 characters".to_string());
    }
    if !req.email.contains('@') {
        errors.push("email must be a valid address".to_string());
    }
    if req.full_name.trim().len() < 2 {
        errors.push("full name is required".to_string());
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ApiError::Validation(errors))
    }
}

#[post("/login", format = "json", data = "<req>")]
pub async fn login(
    pool: &State<DbPool>,
    config: &State<AppConfig>,
    req: Json<LoginRequest>,
    client_ip: Option<std::net::IpAddr>,
) -> ApiResult<Json<Value>> {
    let mut conn = get_conn(pool)?;

    let user = users::table
        .filter(users::username.eq(&req.username))
        .filter(users::is_active.eq(true))
        .select(User::as_select())
        .first::<User>(&mut conn)
        .optional()?
        .ok_or_else(|| ApiError::Authentication("Invalid credentials".into()))?;

    if !verify(&req.password, &user.password_hash).unwrap_or(false) {
        audit::record(
            &mut conn,
            Some(&user.id),
            "User Login",
            json!({ "username": user.username, "reason": "bad password" }),
            client_ip.map(|ip| ip.to_string()).as_deref(),
            audit::FAILURE,
        );
        return Err(ApiError::Authentication("Invalid credentials".into()));
    }

    let (roles, bases) = load_memberships(&mut conn, &user.id)?;
    let token = issue_token(&user.id, &user.username, &roles, config)?;

    log::info!("user logged in: {}", user.username);
    audit::record(
        &mut conn,
        Some(&user.id),
        "User Login",
        json!({ "user_id": user.id, "username": user.username }),
        client_ip.map(|ip| ip.to_string()).as_deref(),
        audit::SUCCESS,
    );

    Ok(Json(json!({
        "message": "Login successful",
        "token": token,
        "user": UserProfile {
            id: user.id,
            username: user.username,
            email: user.email,
            full_name: user.full_name,
            roles,
            bases,
        },
    })))
}

#[post("/register", format = "json", data = "<req>")]
pub async fn register(
    pool: &State<DbPool>,
    config: &State<AppConfig>,
    req: Json<RegisterRequest>,
    client_ip: Option<std::net::IpAddr>,
) -> ApiResult<(Status, Json<Value>)> {
    validate_register(&req)?;

    let mut conn = get_conn(pool)?;

    let taken: i64 = users::table
        .filter(users::username.eq(&req.username))
        .count()
        .get_result(&mut conn)?;
    if taken > 0 {
        return Err(ApiError::Conflict("Username already exists".into()));
    }

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

    let token = issue_token(&user_id, &req.username, &[], config)?;

    log::info!("new user registered: {}", req.username);
    audit::record(
        &mut conn,
        Some(&user_id),
        "User Registration",
        json!({ "user_id": user_id, "username": req.username, "email": req.email }),
        client_ip.map(|ip| ip.to_string()).as_deref(),
        audit::SUCCESS,
    );

    Ok((
        Status::Created,
        Json(json!({
            "message": "User registered successfully",
            "token": token,
            "user": UserProfile {
                id: user_id,
                username: req.username.clone(),
                email: req.email.clone(),
                full_name: req.full_name.clone(),
                roles: vec![],
                bases: vec![],
            },
        })),
    ))
}

#[get("/profile")]
pub async fn profile(user: AuthUser) -> Json<Value> {
    Json(json!({ "user": user.profile() }))
}
