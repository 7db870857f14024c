use chrono::Utc;
use diesel::prelude::*;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rocket::http::Status;
use rocket::request::{FromRequest, Outcome, Request};
use rocket::State;
use serde::{Deserialize, Serialize};

use crate::config::AppConfig;
use crate::db::DbPool;
use crate::error::ApiError;
use crate::models::{User, UserProfile};
use crate::schema::{bases, roles, user_bases, user_roles, users};

/// Bearer token claims: subject is the user id. Roles are carried for
/// observability only; authorization always re-resolves them from the
/// store so a stale token cannot keep a revoked role alive.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub username: String,
    #[serde(default)]
    pub roles: Vec<String>,
    pub iat: i64,
    pub exp: i64,
}

pub fn issue_token(
    user_id: &str,
    username: &str,
    roles: &[String],
    config: &AppConfig,
) -> Result<String, ApiError> {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: user_id.to_string(),
        username: username.to_string(),
        roles: roles.to_vec(),
        iat: now,
        exp: now + config.jwt_expire_days * 86_400,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(format!("token encoding: {}", e)))
}

pub fn verify_token(token: &str, config: &AppConfig) -> Result<Claims, ApiError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| ApiError::Authentication("invalid or expired token".into()))
}

/// The authenticated caller, resolved fresh from the store on every
/// request: role names, assigned base ids, and the client address for
/// the audit trail. Replaces ad-hoc request-object attachments with a
/// typed value handlers receive as a guard.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: String,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub roles: Vec<String>,
    pub bases: Vec<String>,
    pub ip: Option<String>,
}

impl AuthUser {
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id.clone(),
            username: self.username.clone(),
            email: self.email.clone(),
            full_name: self.full_name.clone(),
            roles: self.roles.clone(),
            bases: self.bases.clone(),
        }
    }
}

/// Load role names and assigned base ids for a user.
pub fn load_memberships(
    conn: &mut SqliteConnection,
    user_id: &str,
) -> QueryResult<(Vec<String>, Vec<String>)> {
    let role_names: Vec<String> = user_roles::table
        .inner_join(roles::table)
        .filter(user_roles::user_id.eq(user_id))
        .select(roles::role_name)
        .load(conn)?;

    let base_ids: Vec<String> = user_bases::table
        .inner_join(bases::table)
        .filter(user_bases::user_id.eq(user_id))
        .select(bases::id)
        .load(conn)?;

    Ok((role_names, base_ids))
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AuthUser {
    type Error = ApiError;

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let config = match req.guard::<&State<AppConfig>>().await {
            Outcome::Success(c) => c,
            _ => {
                return Outcome::Error((
                    Status::InternalServerError,
                    ApiError::Internal("config not managed".into()),
                ))
            }
        };
        let pool = match req.guard::<&State<DbPool>>().await {
            Outcome::Success(p) => p,
            _ => {
                return Outcome::Error((
                    Status::InternalServerError,
                    ApiError::Internal("pool not managed".into()),
                ))
            }
        };

        let token = match req
            .headers()
            .get_one("Authorization")
            .and_then(|h| h.strip_prefix("Bearer "))
        {
            Some(t) => t,
            None => {
                return Outcome::Error((
                    Status::Unauthorized,
                    ApiError::Authentication("access token required".into()),
                ))
            }
        };

        let claims = match verify_token(token, config) {
            Ok(c) => c,
            Err(e) => return Outcome::Error((Status::Unauthorized, e)),
        };

        let mut conn = match pool.get() {
            Ok(c) => c,
            Err(e) => return Outcome::Error((Status::InternalServerError, ApiError::from(e))),
        };

        let user = users::table
            .filter(users::id.eq(&claims.sub))
            .filter(users::is_active.eq(true))
            .select(User::as_select())
            .first::<User>(&mut conn)
            .optional();

        let user = match user {
            Ok(Some(u)) => u,
            Ok(None) => {
                return Outcome::Error((
                    Status::Unauthorized,
                    ApiError::Authentication("invalid token".into()),
                ))
            }
            Err(e) => return Outcome::Error((Status::InternalServerError, ApiError::from(e))),
        };

        let (role_names, base_ids) = match load_memberships(&mut conn, &user.id) {
            Ok(m) => m,
            Err(e) => return Outcome::Error((Status::InternalServerError, ApiError::from(e))),
        };

        Outcome::Success(AuthUser {
            id: user.id,
            username: user.username,
            email: user.email,
            full_name: user.full_name,
            roles: role_names,
            bases: base_ids,
            ip: req.client_ip().map(|ip| ip.to_string()),
        })
    }
}
