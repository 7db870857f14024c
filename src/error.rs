use std::fmt;

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use rocket::http::Status;
use rocket::response::Responder;
use rocket::serde::json::{json, Json};
use rocket::{Request, Response};
use serde_json::Value;

/// Error taxonomy surfaced by the API. Every variant maps to a stable
/// status code and a JSON body with a human-readable message.
#[derive(Debug)]
pub enum ApiError {
    /// Malformed or missing input; carries the collected messages.
    Validation(Vec<String>),
    /// Missing, invalid, or expired credentials.
    Authentication(String),
    /// Role or base check failed.
    Forbidden(String),
    /// Referenced entity absent.
    NotFound(String),
    /// Unique-constraint violation (duplicate username, serial, ...).
    Conflict(String),
    /// A ledger operation would drive an asset balance below zero.
    InsufficientBalance { asset_id: String, requested: i32 },
    /// Store failure or unexpected condition.
    Internal(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Validation(errors) => write!(f, "validation failed: {}", errors.join("; ")),
            ApiError::Authentication(msg) => write!(f, "authentication failed: {}", msg),
            ApiError::Forbidden(msg) => write!(f, "{}", msg),
            ApiError::NotFound(what) => write!(f, "{} not found", what),
            ApiError::Conflict(msg) => write!(f, "{}", msg),
            ApiError::InsufficientBalance { asset_id, requested } => write!(
                f,
                "insufficient balance on asset {} for quantity {}",
                asset_id, requested
            ),
            ApiError::Internal(msg) => write!(f, "internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl ApiError {
    pub fn status(&self) -> Status {
        match self {
            ApiError::Validation(_) => Status::BadRequest,
            ApiError::Authentication(_) => Status::Unauthorized,
            ApiError::Forbidden(_) => Status::Forbidden,
            ApiError::NotFound(_) => Status::NotFound,
            ApiError::Conflict(_) => Status::Conflict,
            ApiError::InsufficientBalance { .. } => Status::BadRequest,
            ApiError::Internal(_) => Status::InternalServerError,
        }
    }

    fn body(&self) -> Value {
        match self {
            ApiError::Validation(errors) => json!({
                "message": "Validation failed",
                "errors": errors,
            }),
            other => json!({ "message": other.to_string() }),
        }
    }
}

impl<'r> Responder<'r, 'static> for ApiError {
    fn respond_to(self, req: &'r Request<'_>) -> rocket::response::Result<'static> {
        if let ApiError::Internal(msg) = &self {
            log::error!("internal error on {}: {}", req.uri(), msg);
        }
        let status = self.status();
        let body = Json(self.body()).respond_to(req)?;
        Response::build_from(body).status(status).ok()
    }
}

impl From<DieselError> for ApiError {
    fn from(err: DieselError) -> Self {
        match err {
            DieselError::NotFound => ApiError::NotFound("record".into()),
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                ApiError::Conflict(format!("already exists: {}", info.message()))
            }
            DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _) => {
                ApiError::NotFound("referenced record".into())
            }
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<r2d2::Error> for ApiError {
    fn from(err: r2d2::Error) -> Self {
        ApiError::Internal(format!("connection pool: {}", err))
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_match_taxonomy() {
        assert_eq!(ApiError::Validation(vec![]).status(), Status::BadRequest);
        assert_eq!(ApiError::Authentication("x".into()).status(), Status::Unauthorized);
        assert_eq!(ApiError::Forbidden("x".into()).status(), Status::Forbidden);
        assert_eq!(ApiError::NotFound("asset".into()).status(), Status::NotFound);
        assert_eq!(ApiError::Conflict("dup".into()).status(), Status::Conflict);
        assert_eq!(
            ApiError::InsufficientBalance { asset_id: "a".into(), requested: 5 }.status(),
            Status::BadRequest
        );
    }

    #[test]
    fn unique_violation_maps_to_conflict() {
        let err = DieselError::DatabaseError(
            DatabaseErrorKind::UniqueViolation,
            Box::new("UNIQUE constraint failed: users.username".to_string()),
        );
        assert!(matches!(ApiError::from(err), ApiError::Conflict(_)));
    }
}
