use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};

pub const ADMIN: &str = "Admin";
pub const BASE_COMMANDER: &str = "Base Commander";
pub const LOGISTICS_OFFICER: &str = "Logistics Officer";
pub const AUDITOR: &str = "Auditor";

impl AuthUser {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    /// Caller must hold at least one of the listed roles.
    pub fn require_role(&self, allowed: &[&str]) -> ApiResult<()> {
        if allowed.iter().any(|r| self.has_role(r)) {
            Ok(())
        } else {
            Err(ApiError::Forbidden("Insufficient permissions".into()))
        }
    }

    /// Base-scoping check. Admin bypasses entirely; a request with no
    /// target base carries no restriction; otherwise the base must be
    /// in the caller's assigned set.
    pub fn require_base_access(&self, target_base: Option<&str>) -> ApiResult<()> {
        if self.has_role(ADMIN) {
            return Ok(());
        }
        match target_base {
            None => Ok(()),
            Some(base_id) => {
                if self.bases.iter().any(|b| b == base_id) {
                    Ok(())
                } else {
                    Err(ApiError::Forbidden("Access denied to this base".into()))
                }
            }
        }
    }
}

/// Resolve the target base id for a request. Precedence: path parameter,
/// then query parameter, then body `base_id`, then body `receiving_base_id`.
pub fn target_base<'a>(
    path: Option<&'a str>,
    query: Option<&'a str>,
    body_base: Option<&'a str>,
    body_receiving: Option<&'a str>,
) -> Option<&'a str> {
    path.or(query).or(body_base).or(body_receiving)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_with(roles: &[&str], bases: &[&str]) -> AuthUser {
        AuthUser {
            id: "u1".into(),
            username: "test".into(),
            email: "test@example.com".into(),
            full_name: "Test User".into(),
            roles: roles.iter().map(|s| s.to_string()).collect(),
            bases: bases.iter().map(|s| s.to_string()).collect(),
            ip: None,
        }
    }

    #[test]
    fn role_check_requires_any_listed_role() {
        let user = user_with(&[LOGISTICS_OFFICER], &[]);
        assert!(user.require_role(&[ADMIN, LOGISTICS_OFFICER]).is_ok());
        assert!(matches!(
            user.require_role(&[ADMIN]),
            Err(ApiError::Forbidden(_))
        ));
    }

    #[test]
    fn admin_bypasses_base_scoping() {
        let admin = user_with(&[ADMIN], &[]);
        assert!(admin.require_base_access(Some("any-base")).is_ok());
    }

    #[test]
    fn no_target_base_means_no_restriction() {
        let user = user_with(&[LOGISTICS_OFFICER], &[]);
        assert!(user.require_base_access(None).is_ok());
    }

    #[test]
    fn unassigned_base_is_forbidden() {
        let user = user_with(&[LOGISTICS_OFFICER], &["base-a"]);
        assert!(user.require_base_access(Some("base-a")).is_ok());
        assert!(matches!(
            user.require_base_access(Some("base-b")),
            Err(ApiError::Forbidden(_))
        ));
    }

    #[test]
    fn target_base_precedence() {
        assert_eq!(target_base(Some("p"), Some("q"), Some("b"), Some("r")), Some("p"));
        assert_eq!(target_base(None, Some("q"), Some("b"), Some("r")), Some("q"));
        assert_eq!(target_base(None, None, Some("b"), Some("r")), Some("b"));
        assert_eq!(target_base(None, None, None, Some("r")), Some("r"));
        assert_eq!(target_base(None, None, None, None), None);
    }
}
