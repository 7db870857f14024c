use std::env;

use anyhow::{bail, Result};

/// Externally supplied configuration. The signing secret is mandatory:
/// startup fails rather than running with an insecure default.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_expire_days: i64,
    pub admin_password: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let jwt_secret = match env::var("JWT_SECRET") {
            Ok(s) if !s.is_empty() => s,
            _ => bail!("JWT_SECRET must be set; refusing to start without a signing key"),
        };

        let jwt_expire_days = env::var("JWT_EXPIRE_DAYS")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(7);

        Ok(Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "quartermaster.db".to_string()),
            jwt_secret,
            jwt_expire_days,
            admin_password: env::var("ADMIN_PASSWORD")
                .unwrap_or_else(|_| "admin123".to_string()),
        })
    }
}
