use rocket::{Build, Rocket};

pub mod access;
pub mod audit;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod ledger;
pub mod models;
pub mod routes;
pub mod schema;

use config::AppConfig;

/// Assemble the server: pool, migrations, seed data, routes, catchers.
/// The pool and config are injected into Rocket's managed state; nothing
/// is process-global.
pub fn build(config: AppConfig) -> anyhow::Result<Rocket<Build>> {
    let pool = db::init_pool(&config.database_url);

    let mut conn = pool.get()?;
    db::run_migrations(&mut conn)?;
    db::seed(&mut conn, &config.admin_password)?;
    drop(conn);

    Ok(rocket::build()
        .manage(config)
        .manage(pool)
        .mount("/", routes::root_routes())
        .mount("/api/auth", routes::auth_routes())
        .mount("/api/assets", routes::asset_routes())
        .mount("/api/purchases", routes::purchase_routes())
        .mount("/api/transfers", routes::transfer_routes())
        .mount("/api/assignments", routes::assignment_routes())
        .mount("/api/expenditures", routes::expenditure_routes())
        .mount("/api/audit", routes::audit_routes())
        .mount("/api/users", routes::user_routes())
        .mount("/api/bases", routes::base_routes())
        .mount("/api/equipment-types", routes::equipment_type_routes())
        .register("/", routes::api_catchers()))
}
