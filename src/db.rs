use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};
use diesel::sqlite::SqliteConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use flexi_logger::{Age, Cleanup, Criterion, FileSpec, Logger, Naming};
use uuid::Uuid;

use crate::error::ApiError;

pub type DbPool = Pool<ConnectionManager<SqliteConnection>>;
pub type DbConn = PooledConnection<ConnectionManager<SqliteConnection>>;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

/// Initialize logger
pub fn init_logger() {
    Logger::try_with_str("info")
        .unwrap()
        .log_to_file(FileSpec::default().directory("logs"))
        .rotate(
            Criterion::Age(Age::Day),
            Naming::Numbers,
            Cleanup::KeepLogFiles(7),
        )
        .start()
        .unwrap();
}

/// Enables foreign keys and a busy timeout on every pooled connection.
#[derive(Debug)]
struct ConnectionOptions;

impl diesel::r2d2::CustomizeConnection<SqliteConnection, diesel::r2d2::Error>
    for ConnectionOptions
{
    fn on_acquire(&self, conn: &mut SqliteConnection) -> Result<(), diesel::r2d2::Error> {
        conn.batch_execute("PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 5000;")
            .map_err(diesel::r2d2::Error::QueryError)
    }
}

/// Initialize DB connection pool
pub fn init_pool(database_url: &str) -> DbPool {
    let manager = ConnectionManager::<SqliteConnection>::new(database_url);
    Pool::builder()
        .connection_customizer(Box::new(ConnectionOptions))
        .build(manager)
        .expect("Failed to create DB pool")
}

/// Get a single connection from the pool
pub fn get_conn(pool: &DbPool) -> Result<DbConn, ApiError> {
    pool.get().map_err(ApiError::from)
}

/// Run embedded migrations
pub fn run_migrations(conn: &mut SqliteConnection) -> anyhow::Result<()> {
    conn.run_pending_migrations(MIGRATIONS)
        .map_err(|e| anyhow::anyhow!("migrations failed: {}", e))?;
    Ok(())
}

/// Seed reference data and the default admin account. Idempotent: every
/// insert skips rows that already exist.
pub fn seed(conn: &mut SqliteConnection, admin_password: &str) -> anyhow::Result<()> {
    use crate::schema::{bases, equipment_types, roles, user_roles, users};

    let default_roles: [(&str, &str); 5] = [
        ("Admin", "Full system access"),
        ("Base Commander", "Base-specific access"),
        ("Logistics Officer", "Limited operational access"),
        ("Auditor", "Read access to the audit trail"),
        ("Viewer", "Read-only access"),
    ];
    for (name, desc) in default_roles {
        diesel::insert_or_ignore_into(roles::table)
            .values((roles::role_name.eq(name), roles::description.eq(desc)))
            .execute(conn)?;
    }

    let default_bases = [
        ("HQ Base Alpha", "Primary Headquarters"),
        ("Forward Base Beta", "Eastern Sector"),
        ("Support Base Gamma", "Western Sector"),
    ];
    for (name, location) in default_bases {
        let exists: i64 = bases::table
            .filter(bases::base_name.eq(name))
            .count()
            .get_result(conn)?;
        if exists == 0 {
            diesel::insert_into(bases::table)
                .values((
                    bases::id.eq(Uuid::new_v4().to_string()),
                    bases::base_name.eq(name),
                    bases::location.eq(location),
                ))
                .execute(conn)?;
        }
    }

    let default_types = [
        ("M4 Carbine", "Small Arms", false),
        ("5.56mm Ammunition", "Ammunition", true),
        ("HMMWV", "Vehicle", false),
        ("Body Armor", "Personal Equipment", false),
    ];
    for (name, category, fungible) in default_types {
        let exists: i64 = equipment_types::table
            .filter(equipment_types::type_name.eq(name))
            .count()
            .get_result(conn)?;
        if exists == 0 {
            diesel::insert_into(equipment_types::table)
                .values((
                    equipment_types::id.eq(Uuid::new_v4().to_string()),
                    equipment_types::type_name.eq(name),
                    equipment_types::category.eq(category),
                    equipment_types::is_fungible.eq(fungible),
                ))
                .execute(conn)?;
        }
    }

    let admin_exists: i64 = users::table
        .filter(users::username.eq("admin"))
        .count()
        .get_result(conn)?;
    if admin_exists == 0 {
        let admin_id = Uuid::new_v4().to_string();
        let hash = bcrypt::hash(admin_password, bcrypt::DEFAULT_COST)?;

        diesel::insert_into(users::table)
            .values((
                users::id.eq(&admin_id),
                users::username.eq("admin"),
                users::password_hash.eq(hash),
                users::email.eq("admin@quartermaster.local"),
                users::full_name.eq("System Administrator"),
            ))
            .execute(conn)?;

        let admin_role_id: i32 = roles::table
            .filter(roles::role_name.eq("Admin"))
            .select(roles::id)
            .first(conn)?;

        diesel::insert_or_ignore_into(user_roles::table)
            .values((
                user_roles::user_id.eq(&admin_id),
                user_roles::role_id.eq(admin_role_id),
            ))
            .execute(conn)?;

        log::info!("default admin account created");
    }

    Ok(())
}
