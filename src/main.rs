use quartermaster::config::AppConfig;
use quartermaster::db;

#[rocket::launch]
fn rocket() -> _ {
    db::init_logger();

    // No signing key means no server: refuse to start rather than run
    // with an insecure default.
    let config = AppConfig::from_env().expect("configuration error");

    quartermaster::build(config).expect("failed to initialize server")
}
