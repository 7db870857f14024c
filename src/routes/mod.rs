use chrono::Utc;
use rocket::serde::json::{json, Json, Value};
use rocket::{catch, catchers, get, routes, Catcher, Request, Route};

pub mod assets;
pub mod assignments;
pub mod audit;
pub mod auth;
pub mod bases;
pub mod equipment_types;
pub mod expenditures;
pub mod purchases;
pub mod transfers;
pub mod users;

/// Auth routes, mounted under /api/auth
pub fn auth_routes() -> Vec<Route> {
    routes![auth::login, auth::register, auth::profile]
}

pub fn asset_routes() -> Vec<Route> {
    routes![
        assets::create_asset,
        assets::list_assets,
        assets::get_asset,
        assets::dashboard,
        assets::update_balance,
    ]
}

pub fn purchase_routes() -> Vec<Route> {
    routes![
        purchases::create_purchase,
        purchases::list_purchases,
        purchases::get_purchase,
    ]
}

pub fn transfer_routes() -> Vec<Route> {
    routes![
        transfers::create_transfer,
        transfers::list_transfers,
        transfers::get_transfer,
        transfers::update_status,
    ]
}

pub fn assignment_routes() -> Vec<Route> {
    routes![
        assignments::create_assignment,
        assignments::list_assignments,
        assignments::get_assignment,
        assignments::return_asset,
    ]
}

pub fn expenditure_routes() -> Vec<Route> {
    routes![
        expenditures::create_expenditure,
        expenditures::list_expenditures,
        expenditures::get_expenditure,
    ]
}

pub fn audit_routes() -> Vec<Route> {
    routes![audit::list_audit_logs, audit::create_audit_log]
}

pub fn user_routes() -> Vec<Route> {
    routes![
        users::list_users,
        users::get_user,
        users::create_user,
        users::assign_role,
        users::assign_base,
    ]
}

pub fn base_routes() -> Vec<Route> {
    routes![bases::create_base, bases::list_bases, bases::get_base]
}

pub fn equipment_type_routes() -> Vec<Route> {
    routes![
        equipment_types::create_equipment_type,
        equipment_types::list_equipment_types,
    ]
}

#[get("/health")]
pub fn health() -> Json<Value> {
    Json(json!({ "status": "OK", "timestamp": Utc::now().to_rfc3339() }))
}

pub fn root_routes() -> Vec<Route> {
    routes![health]
}

#[catch(400)]
fn bad_request() -> Json<Value> {
    Json(json!({ "message": "Bad request" }))
}

#[catch(401)]
fn unauthorized() -> Json<Value> {
    Json(json!({ "message": "Access token required" }))
}

#[catch(403)]
fn forbidden() -> Json<Value> {
    Json(json!({ "message": "Access denied" }))
}

#[catch(404)]
fn not_found(req: &Request) -> Json<Value> {
    Json(json!({ "message": format!("Route {} not found", req.uri()) }))
}

#[catch(422)]
fn unprocessable() -> Json<Value> {
    Json(json!({ "message": "Validation failed: malformed or missing fields" }))
}

#[catch(500)]
fn internal_error() -> Json<Value> {
    Json(json!({ "message": "Internal server error" }))
}

pub fn api_catchers() -> Vec<Catcher> {
    catchers![
        bad_request,
        unauthorized,
        forbidden,
        not_found,
        unprocessable,
        internal_error
    ]
}
