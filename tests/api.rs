use diesel::connection::SimpleConnection;
use diesel::{Connection, SqliteConnection};
use rocket::http::{ContentType, Header, Status};
use rocket::local::blocking::{Client, LocalResponse};
use serde_json::{json, Value};
use tempfile::NamedTempFile;

use quartermaster::config::AppConfig;

fn test_client() -> (Client, NamedTempFile) {
    let db_file = NamedTempFile::new().expect("temp db");
    let config = AppConfig {
        database_url: db_file.path().to_str().unwrap().to_string(),
        jwt_secret: "test-signing-key".into(),
        jwt_expire_days: 7,
        admin_password: "admin123".into(),
    };
    let rocket = quartermaster::build(config).expect("rocket build");
    let client = Client::tracked(rocket).expect("client");
    (client, db_file)
}

fn bearer(token: &str) -> Header<'static> {
    Header::new("Authorization", format!("Bearer {}", token))
}

fn post_json<'c>(client: &'c Client, path: &str, token: &str, body: Value) -> LocalResponse<'c> {
    client
        .post(path.to_string())
        .header(ContentType::JSON)
        .header(bearer(token))
        .body(body.to_string())
        .dispatch()
}

fn get_with<'c>(client: &'c Client, path: &str, token: &str) -> LocalResponse<'c> {
    client.get(path.to_string()).header(bearer(token)).dispatch()
}

fn login(client: &Client, username: &str, password: &str) -> String {
    let resp = client
        .post("/api/auth/login")
        .header(ContentType::JSON)
        .body(json!({ "username": username, "password": password }).to_string())
        .dispatch();
    assert_eq!(resp.status(), Status::Ok);
    let body: Value = resp.into_json().unwrap();
    body["token"].as_str().unwrap().to_string()
}

fn register(client: &Client, username: &str, password: &str) -> (String, String) {
    let resp = client
        .post("/api/auth/register")
        .header(ContentType::JSON)
        .body(
            json!({
                "username": username,
                "password": password,
                "email": format!("{}@example.com", username),
                "full_name": format!("{} Example", username),
            })
            .to_string(),
        )
        .dispatch();
    assert_eq!(resp.status(), Status::Created);
    let body: Value = resp.into_json().unwrap();
    (
        body["token"].as_str().unwrap().to_string(),
        body["user"]["id"].as_str().unwrap().to_string(),
    )
}

fn create_base(client: &Client, token: &str, name: &str) -> String {
    let resp = post_json(
        client,
        "/api/bases",
        token,
        json!({ "base_name": name, "location": "Test Range" }),
    );
    assert_eq!(resp.status(), Status::Created);
    let body: Value = resp.into_json().unwrap();
    body["base"]["id"].as_str().unwrap().to_string()
}

fn create_asset(client: &Client, token: &str, base_id: &str) -> String {
    let type_resp = post_json(
        client,
        "/api/equipment-types",
        token,
        json!({ "type_name": format!("Rifle-{}", uuid::Uuid::new_v4()), "category": "Small Arms", "is_fungible": false }),
    );
    assert_eq!(type_resp.status(), Status::Created);
    let type_body: Value = type_resp.into_json().unwrap();
    let type_id = type_body["equipment_type"]["id"].as_str().unwrap();

    let resp = post_json(
        client,
        "/api/assets",
        token,
        json!({
            "equipment_type_id": type_id,
            "model_name": "Mk1",
            "base_id": base_id,
            "initial_balance": 0,
        }),
    );
    assert_eq!(resp.status(), Status::Created);
    let body: Value = resp.into_json().unwrap();
    body["asset"]["id"].as_str().unwrap().to_string()
}

fn asset_balance(client: &Client, token: &str, asset_id: &str) -> i64 {
    let resp = get_with(client, &format!("/api/assets/{}", asset_id), token);
    assert_eq!(resp.status(), Status::Ok);
    let body: Value = resp.into_json().unwrap();
    body["asset"]["current_balance"].as_i64().unwrap()
}

#[test]
fn health_endpoint_is_public() {
    let (client, _db) = test_client();
    let resp = client.get("/health").dispatch();
    assert_eq!(resp.status(), Status::Ok);
    let body: Value = resp.into_json().unwrap();
    assert_eq!(body["status"], "OK");
    assert!(body["timestamp"].is_string());
}

#[test]
fn end_to_end_ledger_scenario() {
    let (client, _db) = test_client();

    // register and login as a fresh user
    let (_alice_token, _alice_id) = register(&client, "alice", "secret1");
    let alice_token = login(&client, "alice", "secret1");
    let profile = get_with(&client, "/api/auth/profile", &alice_token);
    assert_eq!(profile.status(), Status::Ok);

    // admin sets up base, equipment type, asset
    let admin = login(&client, "admin", "admin123");
    let hq = create_base(&client, &admin, "HQ");
    let asset = create_asset(&client, &admin, &hq);
    assert_eq!(asset_balance(&client, &admin, &asset), 0);

    // purchase 10
    let resp = post_json(
        &client,
        "/api/purchases",
        &admin,
        json!({
            "asset_id": asset,
            "quantity": 10,
            "unit_cost": 1200.0,
            "total_cost": 12000.0,
            "purchase_date": "2026-05-01",
            "supplier_info": "Acme Ordnance",
            "receiving_base_id": hq,
        }),
    );
    assert_eq!(resp.status(), Status::Created);
    assert_eq!(asset_balance(&client, &admin, &asset), 10);

    // expend 4
    let resp = post_json(
        &client,
        "/api/expenditures",
        &admin,
        json!({
            "asset_id": asset,
            "quantity_expended": 4,
            "expenditure_date": "2026-05-10",
            "base_id": hq,
            "reason": "training exercise",
        }),
    );
    assert_eq!(resp.status(), Status::Created);
    assert_eq!(asset_balance(&client, &admin, &asset), 6);

    // dashboard metrics scoped to HQ
    let resp = get_with(
        &client,
        &format!("/api/assets/metrics/dashboard?base_id={}", hq),
        &admin,
    );
    assert_eq!(resp.status(), Status::Ok);
    let body: Value = resp.into_json().unwrap();
    assert_eq!(body["metrics"]["totalAssets"], 6);
    assert_eq!(body["metrics"]["totalPurchases"], 10);
    assert_eq!(body["metrics"]["totalExpenditures"], 4);
}

#[test]
fn over_expenditure_is_rejected_without_partial_state() {
    let (client, _db) = test_client();
    let admin = login(&client, "admin", "admin123");
    let base = create_base(&client, &admin, "Depot");
    let asset = create_asset(&client, &admin, &base);

    let resp = post_json(
        &client,
        "/api/purchases",
        &admin,
        json!({
            "asset_id": asset,
            "quantity": 5,
            "purchase_date": "2026-05-01",
            "receiving_base_id": base,
        }),
    );
    assert_eq!(resp.status(), Status::Created);

    let resp = post_json(
        &client,
        "/api/expenditures",
        &admin,
        json!({
            "asset_id": asset,
            "quantity_expended": 8,
            "expenditure_date": "2026-05-02",
            "base_id": base,
            "reason": "overdraw attempt",
        }),
    );
    assert_eq!(resp.status(), Status::BadRequest);

    // balance untouched and no expenditure row leaked through
    assert_eq!(asset_balance(&client, &admin, &asset), 5);
    let resp = get_with(&client, "/api/expenditures", &admin);
    let body: Value = resp.into_json().unwrap();
    assert_eq!(body["expenditures"].as_array().unwrap().len(), 0);
}

#[test]
fn base_scoping_blocks_unassigned_users_but_not_admin() {
    let (client, _db) = test_client();
    let admin = login(&client, "admin", "admin123");
    let base = create_base(&client, &admin, "Outpost");
    let asset = create_asset(&client, &admin, &base);

    let (bob_token, bob_id) = register(&client, "bob", "secret1");

    // no role yet: role check fails first
    let resp = post_json(
        &client,
        "/api/purchases",
        &bob_token,
        json!({
            "asset_id": asset,
            "quantity": 1,
            "purchase_date": "2026-05-01",
            "receiving_base_id": base,
        }),
    );
    assert_eq!(resp.status(), Status::Forbidden);

    // grant Logistics Officer (seeded role id 3)
    let resp = post_json(
        &client,
        &format!("/api/users/{}/roles", bob_id),
        &admin,
        json!({ "roleId": 3 }),
    );
    assert_eq!(resp.status(), Status::Ok);

    // role ok, but the base is not in bob's assigned set
    let resp = post_json(
        &client,
        "/api/purchases",
        &bob_token,
        json!({
            "asset_id": asset,
            "quantity": 1,
            "purchase_date": "2026-05-01",
            "receiving_base_id": base,
        }),
    );
    assert_eq!(resp.status(), Status::Forbidden);

    // assign the base; the same purchase now succeeds
    let resp = post_json(
        &client,
        &format!("/api/users/{}/bases", bob_id),
        &admin,
        json!({ "baseId": base }),
    );
    assert_eq!(resp.status(), Status::Ok);

    let resp = post_json(
        &client,
        "/api/purchases",
        &bob_token,
        json!({
            "asset_id": asset,
            "quantity": 1,
            "purchase_date": "2026-05-01",
            "receiving_base_id": base,
        }),
    );
    assert_eq!(resp.status(), Status::Created);
}

#[test]
fn role_and_base_assignment_are_idempotent() {
    let (client, _db) = test_client();
    let admin = login(&client, "admin", "admin123");
    let base = create_base(&client, &admin, "Camp Echo");
    let (_carol_token, carol_id) = register(&client, "carol", "secret1");

    for _ in 0..2 {
        let resp = post_json(
            &client,
            &format!("/api/users/{}/roles", carol_id),
            &admin,
            json!({ "roleId": 3 }),
        );
        assert_eq!(resp.status(), Status::Ok);
        let resp = post_json(
            &client,
            &format!("/api/users/{}/bases", carol_id),
            &admin,
            json!({ "baseId": base }),
        );
        assert_eq!(resp.status(), Status::Ok);
    }

    let resp = get_with(&client, &format!("/api/users/{}", carol_id), &admin);
    assert_eq!(resp.status(), Status::Ok);
    let body: Value = resp.into_json().unwrap();
    assert_eq!(body["user"]["roles"].as_array().unwrap().len(), 1);
    assert_eq!(body["user"]["bases"].as_array().unwrap().len(), 1);
}

#[test]
fn audit_write_failure_does_not_fail_the_primary_operation() {
    let (client, db_file) = test_client();
    let admin = login(&client, "admin", "admin123");
    let base = create_base(&client, &admin, "Forward Ops");
    let asset = create_asset(&client, &admin, &base);

    // sabotage the audit table out from under the recorder
    let mut raw = SqliteConnection::establish(db_file.path().to_str().unwrap()).unwrap();
    raw.batch_execute("DROP TABLE audit_logs;").unwrap();

    let resp = post_json(
        &client,
        "/api/purchases",
        &admin,
        json!({
            "asset_id": asset,
            "quantity": 3,
            "purchase_date": "2026-06-01",
            "receiving_base_id": base,
        }),
    );
    assert_eq!(resp.status(), Status::Created);
    assert_eq!(asset_balance(&client, &admin, &asset), 3);
}

#[test]
fn audit_trail_records_ledger_actions_and_is_restricted() {
    let (client, _db) = test_client();
    let admin = login(&client, "admin", "admin123");
    let base = create_base(&client, &admin, "Station K");
    let asset = create_asset(&client, &admin, &base);

    let resp = post_json(
        &client,
        "/api/purchases",
        &admin,
        json!({
            "asset_id": asset,
            "quantity": 2,
            "purchase_date": "2026-06-01",
            "receiving_base_id": base,
        }),
    );
    assert_eq!(resp.status(), Status::Created);

    let resp = get_with(&client, "/api/audit?action=Purchase%20Created", &admin);
    assert_eq!(resp.status(), Status::Ok);
    let body: Value = resp.into_json().unwrap();
    assert!(!body["logs"].as_array().unwrap().is_empty());

    // non-admin, non-auditor callers are refused
    let (dave_token, _dave_id) = register(&client, "dave", "secret1");
    let resp = get_with(&client, "/api/audit", &dave_token);
    assert_eq!(resp.status(), Status::Forbidden);

    // manual entries are admin-only
    let resp = post_json(
        &client,
        "/api/audit",
        &admin,
        json!({ "action": "Manual Review", "details": { "note": "spot check" } }),
    );
    assert_eq!(resp.status(), Status::Created);
    let resp = post_json(&client, "/api/audit", &dave_token, json!({ "action": "Nope" }));
    assert_eq!(resp.status(), Status::Forbidden);
}

#[test]
fn transfer_lifecycle() {
    let (client, _db) = test_client();
    let admin = login(&client, "admin", "admin123");
    let source = create_base(&client, &admin, "Base North");
    let dest = create_base(&client, &admin, "Base South");
    let asset = create_asset(&client, &admin, &source);

    let resp = post_json(
        &client,
        "/api/transfers",
        &admin,
        json!({
            "asset_id": asset,
            "quantity": 2,
            "source_base_id": source,
            "destination_base_id": dest,
            "transfer_date": "2026-06-05T08:00:00",
            "reason": "redeployment",
        }),
    );
    assert_eq!(resp.status(), Status::Created);
    let body: Value = resp.into_json().unwrap();
    let transfer_id = body["transfer"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["transfer"]["status"], "Initiated");

    // creating a transfer never moves the balance
    assert_eq!(asset_balance(&client, &admin, &asset), 0);

    let resp = client
        .patch(format!("/api/transfers/{}/status", transfer_id))
        .header(ContentType::JSON)
        .header(bearer(&admin))
        .body(json!({ "status": "Completed" }).to_string())
        .dispatch();
    assert_eq!(resp.status(), Status::Ok);
    let body: Value = resp.into_json().unwrap();
    assert_eq!(body["transfer"]["status"], "Completed");
    assert!(body["transfer"]["received_by_user_id"].is_string());
    assert!(body["transfer"]["completed_at"].is_string());

    // unknown states are rejected
    let resp = client
        .patch(format!("/api/transfers/{}/status", transfer_id))
        .header(ContentType::JSON)
        .header(bearer(&admin))
        .body(json!({ "status": "Teleported" }).to_string())
        .dispatch();
    assert_eq!(resp.status(), Status::BadRequest);
}

#[test]
fn assignment_return_flow() {
    let (client, _db) = test_client();
    let admin = login(&client, "admin", "admin123");
    let base = create_base(&client, &admin, "Garrison");
    let asset = create_asset(&client, &admin, &base);
    let (_erin_token, erin_id) = register(&client, "erin", "secret1");

    let resp = post_json(
        &client,
        "/api/assignments",
        &admin,
        json!({
            "asset_id": asset,
            "assigned_to_user_id": erin_id,
            "assignment_date": "2026-06-01",
            "base_of_assignment_id": base,
            "purpose": "patrol duty",
            "expected_return_date": "2026-07-01",
        }),
    );
    assert_eq!(resp.status(), Status::Created);
    let body: Value = resp.into_json().unwrap();
    let assignment_id = body["assignment"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["assignment"]["is_active"], true);

    let resp = client
        .patch(format!("/api/assignments/{}/return", assignment_id))
        .header(ContentType::JSON)
        .header(bearer(&admin))
        .body(json!({ "returned_date": "2026-06-20" }).to_string())
        .dispatch();
    assert_eq!(resp.status(), Status::Ok);
    let body: Value = resp.into_json().unwrap();
    assert_eq!(body["assignment"]["is_active"], false);
    assert_eq!(body["assignment"]["returned_date"], "2026-06-20");
}

#[test]
fn auth_failures() {
    let (client, _db) = test_client();

    // bad credentials
    let resp = client
        .post("/api/auth/login")
        .header(ContentType::JSON)
        .body(json!({ "username": "admin", "password": "wrong" }).to_string())
        .dispatch();
    assert_eq!(resp.status(), Status::Unauthorized);

    // short password is a validation failure, collected as a list
    let resp = client
        .post("/api/auth/register")
        .header(ContentType::JSON)
        .body(
            json!({
                "username": "frank",
                "password": "abc",
                "email": "frank@example.com",
                "full_name": "Frank Example",
            })
            .to_string(),
        )
        .dispatch();
    assert_eq!(resp.status(), Status::BadRequest);
    let body: Value = resp.into_json().unwrap();
    assert!(!body["errors"].as_array().unwrap().is_empty());

    // duplicate username
    register(&client, "grace", "secret1");
    let resp = client
        .post("/api/auth/register")
        .header(ContentType::JSON)
        .body(
            json!({
                "username": "grace",
                "password": "secret1",
                "email": "grace2@example.com",
                "full_name": "Grace Example",
            })
            .to_string(),
        )
        .dispatch();
    assert_eq!(resp.status(), Status::Conflict);

    // protected route without a token
    let resp = client.get("/api/auth/profile").dispatch();
    assert_eq!(resp.status(), Status::Unauthorized);

    // garbage token
    let resp = get_with(&client, "/api/auth/profile", "not-a-jwt");
    assert_eq!(resp.status(), Status::Unauthorized);
}

#[test]
fn user_management_is_admin_only() {
    let (client, _db) = test_client();
    let admin = login(&client, "admin", "admin123");
    let (heidi_token, _heidi_id) = register(&client, "heidi", "secret1");

    let resp = get_with(&client, "/api/users", &admin);
    assert_eq!(resp.status(), Status::Ok);
    let body: Value = resp.into_json().unwrap();
    assert!(body["users"].as_array().unwrap().len() >= 2);

    let resp = get_with(&client, "/api/users", &heidi_token);
    assert_eq!(resp.status(), Status::Forbidden);

    let resp = post_json(
        &client,
        "/api/users",
        &admin,
        json!({
            "username": "ivan",
            "password": "secret1",
            "email": "ivan@example.com",
            "full_name": "Ivan Example",
            "roleId": 5,
        }),
    );
    assert_eq!(resp.status(), Status::Created);
    let ivan = login(&client, "ivan", "secret1");
    let resp = get_with(&client, "/api/auth/profile", &ivan);
    let body: Value = resp.into_json().unwrap();
    assert_eq!(body["user"]["roles"], json!(["Viewer"]));
}
