use chrono::{NaiveDate, NaiveDateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::models::{
    Assignment, DashboardMetrics, Expenditure, NewAssignment, NewExpenditure, NewPurchase,
    NewTransfer, Purchase, Transfer,
};
use crate::schema::{assets, assignments, expenditures, purchases, transfers};

pub const TRANSFER_INITIATED: &str = "Initiated";
pub const TRANSFER_COMPLETED: &str = "Completed";
pub const TRANSFER_CANCELLED: &str = "Cancelled";

pub struct PurchaseInput<'a> {
    pub asset_id: &'a str,
    pub quantity: i32,
    pub unit_cost: Option<f64>,
    pub total_cost: Option<f64>,
    pub purchase_date: NaiveDate,
    pub supplier_info: Option<&'a str>,
    pub receiving_base_id: &'a str,
    pub purchase_order_number: Option<&'a str>,
    pub recorded_by_user_id: &'a str,
}

pub struct ExpenditureInput<'a> {
    pub asset_id: &'a str,
    pub quantity_expended: i32,
    pub expenditure_date: NaiveDate,
    pub base_id: &'a str,
    pub reason: Option<&'a str>,
    pub reported_by_user_id: &'a str,
}

pub struct TransferInput<'a> {
    pub asset_id: &'a str,
    pub asset_serial_number: Option<&'a str>,
    pub quantity: i32,
    pub source_base_id: &'a str,
    pub destination_base_id: &'a str,
    pub transfer_date: NaiveDateTime,
    pub reason: Option<&'a str>,
    pub initiated_by_user_id: &'a str,
}

pub struct AssignmentInput<'a> {
    pub asset_id: &'a str,
    pub assigned_to_user_id: &'a str,
    pub assignment_date: NaiveDate,
    pub base_of_assignment_id: &'a str,
    pub purpose: Option<&'a str>,
    pub expected_return_date: Option<NaiveDate>,
    pub recorded_by_user_id: &'a str,
}

fn asset_exists(conn: &mut SqliteConnection, asset_id: &str) -> ApiResult<()> {
    let count: i64 = assets::table
        .filter(assets::id.eq(asset_id))
        .count()
        .get_result(conn)?;
    if count == 0 {
        return Err(ApiError::NotFound("asset".into()));
    }
    Ok(())
}

/// Insert a purchase row and credit the asset balance as one atomic unit.
/// The balance update is an in-database increment, so two concurrent
/// purchases on the same asset cannot lose an update.
pub fn record_purchase(conn: &mut SqliteConnection, input: PurchaseInput) -> ApiResult<Purchase> {
    if input.quantity <= 0 {
        return Err(ApiError::Validation(vec![
            "quantity must be greater than zero".into(),
        ]));
    }

    conn.transaction::<Purchase, ApiError, _>(|conn| {
        asset_exists(conn, input.asset_id)?;

        let id = Uuid::new_v4().to_string();
        diesel::insert_into(purchases::table)
            .values(&NewPurchase {
                id: &id,
                asset_id: input.asset_id,
                quantity: input.quantity,
                unit_cost: input.unit_cost,
                total_cost: input.total_cost,
                purchase_date: input.purchase_date,
                supplier_info: input.supplier_info,
                receiving_base_id: input.receiving_base_id,
                purchase_order_number: input.purchase_order_number,
                recorded_by_user_id: input.recorded_by_user_id,
            })
            .execute(conn)?;

        diesel::update(assets::table.filter(assets::id.eq(input.asset_id)))
            .set((
                assets::current_balance.eq(assets::current_balance + input.quantity),
                assets::last_updated_at.eq(Utc::now().naive_utc()),
            ))
            .execute(conn)?;

        purchases::table
            .find(&id)
            .select(Purchase::as_select())
            .first(conn)
            .map_err(Into::into)
    })
}

/// Insert an expenditure row and debit the asset balance atomically. The
/// decrement is guarded: it only applies while the balance covers the
/// quantity, so a balance can never go negative and concurrent debits
/// serialize on the row instead of racing through a read-then-write.
pub fn record_expenditure(
    conn: &mut SqliteConnection,
    input: ExpenditureInput,
) -> ApiResult<Expenditure> {
    if input.quantity_expended <= 0 {
        return Err(ApiError::Validation(vec![
            "quantity must be greater than zero".into(),
        ]));
    }

    conn.transaction::<Expenditure, ApiError, _>(|conn| {
        asset_exists(conn, input.asset_id)?;

        let id = Uuid::new_v4().to_string();
        diesel::insert_into(expenditures::table)
            .values(&NewExpenditure {
                id: &id,
                asset_id: input.asset_id,
                quantity_expended: input.quantity_expended,
                expenditure_date: input.expenditure_date,
                base_id: input.base_id,
                reason: input.reason,
                reported_by_user_id: input.reported_by_user_id,
            })
            .execute(conn)?;

        let updated = diesel::update(
            assets::table
                .filter(assets::id.eq(input.asset_id))
                .filter(assets::current_balance.ge(input.quantity_expended)),
        )
        .set((
            assets::current_balance.eq(assets::current_balance - input.quantity_expended),
            assets::last_updated_at.eq(Utc::now().naive_utc()),
        ))
        .execute(conn)?;

        if updated == 0 {
            // rolls back the expenditure row as well
            return Err(ApiError::InsufficientBalance {
                asset_id: input.asset_id.to_string(),
                requested: input.quantity_expended,
            });
        }

        expenditures::table
            .find(&id)
            .select(Expenditure::as_select())
            .first(conn)
            .map_err(Into::into)
    })
}

/// Create a transfer in `Initiated` state. Balances are not touched at
/// creation time; a transfer tracks movement, it does not pre-debit the
/// source or credit the destination.
pub fn record_transfer(conn: &mut SqliteConnection, input: TransferInput) -> ApiResult<Transfer> {
    if input.quantity <= 0 {
        return Err(ApiError::Validation(vec![
            "quantity must be greater than zero".into(),
        ]));
    }

    asset_exists(conn, input.asset_id)?;

    let id = Uuid::new_v4().to_string();
    diesel::insert_into(transfers::table)
        .values(&NewTransfer {
            id: &id,
            asset_id: input.asset_id,
            asset_serial_number: input.asset_serial_number,
            quantity: input.quantity,
            source_base_id: input.source_base_id,
            destination_base_id: input.destination_base_id,
            transfer_date: input.transfer_date,
            reason: input.reason,
            status: TRANSFER_INITIATED,
            initiated_by_user_id: input.initiated_by_user_id,
        })
        .execute(conn)?;

    transfers::table
        .find(&id)
        .select(Transfer::as_select())
        .first(conn)
        .map_err(Into::into)
}

/// Transition a transfer's status. `Completed` stamps the receiving user
/// and completion time; `Cancelled` only flips the status.
pub fn update_transfer_status(
    conn: &mut SqliteConnection,
    transfer_id: &str,
    new_status: &str,
    receiver: Option<&str>,
) -> ApiResult<Transfer> {
    if new_status != TRANSFER_COMPLETED && new_status != TRANSFER_CANCELLED {
        return Err(ApiError::Validation(vec![format!(
            "status must be '{}' or '{}'",
            TRANSFER_COMPLETED, TRANSFER_CANCELLED
        )]));
    }

    let updated = if new_status == TRANSFER_COMPLETED {
        diesel::update(transfers::table.find(transfer_id))
            .set((
                transfers::status.eq(new_status),
                transfers::received_by_user_id.eq(receiver),
                transfers::completed_at.eq(Utc::now().naive_utc()),
            ))
            .execute(conn)?
    } else {
        diesel::update(transfers::table.find(transfer_id))
            .set(transfers::status.eq(new_status))
            .execute(conn)?
    };

    if updated == 0 {
        return Err(ApiError::NotFound("transfer".into()));
    }

    transfers::table
        .find(transfer_id)
        .select(Transfer::as_select())
        .first(conn)
        .map_err(Into::into)
}

/// Record custody of an asset to a person. No balance effect.
pub fn record_assignment(
    conn: &mut SqliteConnection,
    input: AssignmentInput,
) -> ApiResult<Assignment> {
    asset_exists(conn, input.asset_id)?;

    let id = Uuid::new_v4().to_string();
    diesel::insert_into(assignments::table)
        .values(&NewAssignment {
            id: &id,
            asset_id: input.asset_id,
            assigned_to_user_id: input.assigned_to_user_id,
            assignment_date: input.assignment_date,
            base_of_assignment_id: input.base_of_assignment_id,
            purpose: input.purpose,
            expected_return_date: input.expected_return_date,
            recorded_by_user_id: input.recorded_by_user_id,
        })
        .execute(conn)?;

    assignments::table
        .find(&id)
        .select(Assignment::as_select())
        .first(conn)
        .map_err(Into::into)
}

/// Close an assignment: clears the active flag and stamps the return date.
pub fn return_assignment(
    conn: &mut SqliteConnection,
    assignment_id: &str,
    returned_date: NaiveDate,
) -> ApiResult<Assignment> {
    let updated = diesel::update(assignments::table.find(assignment_id))
        .set((
            assignments::is_active.eq(false),
            assignments::returned_date.eq(returned_date),
        ))
        .execute(conn)?;

    if updated == 0 {
        return Err(ApiError::NotFound("assignment".into()));
    }

    assignments::table
        .find(assignment_id)
        .select(Assignment::as_select())
        .first(conn)
        .map_err(Into::into)
}

/// Aggregate sums for the dashboard. Pure read.
pub fn dashboard_metrics(
    conn: &mut SqliteConnection,
    base_id: Option<&str>,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
) -> ApiResult<DashboardMetrics> {
    let mut assets_q = assets::table
        .select(diesel::dsl::sum(assets::current_balance))
        .into_boxed();
    if let Some(base) = base_id {
        assets_q = assets_q.filter(assets::current_base_id.eq(base.to_string()));
    }
    let total_assets: Option<i64> = assets_q.get_result(conn)?;

    let mut assigned_q = assignments::table
        .filter(assignments::is_active.eq(true))
        .count()
        .into_boxed();
    if let Some(base) = base_id {
        assigned_q = assigned_q.filter(assignments::base_of_assignment_id.eq(base.to_string()));
    }
    let assigned_assets: i64 = assigned_q.get_result(conn)?;

    let mut purchases_q = purchases::table
        .select(diesel::dsl::sum(purchases::quantity))
        .into_boxed();
    if let Some(base) = base_id {
        purchases_q = purchases_q.filter(purchases::receiving_base_id.eq(base.to_string()));
    }
    if let (Some(start), Some(end)) = (start_date, end_date) {
        purchases_q = purchases_q.filter(purchases::purchase_date.between(start, end));
    }
    let total_purchases: Option<i64> = purchases_q.get_result(conn)?;

    let mut expenditures_q = expenditures::table
        .select(diesel::dsl::sum(expenditures::quantity_expended))
        .into_boxed();
    if let Some(base) = base_id {
        expenditures_q = expenditures_q.filter(expenditures::base_id.eq(base.to_string()));
    }
    if let (Some(start), Some(end)) = (start_date, end_date) {
        expenditures_q = expenditures_q.filter(expenditures::expenditure_date.between(start, end));
    }
    let total_expenditures: Option<i64> = expenditures_q.get_result(conn)?;

    Ok(DashboardMetrics {
        total_assets: total_assets.unwrap_or(0),
        assigned_assets,
        total_purchases: total_purchases.unwrap_or(0),
        total_expenditures: total_expenditures.unwrap_or(0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{bases, equipment_types, users};
    use diesel::Connection;

    fn test_conn() -> SqliteConnection {
        let mut conn = SqliteConnection::establish(":memory:").unwrap();
        crate::db::run_migrations(&mut conn).unwrap();

        diesel::insert_into(bases::table)
            .values((bases::id.eq("base-1"), bases::base_name.eq("Test Base")))
            .execute(&mut conn)
            .unwrap();
        diesel::insert_into(equipment_types::table)
            .values((
                equipment_types::id.eq("et-1"),
                equipment_types::type_name.eq("Rifle"),
                equipment_types::is_fungible.eq(false),
            ))
            .execute(&mut conn)
            .unwrap();
        diesel::insert_into(users::table)
            .values((
                users::id.eq("user-1"),
                users::username.eq("tester"),
                users::password_hash.eq("x"),
                users::email.eq("t@example.com"),
                users::full_name.eq("Tester"),
            ))
            .execute(&mut conn)
            .unwrap();
        diesel::insert_into(assets::table)
            .values((
                assets::id.eq("asset-1"),
                assets::equipment_type_id.eq("et-1"),
                assets::current_base_id.eq("base-1"),
                assets::quantity.eq(1),
                assets::status.eq("Operational"),
                assets::current_balance.eq(0),
            ))
            .execute(&mut conn)
            .unwrap();
        conn
    }

    fn balance(conn: &mut SqliteConnection, asset: &str) -> i32 {
        assets::table
            .find(asset)
            .select(assets::current_balance)
            .first(conn)
            .unwrap()
    }

    fn purchase(asset: &'static str, quantity: i32) -> PurchaseInput<'static> {
        PurchaseInput {
            asset_id: asset,
            quantity,
            unit_cost: Some(10.0),
            total_cost: Some(10.0 * quantity as f64),
            purchase_date: NaiveDate::from_ymd_opt(2026, 1, 15).unwrap(),
            supplier_info: Some("Acme Ordnance"),
            receiving_base_id: "base-1",
            purchase_order_number: None,
            recorded_by_user_id: "user-1",
        }
    }

    fn expenditure(asset: &'static str, quantity: i32) -> ExpenditureInput<'static> {
        ExpenditureInput {
            asset_id: asset,
            quantity_expended: quantity,
            expenditure_date: NaiveDate::from_ymd_opt(2026, 1, 20).unwrap(),
            base_id: "base-1",
            reason: Some("training"),
            reported_by_user_id: "user-1",
        }
    }

    #[test]
    fn purchase_credits_balance() {
        let mut conn = test_conn();
        let p = record_purchase(&mut conn, purchase("asset-1", 10)).unwrap();
        assert_eq!(p.quantity, 10);
        assert_eq!(balance(&mut conn, "asset-1"), 10);
    }

    #[test]
    fn purchase_rejects_nonpositive_quantity() {
        let mut conn = test_conn();
        assert!(matches!(
            record_purchase(&mut conn, purchase("asset-1", 0)),
            Err(ApiError::Validation(_))
        ));
        assert!(matches!(
            record_purchase(&mut conn, purchase("asset-1", -3)),
            Err(ApiError::Validation(_))
        ));
    }

    #[test]
    fn purchase_unknown_asset_is_not_found() {
        let mut conn = test_conn();
        assert!(matches!(
            record_purchase(&mut conn, purchase("nope", 1)),
            Err(ApiError::NotFound(_))
        ));
    }

    #[test]
    fn expenditure_debits_balance() {
        let mut conn = test_conn();
        record_purchase(&mut conn, purchase("asset-1", 10)).unwrap();
        record_expenditure(&mut conn, expenditure("asset-1", 4)).unwrap();
        assert_eq!(balance(&mut conn, "asset-1"), 6);
    }

    #[test]
    fn overdraft_rolls_back_the_expenditure_row() {
        let mut conn = test_conn();
        record_purchase(&mut conn, purchase("asset-1", 5)).unwrap();

        let err = record_expenditure(&mut conn, expenditure("asset-1", 8)).unwrap_err();
        assert!(matches!(err, ApiError::InsufficientBalance { .. }));

        // neither half of the paired write may survive
        assert_eq!(balance(&mut conn, "asset-1"), 5);
        let rows: i64 = expenditures::table.count().get_result(&mut conn).unwrap();
        assert_eq!(rows, 0);
    }

    #[test]
    fn transfer_creation_does_not_touch_balance() {
        let mut conn = test_conn();
        record_purchase(&mut conn, purchase("asset-1", 10)).unwrap();

        diesel::insert_into(bases::table)
            .values((bases::id.eq("base-2"), bases::base_name.eq("Other Base")))
            .execute(&mut conn)
            .unwrap();

        let t = record_transfer(
            &mut conn,
            TransferInput {
                asset_id: "asset-1",
                asset_serial_number: None,
                quantity: 3,
                source_base_id: "base-1",
                destination_base_id: "base-2",
                transfer_date: Utc::now().naive_utc(),
                reason: Some("redeployment"),
                initiated_by_user_id: "user-1",
            },
        )
        .unwrap();

        assert_eq!(t.status, TRANSFER_INITIATED);
        assert_eq!(balance(&mut conn, "asset-1"), 10);

        let done = update_transfer_status(&mut conn, &t.id, TRANSFER_COMPLETED, Some("user-1"))
            .unwrap();
        assert_eq!(done.status, TRANSFER_COMPLETED);
        assert_eq!(done.received_by_user_id.as_deref(), Some("user-1"));
        assert!(done.completed_at.is_some());
        assert_eq!(balance(&mut conn, "asset-1"), 10);
    }

    #[test]
    fn transfer_status_rejects_unknown_state() {
        let mut conn = test_conn();
        assert!(matches!(
            update_transfer_status(&mut conn, "t-1", "Teleported", None),
            Err(ApiError::Validation(_))
        ));
    }

    #[test]
    fn assignment_lifecycle() {
        let mut conn = test_conn();
        let a = record_assignment(
            &mut conn,
            AssignmentInput {
                asset_id: "asset-1",
                assigned_to_user_id: "user-1",
                assignment_date: NaiveDate::from_ymd_opt(2026, 2, 1).unwrap(),
                base_of_assignment_id: "base-1",
                purpose: Some("patrol"),
                expected_return_date: NaiveDate::from_ymd_opt(2026, 3, 1),
                recorded_by_user_id: "user-1",
            },
        )
        .unwrap();
        assert!(a.is_active);

        let returned =
            return_assignment(&mut conn, &a.id, NaiveDate::from_ymd_opt(2026, 2, 20).unwrap())
                .unwrap();
        assert!(!returned.is_active);
        assert!(returned.returned_date.is_some());
        // custody tracking never moves the balance
        assert_eq!(balance(&mut conn, "asset-1"), 0);
    }

    #[test]
    fn metrics_reflect_ledger_events() {
        let mut conn = test_conn();
        record_purchase(&mut conn, purchase("asset-1", 10)).unwrap();
        record_expenditure(&mut conn, expenditure("asset-1", 4)).unwrap();

        let m = dashboard_metrics(&mut conn, Some("base-1"), None, None).unwrap();
        assert_eq!(m.total_assets, 6);
        assert_eq!(m.total_purchases, 10);
        assert_eq!(m.total_expenditures, 4);
        assert_eq!(m.assigned_assets, 0);

        // scoping to an unknown base zeroes everything out
        let empty = dashboard_metrics(&mut conn, Some("elsewhere"), None, None).unwrap();
        assert_eq!(empty.total_assets, 0);
        assert_eq!(empty.total_purchases, 0);
    }
}
