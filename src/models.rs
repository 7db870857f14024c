use chrono::{NaiveDate, NaiveDateTime};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::schema::{
    assets, assignments, audit_logs, bases, equipment_types, expenditures, purchases, roles,
    transfers, users,
};

#[derive(Debug, Queryable, Identifiable, Selectable, Serialize)]
#[diesel(table_name = roles)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Role {
    pub id: i32,
    pub role_name: String,
    pub description: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Queryable, Identifiable, Selectable, Serialize)]
#[diesel(table_name = bases)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Base {
    pub id: String,
    pub base_name: String,
    pub location: Option<String>,
    pub description: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = bases)]
pub struct NewBase<'a> {
    pub id: &'a str,
    pub base_name: &'a str,
    pub location: Option<&'a str>,
    pub description: Option<&'a str>,
}

#[derive(Debug, Clone, Queryable, Identifiable, Selectable, Serialize)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct User {
    pub id: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub email: String,
    pub full_name: String,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = users)]
pub struct NewUser<'a> {
    pub id: &'a str,
    pub username: &'a str,
    pub password_hash: &'a str,
    pub email: &'a str,
    pub full_name: &'a str,
}

#[derive(Debug, Queryable, Identifiable, Selectable, Serialize)]
#[diesel(table_name = equipment_types)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct EquipmentType {
    pub id: String,
    pub type_name: String,
    pub category: Option<String>,
    pub description: Option<String>,
    pub is_fungible: bool,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = equipment_types)]
pub struct NewEquipmentType<'a> {
    pub id: &'a str,
    pub type_name: &'a str,
    pub category: Option<&'a str>,
    pub description: Option<&'a str>,
    pub is_fungible: bool,
}

#[derive(Debug, Queryable, Identifiable, Selectable, Serialize)]
#[diesel(table_name = assets)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Asset {
    pub id: String,
    pub equipment_type_id: String,
    pub model_name: Option<String>,
    pub serial_number: Option<String>,
    pub current_base_id: Option<String>,
    pub quantity: i32,
    pub status: String,
    pub current_balance: i32,
    pub last_updated_at: NaiveDateTime,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = assets)]
pub struct NewAsset<'a> {
    pub id: &'a str,
    pub equipment_type_id: &'a str,
    pub model_name: Option<&'a str>,
    pub serial_number: Option<&'a str>,
    pub current_base_id: Option<&'a str>,
    pub quantity: i32,
    pub status: &'a str,
    pub current_balance: i32,
}

#[derive(Debug, Queryable, Identifiable, Selectable, Serialize)]
#[diesel(table_name = purchases)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Purchase {
    pub id: String,
    pub asset_id: String,
    pub quantity: i32,
    pub unit_cost: Option<f64>,
    pub total_cost: Option<f64>,
    pub purchase_date: NaiveDate,
    pub supplier_info: Option<String>,
    pub receiving_base_id: String,
    pub purchase_order_number: Option<String>,
    pub recorded_by_user_id: String,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = purchases)]
pub struct NewPurchase<'a> {
    pub id: &'a str,
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

#[derive(Debug, Queryable, Identifiable, Selectable, Serialize)]
#[diesel(table_name = transfers)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Transfer {
    pub id: String,
    pub asset_id: String,
    pub asset_serial_number: Option<String>,
    pub quantity: i32,
    pub source_base_id: String,
    pub destination_base_id: String,
    pub transfer_date: NaiveDateTime,
    pub reason: Option<String>,
    pub status: String,
    pub initiated_by_user_id: String,
    pub received_by_user_id: Option<String>,
    pub created_at: NaiveDateTime,
    pub completed_at: Option<NaiveDateTime>,
}

#[derive(Insertable)]
#[diesel(table_name = transfers)]
pub struct NewTransfer<'a> {
    pub id: &'a str,
    pub asset_id: &'a str,
    pub asset_serial_number: Option<&'a str>,
    pub quantity: i32,
    pub source_base_id: &'a str,
    pub destination_base_id: &'a str,
    pub transfer_date: NaiveDateTime,
    pub reason: Option<&'a str>,
    pub status: &'a str,
    pub initiated_by_user_id: &'a str,
}

#[derive(Debug, Queryable, Identifiable, Selectable, Serialize)]
#[diesel(table_name = assignments)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Assignment {
    pub id: String,
    pub asset_id: String,
    pub assigned_to_user_id: String,
    pub assignment_date: NaiveDate,
    pub base_of_assignment_id: String,
    pub purpose: Option<String>,
    pub expected_return_date: Option<NaiveDate>,
    pub returned_date: Option<NaiveDate>,
    pub is_active: bool,
    pub recorded_by_user_id: String,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = assignments)]
pub struct NewAssignment<'a> {
    pub id: &'a str,
    pub asset_id: &'a str,
    pub assigned_to_user_id: &'a str,
    pub assignment_date: NaiveDate,
    pub base_of_assignment_id: &'a str,
    pub purpose: Option<&'a str>,
    pub expected_return_date: Option<NaiveDate>,
    pub recorded_by_user_id: &'a str,
}

#[derive(Debug, Queryable, Identifiable, Selectable, Serialize)]
#[diesel(table_name = expenditures)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Expenditure {
    pub id: String,
    pub asset_id: String,
    pub quantity_expended: i32,
    pub expenditure_date: NaiveDate,
    pub base_id: String,
    pub reason: Option<String>,
    pub reported_by_user_id: String,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = expenditures)]
pub struct NewExpenditure<'a> {
    pub id: &'a str,
    pub asset_id: &'a str,
    pub quantity_expended: i32,
    pub expenditure_date: NaiveDate,
    pub base_id: &'a str,
    pub reason: Option<&'a str>,
    pub reported_by_user_id: &'a str,
}

#[derive(Debug, Queryable, Identifiable, Selectable, Serialize)]
#[diesel(table_name = audit_logs)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct AuditLog {
    pub id: String,
    pub timestamp: NaiveDateTime,
    pub user_id: Option<String>,
    pub action: String,
    pub details: Option<String>,
    pub ip_address: Option<String>,
    pub status: String,
}

#[derive(Insertable)]
#[diesel(table_name = audit_logs)]
pub struct NewAuditLog<'a> {
    pub id: &'a str,
    pub timestamp: NaiveDateTime,
    pub user_id: Option<&'a str>,
    pub action: &'a str,
    pub details: Option<&'a str>,
    pub ip_address: Option<&'a str>,
    pub status: &'a str,
}

/// User payload returned by auth endpoints: the row plus resolved
/// role names and assigned base ids.
#[derive(Debug, Serialize)]
pub struct UserProfile {
    pub id: String,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub roles: Vec<String>,
    pub bases: Vec<String>,
}

/// Aggregate sums for the dashboard, optionally scoped to one base
/// and/or a date window.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct DashboardMetrics {
    #[serde(rename = "totalAssets")]
    pub total_assets: i64,
    #[serde(rename = "assignedAssets")]
    pub assigned_assets: i64,
    #[serde(rename = "totalPurchases")]
    pub total_purchases: i64,
    #[serde(rename = "totalExpenditures")]
    pub total_expenditures: i64,
}
