diesel::table! {
    roles (id) {
        id -> Integer,
        role_name -> Text,
        description -> Nullable<Text>,
        created_at -> Timestamp,
    }
}

diesel::table! {
    bases (id) {
        id -> Text,
        base_name -> Text,
        location -> Nullable<Text>,
        description -> Nullable<Text>,
        created_at -> Timestamp,
    }
}

diesel::table! {
    users (id) {
        id -> Text,
        username -> Text,
        password_hash -> Text,
        email -> Text,
        full_name -> Text,
        is_active -> Bool,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

diesel::table! {
    user_roles (user_id, role_id) {
        user_id -> Text,
        role_id -> Integer,
        assigned_at -> Timestamp,
    }
}

diesel::table! {
    user_bases (user_id, base_id) {
        user_id -> Text,
        base_id -> Text,
        assigned_at -> Timestamp,
    }
}

diesel::table! {
    equipment_types (id) {
        id -> Text,
        type_name -> Text,
        category -> Nullable<Text>,
        description -> Nullable<Text>,
        is_fungible -> Bool,
        created_at -> Timestamp,
    }
}

diesel::table! {
    assets (id) {
        id -> Text,
        equipment_type_id -> Text,
        model_name -> Nullable<Text>,
        serial_number -> Nullable<Text>,
        current_base_id -> Nullable<Text>,
        quantity -> Integer,
        status -> Text,               // Operational | Damaged | Lost | Decommissioned
        current_balance -> Integer,
        last_updated_at -> Timestamp,
        created_at -> Timestamp,
    }
}

diesel::table! {
    purchases (id) {
        id -> Text,
        asset_id -> Text,
        quantity -> Integer,
        unit_cost -> Nullable<Double>,
        total_cost -> Nullable<Double>,
        purchase_date -> Date,
        supplier_info -> Nullable<Text>,
        receiving_base_id -> Text,
        purchase_order_number -> Nullable<Text>,
        recorded_by_user_id -> Text,
        created_at -> Timestamp,
    }
}

diesel::table! {
    transfers (id) {
        id -> Text,
        asset_id -> Text,
        asset_serial_number -> Nullable<Text>,
        quantity -> Integer,
        source_base_id -> Text,
        destination_base_id -> Text,
        transfer_date -> Timestamp,
        reason -> Nullable<Text>,
        status -> Text,               // Initiated | Completed | Cancelled
        initiated_by_user_id -> Text,
        received_by_user_id -> Nullable<Text>,
        created_at -> Timestamp,
        completed_at -> Nullable<Timestamp>,
    }
}

diesel::table! {
    assignments (id) {
        id -> Text,
        asset_id -> Text,
        assigned_to_user_id -> Text,
        assignment_date -> Date,
        base_of_assignment_id -> Text,
        purpose -> Nullable<Text>,
        expected_return_date -> Nullable<Date>,
        returned_date -> Nullable<Date>,
        is_active -> Bool,
        recorded_by_user_id -> Text,
        created_at -> Timestamp,
    }
}

diesel::table! {
    expenditures (id) {
        id -> Text,
        asset_id -> Text,
        quantity_expended -> Integer,
        expenditure_date -> Date,
        base_id -> Text,
        reason -> Nullable<Text>,
        reported_by_user_id -> Text,
        created_at -> Timestamp,
    }
}

diesel::table! {
    audit_logs (id) {
        id -> Text,
        timestamp -> Timestamp,
        user_id -> Nullable<Text>,
        action -> Text,
        details -> Nullable<Text>,     // JSON payload
        ip_address -> Nullable<Text>,
        status -> Text,                // Success | Failure
    }
}

diesel::joinable!(user_roles -> users (user_id));
diesel::joinable!(user_roles -> roles (role_id));
diesel::joinable!(user_bases -> users (user_id));
diesel::joinable!(user_bases -> bases (base_id));
diesel::joinable!(assets -> equipment_types (equipment_type_id));
diesel::joinable!(assets -> bases (current_base_id));
diesel::joinable!(purchases -> assets (asset_id));
diesel::joinable!(purchases -> bases (receiving_base_id));
diesel::joinable!(purchases -> users (recorded_by_user_id));
diesel::joinable!(transfers -> assets (asset_id));
diesel::joinable!(assignments -> assets (asset_id));
diesel::joinable!(assignments -> bases (base_of_assignment_id));
diesel::joinable!(expenditures -> assets (asset_id));
diesel::joinable!(expenditures -> bases (base_id));
diesel::joinable!(audit_logs -> users (user_id));

diesel::allow_tables_to_appear_in_same_query!(
    roles,
    bases,
    users,
    user_roles,
    user_bases,
    equipment_types,
    assets,
    purchases,
    transfers,
    assignments,
    expenditures,
    audit_logs,
);
