//! Database-level tests for license rows, access log appends and accounts.

mod common;

use common::*;

// ============ License CRUD ============

#[test]
fn create_and_fetch_license_by_key() {
    let conn = setup_test_db();
    let created = create_test_license(&conn, "HAMSTER-30D-ABC123");

    let fetched = queries::get_license_by_key(&conn, "HAMSTER-30D-ABC123")
        .expect("query failed")
        .expect("license not found");

    assert_eq!(fetched.id, created.id);
    assert!(fetched.active);
    assert!(fetched.bound_device_id.is_none());
    assert!(fetched.owner_identity.is_none());
    assert!(fetched.expires_on.is_none());
}

#[test]
fn raw_key_is_not_stored() {
    let conn = setup_test_db();
    let created = create_test_license(&conn, "HAMSTER-30D-ABC123");

    assert_ne!(created.key_hash, "HAMSTER-30D-ABC123");
    // Lookup only works through the hashed key path.
    assert!(queries::get_license_by_key(&conn, "HAMSTER-30D-ABC124")
        .unwrap()
        .is_none());
}

#[test]
fn duplicate_key_is_rejected() {
    let conn = setup_test_db();
    create_test_license(&conn, "HAMSTER-30D-ABC123");

    let result = queries::create_license(&conn, "HAMSTER-30D-ABC123", &CreateLicense::default());
    assert!(result.is_err());
}

// ============ Record updates ============

#[test]
fn bind_update_sets_all_binding_fields() {
    let conn = setup_test_db();
    let record = create_test_license(&conn, "HAMSTER-7D-XYZ");

    let update = RecordUpdate::Bind {
        device_id: "dev1".into(),
        identity: "alice".into(),
        activated_at: ts("2024-01-01"),
        duration_days: Some(7),
        expires_on: Some(day("2024-01-08")),
    };
    queries::apply_decision(&conn, &record.id, &update).unwrap();

    let stored = queries::get_license_by_id(&conn, &record.id).unwrap().unwrap();
    assert_eq!(stored.bound_device_id.as_deref(), Some("dev1"));
    assert_eq!(stored.owner_identity.as_deref(), Some("alice"));
    assert_eq!(stored.activated_at, Some(ts("2024-01-01")));
    assert_eq!(stored.first_activated_at, Some(ts("2024-01-01")));
    assert_eq!(stored.last_login_at, Some(ts("2024-01-01")));
    assert_eq!(stored.duration_days, Some(7));
    assert_eq!(stored.expires_on, Some(day("2024-01-08")));
}

#[test]
fn first_activated_at_is_write_once() {
    let conn = setup_test_db();
    let record = create_test_license(&conn, "HAMSTER-7D-XYZ");

    let bind = |at: i64| RecordUpdate::Bind {
        device_id: "dev1".into(),
        identity: "alice".into(),
        activated_at: at,
        duration_days: Some(7),
        expires_on: None,
    };
    queries::apply_decision(&conn, &record.id, &bind(ts("2024-01-01"))).unwrap();
    queries::apply_decision(&conn, &record.id, &bind(ts("2024-03-01"))).unwrap();

    let stored = queries::get_license_by_id(&conn, &record.id).unwrap().unwrap();
    assert_eq!(stored.first_activated_at, Some(ts("2024-01-01")));
    // Re-activation refreshes the window anchor.
    assert_eq!(stored.activated_at, Some(ts("2024-03-01")));
}

#[test]
fn expire_update_is_idempotent() {
    let conn = setup_test_db();
    let record = create_test_license(&conn, "HAMSTER-7D-XYZ");

    queries::apply_decision(
        &conn,
        &record.id,
        &RecordUpdate::Expire {
            expired_at: ts("2024-01-08"),
        },
    )
    .unwrap();
    queries::apply_decision(
        &conn,
        &record.id,
        &RecordUpdate::Expire {
            expired_at: ts("2024-02-01"),
        },
    )
    .unwrap();

    let stored = queries::get_license_by_id(&conn, &record.id).unwrap().unwrap();
    assert!(!stored.active);
    assert_eq!(stored.expired_at, Some(ts("2024-01-08")));
}

#[test]
fn touch_update_only_moves_last_login() {
    let conn = setup_test_db();
    let record = create_test_license(&conn, "HAMSTER-7D-XYZ");
    queries::apply_decision(
        &conn,
        &record.id,
        &RecordUpdate::Bind {
            device_id: "dev1".into(),
            identity: "alice".into(),
            activated_at: ts("2024-01-01"),
            duration_days: Some(7),
            expires_on: Some(day("2024-01-08")),
        },
    )
    .unwrap();

    queries::apply_decision(
        &conn,
        &record.id,
        &RecordUpdate::Touch {
            last_login_at: ts("2024-01-05"),
        },
    )
    .unwrap();

    let stored = queries::get_license_by_id(&conn, &record.id).unwrap().unwrap();
    assert_eq!(stored.last_login_at, Some(ts("2024-01-05")));
    assert_eq!(stored.activated_at, Some(ts("2024-01-01")));
    assert_eq!(stored.expires_on, Some(day("2024-01-08")));
}

// ============ Access log ============

#[test]
fn access_log_preserves_insertion_order() {
    let audit = setup_test_audit_db();

    for device in ["dev2", "dev3", "dev4"] {
        queries::append_access_log(
            &audit,
            true,
            AccessLogKind::HwidMismatch,
            "lic-1",
            "alice",
            device,
            Some("203.0.113.7"),
            Some("keygate-client/1.0"),
        )
        .unwrap();
    }

    let logs = queries::list_access_logs(&audit, "lic-1").unwrap();
    assert_eq!(logs.len(), 3);
    let devices: Vec<&str> = logs.iter().map(|e| e.device_id.as_str()).collect();
    assert_eq!(devices, vec!["dev2", "dev3", "dev4"]);
    assert_eq!(logs[0].ip_address.as_deref(), Some("203.0.113.7"));
}

#[test]
fn disabled_access_log_persists_nothing() {
    let audit = setup_test_audit_db();

    let entry = queries::append_access_log(
        &audit,
        false,
        AccessLogKind::FirstActivation,
        "lic-1",
        "alice",
        "dev1",
        None,
        None,
    )
    .unwrap();

    assert_eq!(entry.kind, AccessLogKind::FirstActivation);
    assert!(queries::list_access_logs(&audit, "lic-1").unwrap().is_empty());
}

// ============ Accounts ============

#[test]
fn create_and_fetch_user() {
    let conn = setup_test_db();
    let license = create_test_license(&conn, "HAMSTER-PERP-AAA");

    let user = queries::create_user(&conn, "alice", "digest", "dev1", &license.id).unwrap();
    assert!(user.sessions_revoked_at.is_none());

    let fetched = queries::get_user_by_identity(&conn, "alice").unwrap().unwrap();
    assert_eq!(fetched.id, user.id);
    assert_eq!(fetched.device_id, "dev1");
    assert_eq!(fetched.license_id, license.id);

    assert!(queries::get_user_by_identity(&conn, "bob").unwrap().is_none());
}

#[test]
fn duplicate_identity_is_rejected() {
    let conn = setup_test_db();
    let license = create_test_license(&conn, "HAMSTER-PERP-AAA");

    queries::create_user(&conn, "alice", "digest", "dev1", &license.id).unwrap();
    let result = queries::create_user(&conn, "alice", "digest2", "dev2", &license.id);
    assert!(result.is_err());
}

#[test]
fn revoking_sessions_stamps_the_account() {
    let conn = setup_test_db();
    let license = create_test_license(&conn, "HAMSTER-PERP-AAA");
    let user = queries::create_user(&conn, "alice", "digest", "dev1", &license.id).unwrap();

    assert!(queries::revoke_user_sessions(&conn, &user.id).unwrap());

    let fetched = queries::get_user_by_identity(&conn, "alice").unwrap().unwrap();
    assert!(fetched.sessions_revoked_at.is_some());

    assert!(!queries::revoke_user_sessions(&conn, "missing-id").unwrap());
}
