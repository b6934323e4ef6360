//! Test utilities and fixtures for Keygate integration tests

#![allow(dead_code)]

use axum::routing::post;
use axum::Router;
use chrono::NaiveDate;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;

pub use keygate::db::{init_audit_db, init_db, queries, AppState};
pub use keygate::engine::{self, expiry, keyparse, Attempt, Outcome, RecordUpdate};
pub use keygate::handlers::dev::create_dev_license;
pub use keygate::handlers::public::{login, register, verify_device};
pub use keygate::models::*;

pub const PREFIX: &str = "HAMSTER";

/// Create an in-memory test database with schema initialized
pub fn setup_test_db() -> Connection {
    let conn = Connection::open_in_memory().expect("Failed to create in-memory database");
    init_db(&conn).expect("Failed to initialize schema");
    conn
}

/// Create an in-memory test audit database with schema initialized
pub fn setup_test_audit_db() -> Connection {
    let conn = Connection::open_in_memory().expect("Failed to create in-memory audit database");
    init_audit_db(&conn).expect("Failed to initialize audit schema");
    conn
}

/// Epoch day of a `YYYY-MM-DD` date
pub fn day(date: &str) -> i64 {
    expiry::day_from_date(date.parse::<NaiveDate>().expect("valid test date"))
}

/// Unix timestamp of UTC midnight on a `YYYY-MM-DD` date
pub fn ts(date: &str) -> i64 {
    day(date) * 86_400
}

/// Create an active, unbound, never-expiring license for `key`
pub fn create_test_license(conn: &Connection, key: &str) -> LicenseRecord {
    queries::create_license(conn, key, &CreateLicense::default())
        .expect("Failed to create test license")
}

pub fn attempt<'a>(identity: &'a str, device_id: &'a str, now: i64) -> Attempt<'a> {
    Attempt {
        identity,
        device_id,
        now,
    }
}

/// Run the engine against the stored record and persist its decision, the
/// way the verify handler does, with a caller-controlled clock.
pub fn gate(
    conn: &Connection,
    audit: &Connection,
    key: &str,
    identity: &str,
    device_id: &str,
    now: i64,
) -> Outcome {
    let record = queries::get_license_by_key(conn, key).expect("license lookup failed");
    let decision = engine::evaluate(
        record.as_ref(),
        &attempt(identity, device_id, now),
        keyparse::parse_duration_days(key, PREFIX),
    );

    if let Some(record) = &record {
        if let Some(update) = &decision.update {
            queries::apply_decision(conn, &record.id, update).expect("apply_decision failed");
        }
        if let Some(kind) = decision.log {
            queries::append_access_log(audit, true, kind, &record.id, identity, device_id, None, None)
                .expect("access log append failed");
        }
    }

    decision.outcome
}

/// Create an AppState for testing with in-memory databases.
/// Single-connection pools so every handler call sees the same memory db.
pub fn create_test_app_state() -> AppState {
    let manager = SqliteConnectionManager::memory();
    let pool = Pool::builder().max_size(1).build(manager).unwrap();
    {
        let conn = pool.get().unwrap();
        init_db(&conn).unwrap();
    }

    let audit_manager = SqliteConnectionManager::memory();
    let audit_pool = Pool::builder().max_size(1).build(audit_manager).unwrap();
    {
        let conn = audit_pool.get().unwrap();
        init_audit_db(&conn).unwrap();
    }

    AppState {
        db: pool,
        audit: audit_pool,
        license_key_prefix: PREFIX.to_string(),
        access_log_enabled: true,
    }
}

/// Create a Router with all public endpoints (without rate limiting for tests)
pub fn public_app(state: AppState) -> Router {
    Router::new()
        .route("/verify", post(verify_device))
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/dev/create-license", post(create_dev_license))
        .with_state(state)
}
