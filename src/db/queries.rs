use chrono::Utc;
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::crypto::hash_secret;
use crate::engine::RecordUpdate;
use crate::error::Result;
use crate::models::*;

use super::from_row::{query_all, query_one, ACCESS_LOG_COLS, LICENSE_COLS, USER_COLS};

fn now() -> i64 {
    Utc::now().timestamp()
}

fn gen_id() -> String {
    Uuid::new_v4().to_string()
}

// ============ Licenses ============

/// Provision a license record. Out-of-band with respect to the gate
/// itself: the engine only ever reads and conditionally updates rows.
pub fn create_license(conn: &Connection, key: &str, input: &CreateLicense) -> Result<LicenseRecord> {
    let id = gen_id();
    let key_hash = hash_secret(key);
    let created_at = now();

    conn.execute(
        "INSERT INTO licenses (id, key_hash, active, expires_on, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![id, key_hash, !input.inactive, input.expires_on, created_at],
    )?;

    Ok(LicenseRecord {
        id,
        key_hash,
        active: !input.inactive,
        bound_device_id: None,
        owner_identity: None,
        activated_at: None,
        first_activated_at: None,
        last_login_at: None,
        duration_days: None,
        expires_on: input.expires_on,
        expired_at: None,
        created_at,
    })
}

pub fn get_license_by_key(conn: &Connection, key: &str) -> Result<Option<LicenseRecord>> {
    let key_hash = hash_secret(key);
    query_one(
        conn,
        &format!("SELECT {} FROM licenses WHERE key_hash = ?1", LICENSE_COLS),
        &[&key_hash],
    )
}

pub fn get_license_by_id(conn: &Connection, id: &str) -> Result<Option<LicenseRecord>> {
    query_one(
        conn,
        &format!("SELECT {} FROM licenses WHERE id = ?1", LICENSE_COLS),
        &[&id],
    )
}

/// Persist an engine decision's record mutation.
///
/// No lock is held across the caller's read-then-write sequence: two
/// concurrent binds against the same unbound license race and the last
/// write wins, per the store's document-level semantics. COALESCE keeps
/// `first_activated_at` and `expired_at` write-once at the SQL level.
pub fn apply_decision(conn: &Connection, license_id: &str, update: &RecordUpdate) -> Result<()> {
    match update {
        RecordUpdate::Bind {
            device_id,
            identity,
            activated_at,
            duration_days,
            expires_on,
        } => {
            conn.execute(
                "UPDATE licenses SET
                     bound_device_id = ?1,
                     owner_identity = ?2,
                     activated_at = ?3,
                     last_login_at = ?3,
                     first_activated_at = COALESCE(first_activated_at, ?3),
                     duration_days = ?4,
                     expires_on = ?5
                 WHERE id = ?6",
                params![
                    device_id,
                    identity,
                    activated_at,
                    duration_days.map(i64::from),
                    expires_on,
                    license_id
                ],
            )?;
        }
        RecordUpdate::Expire { expired_at } => {
            conn.execute(
                "UPDATE licenses SET active = 0, expired_at = COALESCE(expired_at, ?1)
                 WHERE id = ?2",
                params![expired_at, license_id],
            )?;
        }
        RecordUpdate::Touch { last_login_at } => {
            conn.execute(
                "UPDATE licenses SET last_login_at = ?1 WHERE id = ?2",
                params![last_login_at, license_id],
            )?;
        }
    }
    Ok(())
}

// ============ Access log ============

/// Append one access log entry. Append-only: nothing in this crate ever
/// updates or deletes rows. When logging is disabled the entry is still
/// returned to the caller but not persisted.
#[allow(clippy::too_many_arguments)]
pub fn append_access_log(
    conn: &Connection,
    enabled: bool,
    kind: AccessLogKind,
    license_id: &str,
    identity: &str,
    device_id: &str,
    ip_address: Option<&str>,
    user_agent: Option<&str>,
) -> Result<AccessLogEntry> {
    let entry = AccessLogEntry {
        id: gen_id(),
        timestamp: now(),
        kind,
        license_id: license_id.to_string(),
        identity: identity.to_string(),
        device_id: device_id.to_string(),
        ip_address: ip_address.map(String::from),
        user_agent: user_agent.map(String::from),
    };

    if !enabled {
        return Ok(entry);
    }

    conn.execute(
        "INSERT INTO access_logs (id, timestamp, kind, license_id, identity, device_id, ip_address, user_agent)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            entry.id,
            entry.timestamp,
            entry.kind.as_ref(),
            entry.license_id,
            entry.identity,
            entry.device_id,
            entry.ip_address,
            entry.user_agent
        ],
    )?;

    Ok(entry)
}

/// All entries for a license, in insertion order.
pub fn list_access_logs(conn: &Connection, license_id: &str) -> Result<Vec<AccessLogEntry>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM access_logs WHERE license_id = ?1 ORDER BY timestamp, rowid",
            ACCESS_LOG_COLS
        ),
        &[&license_id],
    )
}

// ============ Users ============

/// Create an account with the device pinned at registration time.
/// `identity` must already be normalized (trimmed, lowercased).
pub fn create_user(
    conn: &Connection,
    identity: &str,
    password_hash: &str,
    device_id: &str,
    license_id: &str,
) -> Result<UserAccount> {
    let id = gen_id();
    let created_at = now();

    conn.execute(
        "INSERT INTO users (id, identity, password_hash, device_id, license_id, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![id, identity, password_hash, device_id, license_id, created_at],
    )?;

    Ok(UserAccount {
        id,
        identity: identity.to_string(),
        password_hash: password_hash.to_string(),
        device_id: device_id.to_string(),
        license_id: license_id.to_string(),
        sessions_revoked_at: None,
        created_at,
    })
}

pub fn get_user_by_identity(conn: &Connection, identity: &str) -> Result<Option<UserAccount>> {
    query_one(
        conn,
        &format!("SELECT {} FROM users WHERE identity = ?1", USER_COLS),
        &[&identity],
    )
}

/// Invalidate whatever sessions the caller has issued for this account.
/// The stamp is the contract; token plumbing lives outside this crate.
pub fn revoke_user_sessions(conn: &Connection, user_id: &str) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE users SET sessions_revoked_at = ?1 WHERE id = ?2",
        params![now(), user_id],
    )?;
    Ok(affected > 0)
}
