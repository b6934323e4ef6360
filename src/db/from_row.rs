//! Row mapping trait and helpers for reducing boilerplate in queries.

use rusqlite::{Connection, OptionalExtension, Row, ToSql};

use crate::models::*;

/// Parse a string column into an enum type, converting parse errors to
/// rusqlite errors instead of panicking on bad stored values.
fn parse_enum<T: std::str::FromStr>(row: &Row, col: usize, col_name: &str) -> rusqlite::Result<T> {
    row.get::<_, String>(col)?.parse::<T>().map_err(|_| {
        rusqlite::Error::InvalidColumnType(col, col_name.to_string(), rusqlite::types::Type::Text)
    })
}

/// Trait for constructing a type from a database row.
pub trait FromRow: Sized {
    fn from_row(row: &Row) -> rusqlite::Result<Self>;
}

/// Query for a single optional result.
pub fn query_one<T: FromRow>(
    conn: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
) -> crate::error::Result<Option<T>> {
    conn.query_row(sql, params, T::from_row)
        .optional()
        .map_err(Into::into)
}

/// Query for multiple results.
pub fn query_all<T: FromRow>(
    conn: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
) -> crate::error::Result<Vec<T>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, T::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ============ SQL SELECT Constants ============

pub const LICENSE_COLS: &str = "id, key_hash, active, bound_device_id, owner_identity, activated_at, first_activated_at, last_login_at, duration_days, expires_on, expired_at, created_at";

pub const USER_COLS: &str =
    "id, identity, password_hash, device_id, license_id, sessions_revoked_at, created_at";

pub const ACCESS_LOG_COLS: &str =
    "id, timestamp, kind, license_id, identity, device_id, ip_address, user_agent";

// ============ FromRow implementations ============

impl FromRow for LicenseRecord {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(LicenseRecord {
            id: row.get(0)?,
            key_hash: row.get(1)?,
            active: row.get::<_, i64>(2)? != 0,
            bound_device_id: row.get(3)?,
            owner_identity: row.get(4)?,
            activated_at: row.get(5)?,
            first_activated_at: row.get(6)?,
            last_login_at: row.get(7)?,
            duration_days: row.get::<_, Option<i64>>(8)?.map(|d| d as u32),
            expires_on: row.get(9)?,
            expired_at: row.get(10)?,
            created_at: row.get(11)?,
        })
    }
}

impl FromRow for UserAccount {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(UserAccount {
            id: row.get(0)?,
            identity: row.get(1)?,
            password_hash: row.get(2)?,
            device_id: row.get(3)?,
            license_id: row.get(4)?,
            sessions_revoked_at: row.get(5)?,
            created_at: row.get(6)?,
        })
    }
}

impl FromRow for AccessLogEntry {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(AccessLogEntry {
            id: row.get(0)?,
            timestamp: row.get(1)?,
            kind: parse_enum(row, 2, "kind")?,
            license_id: row.get(3)?,
            identity: row.get(4)?,
            device_id: row.get(5)?,
            ip_address: row.get(6)?,
            user_agent: row.get(7)?,
        })
    }
}
