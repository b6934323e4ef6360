use rusqlite::Connection;

/// Initialize the main database schema (licenses and user accounts).
pub fn init_db(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        -- Licenses, one row per key. Raw keys are never stored; lookup is
        -- by salted SHA-256 of the key.
        -- expires_on is a UTC epoch day (unix seconds / 86400), not an
        -- instant: expiry comparisons are calendar-day granular.
        CREATE TABLE IF NOT EXISTS licenses (
            id TEXT PRIMARY KEY,
            key_hash TEXT NOT NULL UNIQUE,
            active INTEGER NOT NULL DEFAULT 1,
            bound_device_id TEXT,
            owner_identity TEXT,
            activated_at INTEGER,
            first_activated_at INTEGER,
            last_login_at INTEGER,
            duration_days INTEGER,
            expires_on INTEGER,
            expired_at INTEGER,
            created_at INTEGER NOT NULL
        );
        -- Note: UNIQUE(key_hash) creates the implicit lookup index

        -- Registered accounts (identity + password variant).
        -- identity is stored lowercased; device_id is pinned at
        -- registration and checked on every login.
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            identity TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            device_id TEXT NOT NULL,
            license_id TEXT NOT NULL REFERENCES licenses(id) ON DELETE CASCADE,
            sessions_revoked_at INTEGER,
            created_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_users_license ON users(license_id);
        "#,
    )?;
    Ok(())
}

/// Initialize the access log schema (separate DB file).
/// Optimized for append-only workload with WAL mode.
pub fn init_audit_db(conn: &Connection) -> rusqlite::Result<()> {
    // WAL mode: writes are sequential appends, much faster for append-only workloads
    // synchronous=NORMAL: safe with WAL, faster than FULL
    // journal_size_limit: prevent WAL from growing indefinitely
    conn.execute_batch(
        r#"
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA wal_autocheckpoint = 1000;
        PRAGMA journal_size_limit = 67108864;

        -- Append-only: rows are never updated or deleted by the gate.
        -- No uniqueness constraint; every mismatch attempt is kept.
        CREATE TABLE IF NOT EXISTS access_logs (
            id TEXT PRIMARY KEY,
            timestamp INTEGER NOT NULL,
            kind TEXT NOT NULL CHECK (kind IN ('first_activation', 'hwid_mismatch', 'username_mismatch')),
            license_id TEXT NOT NULL,
            identity TEXT NOT NULL,
            device_id TEXT NOT NULL,
            ip_address TEXT,
            user_agent TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_access_logs_license_time ON access_logs(license_id, timestamp);
        CREATE INDEX IF NOT EXISTS idx_access_logs_kind ON access_logs(kind);
        "#,
    )?;
    Ok(())
}
