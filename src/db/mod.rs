mod from_row;
mod schema;
pub mod queries;

pub use schema::{init_audit_db, init_db};

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

pub type DbPool = Pool<SqliteConnectionManager>;

/// Application state holding database pools and configuration.
#[derive(Clone)]
pub struct AppState {
    /// Main database pool (licenses, users)
    pub db: DbPool,
    /// Access log pool (separate file to isolate append-only growth)
    pub audit: DbPool,
    /// Key prefix for duration-encoded licenses
    pub license_key_prefix: String,
    pub access_log_enabled: bool,
}

pub fn create_pool(database_path: &str) -> Result<DbPool, r2d2::Error> {
    let manager = SqliteConnectionManager::file(database_path);
    Pool::builder().max_size(10).build(manager)
}
