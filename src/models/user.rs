use serde::{Deserialize, Serialize};

/// A registered account, keyed by lowercased identity.
///
/// The device id is pinned at registration time and must match every
/// subsequent login before credentials are even checked against the
/// license again.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAccount {
    pub id: String,
    pub identity: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub device_id: String,
    pub license_id: String,
    /// Stamped when a foreign device triggers session revocation.
    pub sessions_revoked_at: Option<i64>,
    pub created_at: i64,
}
