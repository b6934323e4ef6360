use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};

/// Anomaly classes recorded in the append-only access log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AccessLogKind {
    FirstActivation,
    HwidMismatch,
    UsernameMismatch,
}

/// One append-only access log row. Entries are never mutated and carry no
/// uniqueness constraint: repeated mismatch attempts all land here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessLogEntry {
    pub id: String,
    pub timestamp: i64,
    pub kind: AccessLogKind,
    pub license_id: String,
    pub identity: String,
    /// The fingerprint the attempt came from, not the bound one.
    pub device_id: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}
