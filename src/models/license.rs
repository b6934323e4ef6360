use serde::{Deserialize, Serialize};

/// A license row. Keyed by the salted hash of the license key; the raw key
/// is never stored.
///
/// Binding is one-way: `bound_device_id` and `owner_identity` go from
/// unset to set exactly once and are never rewritten by the engine.
/// `first_activated_at` is write-once; `activated_at` is refreshed on
/// (re)binding and anchors the expiry window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LicenseRecord {
    pub id: String,
    #[serde(skip_serializing)]
    pub key_hash: String,
    /// `false` permanently blocks use, regardless of every other field.
    pub active: bool,
    pub bound_device_id: Option<String>,
    /// Lowercased username or email fixed at first binding.
    pub owner_identity: Option<String>,
    pub activated_at: Option<i64>,
    pub first_activated_at: Option<i64>,
    pub last_login_at: Option<i64>,
    /// Validity window parsed from the key structure, persisted at binding.
    pub duration_days: Option<u32>,
    /// First UTC epoch day on which the license is no longer valid.
    pub expires_on: Option<i64>,
    /// When expiry was first detected (unix seconds).
    pub expired_at: Option<i64>,
    pub created_at: i64,
}

impl LicenseRecord {
    pub fn is_bound(&self) -> bool {
        self.bound_device_id.is_some()
    }
}

/// Provisioning input. Licenses are created out-of-band (dev endpoint,
/// `--seed`); the gate itself only reads and conditionally updates them.
#[derive(Debug, Clone, Default)]
pub struct CreateLicense {
    /// Directly stored expiry day, for keys without an encoded duration.
    pub expires_on: Option<i64>,
    pub inactive: bool,
}
