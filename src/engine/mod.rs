//! The license/device binding engine.
//!
//! A pure decision function over a fetched license record and a login
//! attempt. It never touches the store: the outcome, the record mutation
//! to apply, and the access-log entry to append are returned as data and
//! executed by the caller. This keeps every blocking rule in one place and
//! makes the precedence order directly testable.
//!
//! Check order for an attempt, and why it matters:
//! 1. absent record - invalid key;
//! 2. `active = false` - terminal block, checked before anything else;
//! 3. expiry - before binding, so an expired-but-unbound key cannot be
//!    activated;
//! 4. unbound - bind to this device and identity;
//! 5. device mismatch - before identity mismatch; a key used from a
//!    foreign machine is the more severe anomaly and gets its own log kind;
//! 6. identity mismatch;
//! 7. all checks pass - refresh last login.

pub mod expiry;
pub mod keyparse;

use crate::models::{AccessLogKind, LicenseRecord};

/// A single inbound login attempt, as seen by the engine.
#[derive(Debug, Clone, Copy)]
pub struct Attempt<'a> {
    /// Normalized (trimmed, lowercased) username or email.
    pub identity: &'a str,
    /// Client-supplied hardware fingerprint.
    pub device_id: &'a str,
    /// Unix timestamp of the attempt.
    pub now: i64,
}

/// What the engine decided about an attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// First use: the license was bound to this device and identity.
    BoundOk {
        expires_on: Option<i64>,
        duration_days: Option<u32>,
    },
    /// Replay from the bound device and owner.
    LoginOk {
        expires_on: Option<i64>,
        duration_days: Option<u32>,
    },
    /// No record exists for this key.
    InvalidKey,
    /// Administratively (or previously) deactivated. Terminal.
    Inactive,
    /// The validity window elapsed; carries the expiry day for display.
    Expired { expired_on: i64 },
    /// Bound to a different hardware fingerprint.
    DeviceMismatch,
    /// Right device, wrong account.
    IdentityMismatch,
    /// The store could not answer; indeterminate, callers fail closed.
    StoreError,
}

impl Outcome {
    pub fn allowed(&self) -> bool {
        matches!(self, Outcome::BoundOk { .. } | Outcome::LoginOk { .. })
    }

    /// Stable snake_case reason code for API responses.
    pub fn reason(&self) -> &'static str {
        match self {
            Outcome::BoundOk { .. } => "bound_ok",
            Outcome::LoginOk { .. } => "login_ok",
            Outcome::InvalidKey => "invalid_key",
            Outcome::Inactive => "inactive",
            Outcome::Expired { .. } => "expired",
            Outcome::DeviceMismatch => "device_mismatch",
            Outcome::IdentityMismatch => "identity_mismatch",
            Outcome::StoreError => "store_error",
        }
    }
}

/// Record mutation the caller must persist alongside an outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordUpdate {
    /// First activation: pin device and owner, stamp activation times and
    /// the derived expiry. `first_activated_at` is only written if unset.
    Bind {
        device_id: String,
        identity: String,
        activated_at: i64,
        duration_days: Option<u32>,
        expires_on: Option<i64>,
    },
    /// Expiry detected: clear `active`, stamp `expired_at` once.
    Expire { expired_at: i64 },
    /// Successful replay: refresh `last_login_at` only.
    Touch { last_login_at: i64 },
}

/// Full result of evaluating one attempt.
#[derive(Debug, Clone)]
pub struct Decision {
    pub outcome: Outcome,
    pub update: Option<RecordUpdate>,
    pub log: Option<AccessLogKind>,
}

impl Decision {
    fn terminal(outcome: Outcome) -> Self {
        Decision {
            outcome,
            update: None,
            log: None,
        }
    }
}

/// Evaluate a login attempt against a fetched license record.
///
/// `key_duration` is the duration parsed out of the key string
/// ([`keyparse::parse_duration_days`]); it only matters for records that
/// have not yet stored a duration at binding time.
pub fn evaluate(
    record: Option<&LicenseRecord>,
    attempt: &Attempt<'_>,
    key_duration: Option<u32>,
) -> Decision {
    let record = match record {
        Some(record) => record,
        None => return Decision::terminal(Outcome::InvalidKey),
    };

    // Terminal block. Also what makes the expiry mutation idempotent: a
    // record expired on a previous attempt never reaches the expiry check.
    if !record.active {
        return Decision::terminal(Outcome::Inactive);
    }

    let expiry_day = expiry::effective_expiry_day(record, key_duration);
    if let Some(day) = expiry_day {
        if expiry::is_expired(day, attempt.now) {
            return Decision {
                outcome: Outcome::Expired { expired_on: day },
                update: Some(RecordUpdate::Expire {
                    expired_at: attempt.now,
                }),
                log: None,
            };
        }
    }

    let bound_device = match &record.bound_device_id {
        None => {
            // Unbound: first successful use pins device and owner for good.
            let duration_days = record.duration_days.or(key_duration);
            let expires_on = record
                .expires_on
                .or_else(|| duration_days.map(|d| expiry::epoch_day(attempt.now) + i64::from(d)));
            return Decision {
                outcome: Outcome::BoundOk {
                    expires_on,
                    duration_days,
                },
                update: Some(RecordUpdate::Bind {
                    device_id: attempt.device_id.to_string(),
                    identity: attempt.identity.to_string(),
                    activated_at: attempt.now,
                    duration_days,
                    expires_on,
                }),
                log: Some(AccessLogKind::FirstActivation),
            };
        }
        Some(device) => device,
    };

    if bound_device != attempt.device_id {
        return Decision {
            outcome: Outcome::DeviceMismatch,
            update: None,
            log: Some(AccessLogKind::HwidMismatch),
        };
    }

    if let Some(owner) = &record.owner_identity {
        if owner != attempt.identity {
            return Decision {
                outcome: Outcome::IdentityMismatch,
                update: None,
                log: Some(AccessLogKind::UsernameMismatch),
            };
        }
    }

    Decision {
        outcome: Outcome::LoginOk {
            expires_on: expiry_day,
            duration_days: record.duration_days.or(key_duration),
        },
        update: Some(RecordUpdate::Touch {
            last_login_at: attempt.now,
        }),
        log: None,
    }
}
