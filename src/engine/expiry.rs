//! Calendar-day expiry evaluation.
//!
//! All expiry math happens on UTC epoch days (unix seconds divided by
//! 86400, floored). Stored timestamps and "now" are both truncated to the
//! same day grid, so serialization format and server timezone can never
//! shift an expiry by a few hours. Dates become `YYYY-MM-DD` strings only
//! at the API boundary.

use chrono::{Datelike, NaiveDate};

use crate::models::LicenseRecord;

pub const SECONDS_PER_DAY: i64 = 86_400;

/// Days from 0001-01-01 (CE) to 1970-01-01.
const EPOCH_DAYS_FROM_CE: i64 = 719_163;

/// Truncate a unix timestamp to its UTC epoch day.
pub fn epoch_day(unix_secs: i64) -> i64 {
    unix_secs.div_euclid(SECONDS_PER_DAY)
}

/// Epoch day of a calendar date.
pub fn day_from_date(date: NaiveDate) -> i64 {
    i64::from(date.num_days_from_ce()) - EPOCH_DAYS_FROM_CE
}

/// Calendar date of an epoch day, if representable.
pub fn date_from_day(day: i64) -> Option<NaiveDate> {
    i32::try_from(day + EPOCH_DAYS_FROM_CE)
        .ok()
        .and_then(NaiveDate::from_num_days_from_ce_opt)
}

/// `YYYY-MM-DD` rendering of an epoch day for API responses.
pub fn format_day(day: i64) -> String {
    match date_from_day(day) {
        Some(date) => date.to_string(),
        None => day.to_string(),
    }
}

/// The epoch day on which a record stops being valid, if it expires at all.
///
/// A directly stored expiry date wins; otherwise the day is derived from
/// the activation timestamp plus the duration (stored on the record at
/// binding time, or parsed out of the key for records not yet bound).
/// Records with no duration and no stored expiry never expire here; only
/// the `active` flag can block them.
pub fn effective_expiry_day(record: &LicenseRecord, key_duration: Option<u32>) -> Option<i64> {
    if let Some(day) = record.expires_on {
        return Some(day);
    }
    let duration = record.duration_days.or(key_duration)?;
    let activated_at = record.activated_at?;
    Some(epoch_day(activated_at) + i64::from(duration))
}

/// A license is valid through the day before its expiry day: activation on
/// day `T` with duration `D` allows days `T..T+D-1` and expires on `T+D`.
pub fn is_expired(expiry_day: i64, now: i64) -> bool {
    epoch_day(now) >= expiry_day
}
