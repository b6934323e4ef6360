//! Dev-only license provisioning. Licenses normally arrive out-of-band;
//! this endpoint is the out-of-band channel for local development and is
//! only routed when KEYGATE_ENV=dev.

use axum::extract::State;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::db::{queries, AppState};
use crate::engine::{expiry, keyparse};
use crate::error::{AppError, Result};
use crate::extractors::Json;
use crate::models::CreateLicense;

#[derive(Debug, Deserialize)]
pub struct CreateDevLicenseRequest {
    pub key: String,
    /// Directly stored expiry date (`YYYY-MM-DD`), for keys without an
    /// encoded duration
    #[serde(default)]
    pub expires_at: Option<String>,
    #[serde(default)]
    pub inactive: bool,
}

#[derive(Debug, Serialize)]
pub struct CreateDevLicenseResponse {
    pub id: String,
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_days: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
}

pub async fn create_dev_license(
    State(state): State<AppState>,
    Json(req): Json<CreateDevLicenseRequest>,
) -> Result<Json<CreateDevLicenseResponse>> {
    let key = req.key.trim();
    if key.is_empty() {
        return Err(AppError::BadRequest("key is required".into()));
    }

    let expires_on = match &req.expires_at {
        Some(date) => {
            let parsed = date.parse::<NaiveDate>().map_err(|_| {
                AppError::BadRequest("expires_at must be a YYYY-MM-DD date".into())
            })?;
            Some(expiry::day_from_date(parsed))
        }
        None => None,
    };

    let conn = state.db.get()?;
    if queries::get_license_by_key(&conn, key)?.is_some() {
        return Err(AppError::Conflict("License already exists for this key".into()));
    }

    let record = queries::create_license(
        &conn,
        key,
        &CreateLicense {
            expires_on,
            inactive: req.inactive,
        },
    )?;

    Ok(Json(CreateDevLicenseResponse {
        id: record.id,
        active: record.active,
        duration_days: keyparse::parse_duration_days(key, &state.license_key_prefix),
        expires_at: record.expires_on.map(expiry::format_day),
    }))
}
