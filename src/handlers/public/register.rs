//! POST /register - create an account bound to a license and a device.
//!
//! Registration only succeeds once the license gate itself allows the
//! attempt, so the account's pinned device is always the one the license
//! got bound to.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::Response,
};
use serde::Deserialize;

use crate::crypto;
use crate::db::{queries, AppState};
use crate::error::{AppError, Result};
use crate::extractors::Json;
use crate::util::normalize_identity;

use super::verify::{denial, outcome_response, run_gate, store_error_response};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub identity: String,
    pub password: String,
    pub license_key: String,
    pub device_id: String,
}

pub async fn register(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<RegisterRequest>,
) -> Response {
    let identity = normalize_identity(&req.identity);
    let license_key = req.license_key.trim();
    let device_id = req.device_id.trim();

    if identity.is_empty() || req.password.is_empty() || license_key.is_empty() || device_id.is_empty()
    {
        return denial(
            StatusCode::BAD_REQUEST,
            "missing_field",
            "identity, password, license_key and device_id are required",
        );
    }

    match register_inner(&state, &headers, &identity, &req.password, license_key, device_id) {
        Ok(response) => response,
        Err(e) => store_error_response(e),
    }
}

fn register_inner(
    state: &AppState,
    headers: &HeaderMap,
    identity: &str,
    password: &str,
    license_key: &str,
    device_id: &str,
) -> Result<Response> {
    let conn = state.db.get()?;

    if queries::get_user_by_identity(&conn, identity)?.is_some() {
        return Ok(denial(
            StatusCode::CONFLICT,
            "identity_taken",
            "Identity is already registered",
        ));
    }

    // The license decides: creating the account requires a BOUND_OK or
    // LOGIN_OK from the gate.
    let gate = run_gate(state, &conn, headers, identity, license_key, device_id)?;
    if !gate.outcome.allowed() {
        return Ok(outcome_response(&gate.outcome));
    }

    let license_id = gate
        .license_id
        .ok_or_else(|| AppError::Internal("License row missing after allowed outcome".into()))?;
    let password_hash = crypto::hash_password(password)?;
    queries::create_user(&conn, identity, &password_hash, device_id, &license_id)?;

    Ok(outcome_response(&gate.outcome))
}
