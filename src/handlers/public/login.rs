//! POST /login - account login with license re-validation.
//!
//! Order of checks: account exists, pinned device matches, password
//! verifies, then the license gate runs again in-process. The re-run
//! catches mid-lifetime expiry or deactivation without any network hop.
//! A foreign device revokes the account's sessions before denying.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::Response,
};
use serde::Deserialize;

use crate::crypto;
use crate::db::{queries, AppState};
use crate::error::Result;
use crate::extractors::Json;
use crate::models::AccessLogKind;
use crate::util::normalize_identity;

use super::verify::{append_log_best_effort, denial, outcome_response, run_gate, store_error_response};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub identity: String,
    pub password: String,
    pub license_key: String,
    pub device_id: String,
}

pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<LoginRequest>,
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

    match login_inner(&state, &headers, &identity, &req.password, license_key, device_id) {
        Ok(response) => response,
        Err(e) => store_error_response(e),
    }
}

fn login_inner(
    state: &AppState,
    headers: &HeaderMap,
    identity: &str,
    password: &str,
    license_key: &str,
    device_id: &str,
) -> Result<Response> {
    let conn = state.db.get()?;

    let user = match queries::get_user_by_identity(&conn, identity)? {
        Some(user) => user,
        None => {
            return Ok(denial(
                StatusCode::NOT_FOUND,
                "unknown_identity",
                "Unknown identity",
            ));
        }
    };

    // Device check comes before everything else about the account: a login
    // from a foreign machine invalidates whatever sessions are out there.
    if user.device_id != device_id {
        if let Err(e) = queries::revoke_user_sessions(&conn, &user.id) {
            tracing::warn!("Failed to revoke sessions for {}: {}", user.id, e);
        }
        append_log_best_effort(
            state,
            headers,
            AccessLogKind::HwidMismatch,
            &user.license_id,
            identity,
            device_id,
        );
        return Ok(denial(
            StatusCode::FORBIDDEN,
            "device_mismatch",
            "Account is bound to a different device",
        ));
    }

    if !crypto::verify_password(password, &user.password_hash) {
        return Ok(denial(
            StatusCode::UNAUTHORIZED,
            "bad_password",
            "Invalid credentials",
        ));
    }

    let gate = run_gate(state, &conn, headers, identity, license_key, device_id)?;
    Ok(outcome_response(&gate.outcome))
}
