//! POST /verify - the primary gate: evaluate a login attempt against the
//! license store and persist whatever the engine decided.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::db::{queries, AppState};
use crate::engine::{self, expiry, keyparse, Attempt, Outcome};
use crate::error::{AppError, Result};
use crate::extractors::Json;
use crate::models::AccessLogKind;
use crate::util::{extract_request_info, normalize_identity};

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    /// Username or email of the caller
    pub identity: String,
    pub license_key: String,
    /// Hardware fingerprint (HWID)
    pub device_id: String,
}

/// Response shape shared by /verify, /register and /login.
#[derive(Debug, Serialize)]
pub struct GateResponse {
    pub allowed: bool,
    /// Stable snake_case reason code, safe to branch on
    pub reason: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_days: Option<u32>,
}

pub async fn verify_device(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<VerifyRequest>,
) -> Response {
    let identity = normalize_identity(&req.identity);
    let license_key = req.license_key.trim();
    let device_id = req.device_id.trim();

    // Input validation happens before any store access.
    if identity.is_empty() || license_key.is_empty() || device_id.is_empty() {
        return denial(
            StatusCode::BAD_REQUEST,
            "missing_field",
            "identity, license_key and device_id are required",
        );
    }

    let result = state
        .db
        .get()
        .map_err(AppError::from)
        .and_then(|conn| run_gate(&state, &conn, &headers, &identity, license_key, device_id));

    match result {
        Ok(gate) => outcome_response(&gate.outcome),
        Err(e) => store_error_response(e),
    }
}

pub(crate) struct GateResult {
    pub outcome: Outcome,
    pub license_id: Option<String>,
}

/// Fetch the record, run the engine, persist the decision.
///
/// The access-log append is fire-and-forget: a failed append is surfaced
/// to operational logging but never changes the outcome.
pub(crate) fn run_gate(
    state: &AppState,
    conn: &Connection,
    headers: &HeaderMap,
    identity: &str,
    license_key: &str,
    device_id: &str,
) -> Result<GateResult> {
    let key_duration = keyparse::parse_duration_days(license_key, &state.license_key_prefix);
    let record = queries::get_license_by_key(conn, license_key)?;

    let attempt = Attempt {
        identity,
        device_id,
        now: Utc::now().timestamp(),
    };
    let decision = engine::evaluate(record.as_ref(), &attempt, key_duration);

    if let Some(record) = &record {
        if let Some(update) = &decision.update {
            queries::apply_decision(conn, &record.id, update)?;
        }
        if let Some(kind) = decision.log {
            append_log_best_effort(state, headers, kind, &record.id, identity, device_id);
        }
    }

    Ok(GateResult {
        outcome: decision.outcome,
        license_id: record.map(|r| r.id),
    })
}

pub(crate) fn append_log_best_effort(
    state: &AppState,
    headers: &HeaderMap,
    kind: AccessLogKind,
    license_id: &str,
    identity: &str,
    device_id: &str,
) {
    let (ip, user_agent) = extract_request_info(headers);
    match state.audit.get() {
        Ok(audit_conn) => {
            if let Err(e) = queries::append_access_log(
                &audit_conn,
                state.access_log_enabled,
                kind,
                license_id,
                identity,
                device_id,
                ip.as_deref(),
                user_agent.as_deref(),
            ) {
                tracing::warn!("Failed to append {} access log entry: {}", kind.as_ref(), e);
            }
        }
        Err(e) => {
            tracing::warn!("Failed to get access log connection: {}", e);
        }
    }
}

pub(crate) fn outcome_response(outcome: &Outcome) -> Response {
    let (status, message, expires_on, duration_days) = match outcome {
        Outcome::BoundOk {
            expires_on,
            duration_days,
        } => (
            StatusCode::OK,
            "Device registered (first activation)".to_string(),
            *expires_on,
            *duration_days,
        ),
        Outcome::LoginOk {
            expires_on,
            duration_days,
        } => (
            StatusCode::OK,
            "Device authorized".to_string(),
            *expires_on,
            *duration_days,
        ),
        Outcome::InvalidKey => (
            StatusCode::NOT_FOUND,
            "License key not found".to_string(),
            None,
            None,
        ),
        Outcome::Inactive => (
            StatusCode::FORBIDDEN,
            "License is inactive".to_string(),
            None,
            None,
        ),
        Outcome::Expired { expired_on } => (
            StatusCode::FORBIDDEN,
            format!("License expired on {}", expiry::format_day(*expired_on)),
            Some(*expired_on),
            None,
        ),
        Outcome::DeviceMismatch => (
            StatusCode::FORBIDDEN,
            "License is bound to a different device".to_string(),
            None,
            None,
        ),
        Outcome::IdentityMismatch => (
            StatusCode::FORBIDDEN,
            "License is bound to a different user".to_string(),
            None,
            None,
        ),
        Outcome::StoreError => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "License store unavailable".to_string(),
            None,
            None,
        ),
    };

    let body = GateResponse {
        allowed: outcome.allowed(),
        reason: outcome.reason(),
        message,
        expires_at: expires_on.map(expiry::format_day),
        duration_days,
    };

    (status, axum::Json(body)).into_response()
}

pub(crate) fn denial(status: StatusCode, reason: &'static str, message: &str) -> Response {
    let body = GateResponse {
        allowed: false,
        reason,
        message: message.to_string(),
        expires_at: None,
        duration_days: None,
    };
    (status, axum::Json(body)).into_response()
}

/// Normalize infrastructure failures to the indeterminate `store_error`
/// outcome: fail closed, but report distinctly from policy denials.
pub(crate) fn store_error_response(e: AppError) -> Response {
    if e.is_store_failure() {
        tracing::error!("Gate evaluation failed, store unavailable: {}", e);
        outcome_response(&Outcome::StoreError)
    } else {
        e.into_response()
    }
}
