mod login;
mod register;
mod verify;

pub use login::*;
pub use register::*;
pub use verify::*;

use axum::{
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use crate::config::RateLimitConfig;
use crate::db::AppState;
use crate::rate_limit;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub fn router(limits: RateLimitConfig) -> Router<AppState> {
    let standard = Router::new()
        .route("/verify", post(verify_device))
        .route("/register", post(register))
        .route("/login", post(login))
        .route_layer(rate_limit::standard_layer(limits.standard_rpm));

    let relaxed = Router::new()
        .route("/health", get(health))
        .route_layer(rate_limit::relaxed_layer(limits.relaxed_rpm));

    Router::new().merge(standard).merge(relaxed)
}
