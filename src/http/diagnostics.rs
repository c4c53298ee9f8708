//! Informational endpoints answered by the relay itself.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::http::response::RelayError;
use crate::http::server::AppState;

#[derive(Debug, Serialize)]
pub struct RelayInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub services: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub services: Vec<String>,
}

pub async fn get_info(State(state): State<AppState>) -> Json<RelayInfo> {
    Json(RelayInfo {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        services: state.services.names().map(str::to_string).collect(),
    })
}

pub async fn get_health(State(state): State<AppState>) -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "healthy",
        services: state.services.names().map(str::to_string).collect(),
    })
}

/// Fallback for paths outside every proxy route.
pub async fn no_route() -> RelayError {
    let err = RelayError::NoRoute;
    err.log();
    err
}
