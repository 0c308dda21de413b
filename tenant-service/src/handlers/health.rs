use axum::{extract::State, response::IntoResponse, Json};
use serde_json::json;

use crate::startup::AppState;

pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": state.config.service_name,
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Build information plus the number of bootstrap tenants loaded.
pub async fn info(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "service": state.config.service_name,
        "version": env!("CARGO_PKG_VERSION"),
        "tenant_header": state.config.common.tenancy.header_name,
        "bootstrap_tenants": state.config.common.tenancy.bootstrap_tenants.len()
    }))
}
