// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::crypto::ensure_initialized;
use crate::state::AppState;

/// Component-level readiness report.
#[derive(Debug, Serialize, ToSchema)]
pub struct ReadyResponse {
    /// "ok" when every required component is usable, otherwise "degraded".
    pub status: String,
    pub checks: HealthChecks,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthChecks {
    pub service: String,
    /// "ok" or "unavailable".
    pub storage: String,
    /// Sealed-box self-test result: "ok" or "unavailable".
    pub crypto: String,
    /// "registered", "unregistered" or "unknown". Informational only.
    pub company: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

const OK: &str = "ok";
const UNAVAILABLE: &str = "unavailable";

fn storage_status(state: &AppState) -> &'static str {
    match state.storage.health_check() {
        Ok(()) => OK,
        Err(e) => {
            tracing::warn!(error = %e, "Storage health check failed");
            UNAVAILABLE
        }
    }
}

fn crypto_status() -> &'static str {
    if ensure_initialized().is_ok() {
        OK
    } else {
        UNAVAILABLE
    }
}

fn company_status(state: &AppState) -> &'static str {
    match state.storage.active_company() {
        Ok(Some(_)) => "registered",
        Ok(None) => "unregistered",
        Err(_) => "unknown",
    }
}

/// Full component report. 503 when storage or crypto is unusable.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "All components usable", body = ReadyResponse),
        (status = 503, description = "A required component is unusable", body = ReadyResponse)
    )
)]
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    let storage = storage_status(&state);
    let crypto = crypto_status();
    let ready = storage == OK && crypto == OK;

    let (code, status) = if ready {
        (StatusCode::OK, OK)
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    let report = ReadyResponse {
        status: status.to_string(),
        checks: HealthChecks {
            service: OK.to_string(),
            storage: storage.to_string(),
            crypto: crypto.to_string(),
            company: company_status(&state).to_string(),
        },
    };
    (code, Json(report))
}

/// Process liveness. Never touches storage.
#[utoipa::path(
    get,
    path = "/health/live",
    tag = "Health",
    responses((status = 200, description = "Process is up", body = HealthResponse))
)]
pub async fn liveness() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: OK.to_string(),
    })
}

#[utoipa::path(
    get,
    path = "/health/ready",
    tag = "Health",
    responses(
        (status = 200, description = "Ready for traffic", body = ReadyResponse),
        (status = 503, description = "Not ready", body = ReadyResponse)
    )
)]
pub async fn readiness(state: State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    health(state).await
}
