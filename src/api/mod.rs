// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    company::CompanyRegistration,
    identity::{IdentityVerificationResult, PixCharge, VerificationState},
    models::{
        CiphertextResponse, CompanyResponse, CreatePixChargeRequest, CreateRequestBody,
        CreateRequestResponse, PixChargeResponse, PublicKeyResponse, RequestListResponse,
        VerificationStatusResponse, VerifyPixRequest,
    },
    state::AppState,
    storage::{AccessKind, RequestStatus, StoredRequest},
};

pub mod company;
pub mod health;
pub mod identity;
pub mod requests;

pub fn router(state: AppState) -> Router {
    let v1_routes = Router::new()
        .route("/pix/charges", post(identity::create_pix_charge))
        .route("/pix/verify", post(identity::verify_pix))
        .route(
            "/identity/verification/{request_id}",
            get(identity::verification_status),
        )
        .route("/requests", post(requests::create_request))
        .route(
            "/requests/{request_id}/ciphertext",
            get(requests::get_ciphertext),
        )
        .route("/company", post(company::register_company))
        .route("/company/public-key", get(company::get_public_key))
        .route("/company/requests", get(company::list_requests))
        .with_state(state.clone());

    let health_routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .with_state(state);

    Router::new()
        .nest("/v1", v1_routes)
        .merge(health_routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        identity::create_pix_charge,
        identity::verify_pix,
        identity::verification_status,
        requests::create_request,
        requests::get_ciphertext,
        company::register_company,
        company::get_public_key,
        company::list_requests,
        health::health,
        health::liveness,
        health::readiness
    ),
    components(
        schemas(
            CreatePixChargeRequest,
            PixCharge,
            PixChargeResponse,
            VerifyPixRequest,
            IdentityVerificationResult,
            VerificationState,
            VerificationStatusResponse,
            AccessKind,
            RequestStatus,
            StoredRequest,
            CreateRequestBody,
            CreateRequestResponse,
            CiphertextResponse,
            CompanyRegistration,
            CompanyResponse,
            PublicKeyResponse,
            RequestListResponse,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse
        )
    ),
    tags(
        (name = "Identity", description = "Mock PIX charge and CPF verification"),
        (name = "Requests", description = "Sealed privacy request submission"),
        (name = "Company", description = "Company key registration and dashboard"),
        (name = "Health", description = "Liveness and readiness probes")
    )
)]
struct ApiDoc;
