// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, Json};

use crate::{
    audit_log,
    company::{register_company as register, CompanyRegistration},
    error::ApiError,
    models::{CompanyResponse, PublicKeyResponse, RequestListResponse},
    pipeline::PipelineError,
    state::AppState,
    storage::{AuditEvent, AuditEventType},
};

/// Register the deployment's company with its public key.
///
/// The private key never reaches this endpoint.
#[utoipa::path(
    post,
    path = "/v1/company",
    request_body = CompanyRegistration,
    tag = "Company",
    responses(
        (status = 200, body = CompanyResponse),
        (status = 400, description = "Missing name or malformed key"),
        (status = 409, description = "A company is already registered")
    )
)]
pub async fn register_company(
    State(state): State<AppState>,
    Json(registration): Json<CompanyRegistration>,
) -> Result<Json<CompanyResponse>, ApiError> {
    let company = register(state.storage.as_ref(), &registration).inspect_err(|e: &PipelineError| {
        audit_log!(
            state.audit_storage(),
            AuditEvent::new(AuditEventType::CompanyRegistrationRejected).failed(e.to_string())
        );
    })?;

    audit_log!(
        state.audit_storage(),
        AuditEvent::new(AuditEventType::CompanyRegistered)
            .with_resource("company", &company.company_id)
            .with_details(serde_json::json!({ "fingerprint": company.fingerprint }))
    );

    Ok(Json(company.into()))
}

#[utoipa::path(
    get,
    path = "/v1/company/public-key",
    tag = "Company",
    responses(
        (status = 200, body = PublicKeyResponse),
        (status = 404, description = "No company registered")
    )
)]
pub async fn get_public_key(
    State(state): State<AppState>,
) -> Result<Json<PublicKeyResponse>, ApiError> {
    let company = state
        .storage
        .active_company()?
        .ok_or_else(|| ApiError::not_found("No company registered"))?;

    Ok(Json(PublicKeyResponse {
        public_key: company.public_key,
        fingerprint: company.fingerprint,
    }))
}

/// Dashboard listing for the active company. Metadata only.
#[utoipa::path(
    get,
    path = "/v1/company/requests",
    tag = "Company",
    responses(
        (status = 200, body = RequestListResponse),
        (status = 404, description = "No company registered")
    )
)]
pub async fn list_requests(
    State(state): State<AppState>,
) -> Result<Json<RequestListResponse>, ApiError> {
    let company = state
        .storage
        .active_company()?
        .ok_or_else(|| ApiError::not_found("No company registered"))?;
    let requests = state.storage.list_requests_for_company(&company.company_id)?;

    audit_log!(
        state.audit_storage(),
        AuditEventType::RequestsListed,
        "company",
        &company.company_id
    );

    Ok(Json(RequestListResponse { requests }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::company::CompanyKeyMaterial;
    use axum::http::StatusCode;

    #[tokio::test]
    async fn register_then_fetch_public_key() {
        let state = AppState::default();
        let material = CompanyKeyMaterial::generate("Acme").unwrap();

        let Json(company) = register_company(State(state.clone()), Json(material.registration()))
            .await
            .expect("registered");
        assert_eq!(company.fingerprint, material.fingerprint());

        let Json(key) = get_public_key(State(state)).await.unwrap();
        assert_eq!(key.public_key, material.key_pair.public_key_base64());
        assert_eq!(key.fingerprint, material.fingerprint());
    }

    #[tokio::test]
    async fn second_registration_conflicts() {
        let state = AppState::default();
        let first = CompanyKeyMaterial::generate("Acme").unwrap();
        let second = CompanyKeyMaterial::generate("Other").unwrap();

        register_company(State(state.clone()), Json(first.registration()))
            .await
            .unwrap();
        let result = register_company(State(state), Json(second.registration())).await;
        assert_eq!(result.unwrap_err().status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn malformed_key_is_bad_request() {
        let result = register_company(
            State(AppState::default()),
            Json(CompanyRegistration {
                name: "Acme".to_string(),
                public_key: "c2hvcnQ=".to_string(),
            }),
        )
        .await;
        assert_eq!(result.unwrap_err().status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn listing_requires_company() {
        let result = list_requests(State(AppState::default())).await;
        assert_eq!(result.unwrap_err().status, StatusCode::NOT_FOUND);

        let state = AppState::default();
        register_company(
            State(state.clone()),
            Json(CompanyKeyMaterial::generate("Acme").unwrap().registration()),
        )
        .await
        .unwrap();
        let Json(list) = list_requests(State(state)).await.unwrap();
        assert!(list.requests.is_empty());
    }
}
