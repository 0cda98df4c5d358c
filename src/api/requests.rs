// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{Path, State},
    Json,
};
use base64ct::{Base64, Encoding};

use crate::{
    audit_log,
    error::ApiError,
    models::{CiphertextResponse, CreateRequestBody, CreateRequestResponse},
    pipeline::{RequestSubmitter, SubmitRequest},
    state::AppState,
    storage::{AuditEvent, AuditEventType},
};

const SEALED_BOX_ALGORITHM: &str = "crypto_box_seal";

/// Seal and store a privacy request.
///
/// Form fields, the verified CPF and account, and the company key are all
/// checked before the verification is spent. Only a storage failure after
/// that point uses it up without storing a request.
#[utoipa::path(
    post,
    path = "/v1/requests",
    request_body = CreateRequestBody,
    tag = "Requests",
    responses(
        (status = 200, body = CreateRequestResponse),
        (status = 400, description = "Invalid form fields"),
        (status = 403, description = "Identity not verified or CPF mismatch"),
        (status = 404, description = "No company registered or unknown verification"),
        (status = 409, description = "Verification already used")
    )
)]
pub async fn create_request(
    State(state): State<AppState>,
    Json(body): Json<CreateRequestBody>,
) -> Result<Json<CreateRequestResponse>, ApiError> {
    let verification_id = body.verification_id;
    let request = SubmitRequest {
        kind: body.kind,
        reason: body.reason,
        description: body.description,
        cpf: body.cpf,
        user_email: body.user_email,
    };
    request.validate()?;
    let submitter = RequestSubmitter::new(state.storage.as_ref(), &state.cpf_hasher);

    let pending = state.gate.verified_identity(&verification_id)?;
    let submitted = submitter.check(&pending, &request).and_then(|()| {
        let identity = state.gate.consume(&verification_id)?;
        submitter.submit(&identity, request)
    });

    let receipt = match submitted {
        Ok(receipt) => receipt,
        Err(e) => {
            audit_log!(
                state.audit_storage(),
                AuditEvent::new(AuditEventType::RequestRejected)
                    .with_actor(&verification_id)
                    .failed(e.to_string())
            );
            return Err(e.into());
        }
    };

    audit_log!(
        state.audit_storage(),
        AuditEvent::new(AuditEventType::RequestSubmitted)
            .with_actor(&verification_id)
            .with_resource("request", &receipt.request_id)
            .with_details(serde_json::json!({
                "companyId": receipt.company_id,
                "ciphertextLen": receipt.ciphertext_len,
            }))
    );

    Ok(Json(CreateRequestResponse {
        request_id: receipt.request_id,
        encrypted: receipt.encrypted,
    }))
}

/// Fetch the sealed blob for a request. Decryption happens client-side.
#[utoipa::path(
    get,
    path = "/v1/requests/{request_id}/ciphertext",
    params(("request_id" = String, Path, description = "Request id")),
    tag = "Requests",
    responses(
        (status = 200, body = CiphertextResponse),
        (status = 404, description = "Request or ciphertext not found")
    )
)]
pub async fn get_ciphertext(
    State(state): State<AppState>,
    Path(request_id): Path<String>,
) -> Result<Json<CiphertextResponse>, ApiError> {
    let metadata = state
        .storage
        .get_request_metadata(&request_id)?
        .ok_or_else(|| ApiError::not_found("Request not found"))?;
    let blob = state
        .storage
        .get_ciphertext(&request_id)?
        .ok_or_else(|| ApiError::not_found("Ciphertext not found"))?;
    let company_public_key = state.storage.get_company_public_key()?;

    audit_log!(
        state.audit_storage(),
        AuditEvent::new(AuditEventType::CiphertextRetrieved)
            .with_actor(&metadata.company_id)
            .with_resource("request", &request_id)
    );

    Ok(Json(CiphertextResponse {
        request_id,
        ciphertext: Base64::encode_string(&blob),
        algorithm: SEALED_BOX_ALGORITHM.to_string(),
        company_public_key,
    }))
}
