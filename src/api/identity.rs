// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Identity gate endpoints: mock PIX charge, CPF confirmation, attempt state.

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;

use crate::{
    audit_log,
    error::ApiError,
    identity::{GateError, IdentityVerificationResult},
    models::{
        CreatePixChargeRequest, PixChargeResponse, VerificationStatusResponse, VerifyPixRequest,
    },
    state::AppState,
    storage::{AuditEvent, AuditEventType},
};

/// Create a mock PIX charge and open a verification attempt for it.
///
/// The charge's transaction id is the attempt id used by the verify and
/// submit endpoints.
#[utoipa::path(
    post,
    path = "/v1/pix/charges",
    request_body = CreatePixChargeRequest,
    tag = "Identity",
    responses(
        (status = 200, body = PixChargeResponse),
        (status = 400, description = "Amount is not positive")
    )
)]
pub async fn create_pix_charge(
    State(state): State<AppState>,
    Json(request): Json<CreatePixChargeRequest>,
) -> Result<Json<PixChargeResponse>, ApiError> {
    let charge = state
        .pix
        .create_charge(request.amount, &request.description)?;
    let instructions = state.gate.issue(&charge.transaction_id);

    audit_log!(
        state.audit_storage(),
        AuditEventType::PixChargeCreated,
        "verification",
        &charge.transaction_id
    );

    Ok(Json(PixChargeResponse {
        charge,
        instructions: instructions.instructions,
    }))
}

/// Confirm a charge by entering the CPF.
///
/// A rejected CPF returns 200 with `success: false`; the attempt is then
/// spent and a new charge is needed.
#[utoipa::path(
    post,
    path = "/v1/pix/verify",
    request_body = VerifyPixRequest,
    tag = "Identity",
    responses(
        (status = 200, body = IdentityVerificationResult),
        (status = 404, description = "Unknown transaction"),
        (status = 409, description = "Attempt already used"),
        (status = 410, description = "Verification window elapsed")
    )
)]
pub async fn verify_pix(
    State(state): State<AppState>,
    Json(request): Json<VerifyPixRequest>,
) -> Result<Json<IdentityVerificationResult>, ApiError> {
    let txid = &request.transaction_id;
    let verified = match request.user_email.as_deref() {
        Some(email) => {
            let account_cpf = state.accounts.registered_cpf(email);
            state
                .gate
                .verify_account(txid, &request.cpf, email, account_cpf.as_deref())
        }
        None => state.gate.verify(txid, &request.cpf, None),
    };

    let result = verified
        .inspect_err(|e| {
            let event_type = match e {
                GateError::VerificationExpired => AuditEventType::IdentityVerificationExpired,
                _ => AuditEventType::IdentityVerificationFailed,
            };
            audit_log!(
                state.audit_storage(),
                AuditEvent::new(event_type)
                    .with_resource("verification", &request.transaction_id)
                    .failed(e.to_string())
            );
        })?;

    let event = if result.success {
        AuditEvent::new(AuditEventType::IdentityVerified)
    } else {
        AuditEvent::new(AuditEventType::IdentityVerificationFailed).failed(result.message.clone())
    };
    audit_log!(
        state.audit_storage(),
        event.with_resource("verification", &request.transaction_id)
    );

    Ok(Json(result))
}

#[utoipa::path(
    get,
    path = "/v1/identity/verification/{request_id}",
    params(("request_id" = String, Path, description = "PIX transaction id")),
    tag = "Identity",
    responses(
        (status = 200, body = VerificationStatusResponse),
        (status = 404, description = "Unknown or pruned attempt")
    )
)]
pub async fn verification_status(
    State(state): State<AppState>,
    Path(request_id): Path<String>,
) -> Result<Json<VerificationStatusResponse>, ApiError> {
    let now = Utc::now();
    let verification_state = state
        .gate
        .state_at(&request_id, now)
        .ok_or_else(|| ApiError::not_found("Verification not found"))?;

    Ok(Json(VerificationStatusResponse {
        within_window: state.gate.within_window(&request_id, now),
        request_id,
        state: verification_state,
    }))
}
