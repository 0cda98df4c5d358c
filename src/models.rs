// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Request and response bodies for the REST API. All types derive
//! `Serialize`/`Deserialize` and `ToSchema` for JSON handling and OpenAPI
//! documentation. Field names are camelCase on the wire.
//!
//! ## Model Categories
//!
//! - **PIX / identity**: mock charges and CPF verification
//! - **Requests**: sealed request submission and ciphertext retrieval
//! - **Company**: registration and the dashboard views

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::identity::{PixCharge, VerificationState};
use crate::storage::{AccessKind, StoredCompany, StoredRequest};

// =============================================================================
// PIX / Identity Models
// =============================================================================

/// Request body for creating a mock PIX charge.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreatePixChargeRequest {
    /// Amount in BRL. Must be positive.
    pub amount: f64,
    #[serde(default)]
    pub description: String,
}

/// A created charge plus the identity instructions for its attempt.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PixChargeResponse {
    #[serde(flatten)]
    pub charge: PixCharge,
    pub instructions: String,
}

/// Request body for confirming a charge with a CPF.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPixRequest {
    pub transaction_id: String,
    pub cpf: String,
    /// Account whose registered CPF is compared in real mode.
    #[serde(default)]
    pub user_email: Option<String>,
}

/// Current state of a verification attempt.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerificationStatusResponse {
    pub request_id: String,
    pub state: VerificationState,
    pub within_window: bool,
}

// =============================================================================
// Request Models
// =============================================================================

/// Request body for submitting a privacy request.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateRequestBody {
    #[serde(rename = "type")]
    pub kind: AccessKind,
    pub reason: String,
    #[serde(default)]
    pub description: String,
    pub cpf: String,
    /// Transaction id of the verified PIX charge.
    pub verification_id: String,
    #[serde(default)]
    pub user_email: Option<String>,
}

/// Response to a submitted request.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateRequestResponse {
    pub request_id: String,
    pub encrypted: bool,
}

/// A sealed blob as served to the company's browser.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CiphertextResponse {
    pub request_id: String,
    /// Base64 `crypto_box_seal` output.
    pub ciphertext: String,
    pub algorithm: String,
    pub company_public_key: String,
}

// =============================================================================
// Company Models
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompanyResponse {
    pub company_id: String,
    pub name: String,
    pub public_key: String,
    pub fingerprint: String,
    pub registered_at: DateTime<Utc>,
}

impl From<StoredCompany> for CompanyResponse {
    fn from(company: StoredCompany) -> Self {
        Self {
            company_id: company.company_id,
            name: company.name,
            public_key: company.public_key,
            fingerprint: company.fingerprint,
            registered_at: company.registered_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PublicKeyResponse {
    pub public_key: String,
    pub fingerprint: String,
}

/// Dashboard listing: metadata only, never ciphertext contents.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RequestListResponse {
    pub requests: Vec<StoredRequest>,
}
