// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Identity verification strategies.
//!
//! The platform has no real payment or identity provider; verification is a
//! friction step in front of request submission. Two strategies share the
//! [`IdentityVerifier`] interface and configuration picks one:
//!
//! - [`MockVerifier`] accepts any well-formed CPF (sandbox "instant payment")
//! - [`RealVerifier`] requires the CPF registered to the submitting account

use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::cpf::{normalize_cpf, validate_cpf};
use crate::crypto::hash_data;

pub const MSG_VERIFICATION_FAILED: &str = "CPF verification failed";
pub const MSG_VERIFICATION_FAILED_DETAILS: &str =
    "Please ensure you're using the same CPF associated with your account";
pub const MSG_MOCK_SUCCESS: &str = "Mock verification successful";
pub const MSG_SUCCESS: &str = "Verification successful";

/// Which verification strategy is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum VerifierMode {
    Mock,
    Real,
}

impl FromStr for VerifierMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mock" => Ok(VerifierMode::Mock),
            "real" => Ok(VerifierMode::Real),
            other => Err(format!("unknown verifier mode '{other}' (expected mock or real)")),
        }
    }
}

/// Input to a verification attempt.
#[derive(Debug, Clone, Copy)]
pub struct IdentityCheck<'a> {
    pub request_id: &'a str,
    pub cpf: &'a str,
    /// CPF registered to the submitting account, when known.
    pub account_cpf: Option<&'a str>,
}

/// Outcome of a verification attempt, as shown to the submitter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IdentityVerificationResult {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// Audit-trail hash binding request id, CPF and time. Not a payment proof.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_mock: Option<bool>,
}

impl IdentityVerificationResult {
    pub fn failed() -> Self {
        Self {
            success: false,
            message: MSG_VERIFICATION_FAILED.to_string(),
            details: Some(MSG_VERIFICATION_FAILED_DETAILS.to_string()),
            verification_hash: None,
            is_mock: None,
        }
    }
}

/// Capability shared by the mock and real verification flows.
pub trait IdentityVerifier: Send + Sync {
    fn mode(&self) -> VerifierMode;

    fn verify(&self, check: &IdentityCheck<'_>, now: DateTime<Utc>) -> IdentityVerificationResult;

    /// Whether attempts expire after the verification window.
    fn enforces_window(&self) -> bool {
        self.mode() == VerifierMode::Real
    }
}

/// Sandbox verifier: any well-formed CPF passes.
#[derive(Debug, Default, Clone, Copy)]
pub struct MockVerifier;

impl IdentityVerifier for MockVerifier {
    fn mode(&self) -> VerifierMode {
        VerifierMode::Mock
    }

    fn verify(&self, check: &IdentityCheck<'_>, now: DateTime<Utc>) -> IdentityVerificationResult {
        if !validate_cpf(check.cpf) {
            return IdentityVerificationResult::failed();
        }
        IdentityVerificationResult {
            success: true,
            message: MSG_MOCK_SUCCESS.to_string(),
            details: None,
            verification_hash: Some(verification_hash(
                "MOCK-VERIFICATION",
                check.request_id,
                check.cpf,
                now,
            )),
            is_mock: Some(true),
        }
    }
}

/// Account-bound verifier: the CPF must match the one on the account.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealVerifier;

impl IdentityVerifier for RealVerifier {
    fn mode(&self) -> VerifierMode {
        VerifierMode::Real
    }

    fn verify(&self, check: &IdentityCheck<'_>, now: DateTime<Utc>) -> IdentityVerificationResult {
        if !validate_cpf(check.cpf) {
            return IdentityVerificationResult::failed();
        }

        let submitted = normalize_cpf(check.cpf);
        let matches_account = check
            .account_cpf
            .map(normalize_cpf)
            .is_some_and(|registered| !registered.is_empty() && registered == submitted);

        if !matches_account {
            return IdentityVerificationResult::failed();
        }

        IdentityVerificationResult {
            success: true,
            message: MSG_SUCCESS.to_string(),
            details: None,
            verification_hash: Some(verification_hash(
                "VERIFICATION",
                check.request_id,
                check.cpf,
                now,
            )),
            is_mock: Some(false),
        }
    }
}

fn verification_hash(prefix: &str, request_id: &str, cpf: &str, now: DateTime<Utc>) -> String {
    hash_data(&format!(
        "{prefix}-{request_id}-{cpf}-{}",
        now.timestamp_millis()
    ))
}

/// Build the configured verifier.
pub fn verifier_for(mode: VerifierMode) -> Arc<dyn IdentityVerifier> {
    match mode {
        VerifierMode::Mock => Arc::new(MockVerifier),
        VerifierMode::Real => Arc::new(RealVerifier),
    }
}

/// One-shot verification without gate state.
pub fn validate_identity(check: &IdentityCheck<'_>, is_mock: bool) -> IdentityVerificationResult {
    let now = Utc::now();
    if is_mock {
        MockVerifier.verify(check, now)
    } else {
        RealVerifier.verify(check, now)
    }
}

/// Instructions shown before the submitter enters their CPF.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerificationInstructions {
    pub request_id: String,
    pub instructions: String,
}

/// Stateless instruction text for a verification attempt.
pub fn generate_identity_verification(request_id: &str) -> VerificationInstructions {
    VerificationInstructions {
        request_id: request_id.to_string(),
        instructions: format!(
            "To confirm your identity for request {request_id}:\n\
             1. Pay the PIX charge shown on screen using the bank account \
             registered under your CPF.\n\
             2. Enter the same CPF in the verification form.\n\
             3. Submit your request once the verification succeeds. \
             Each verification is valid for a single request."
        ),
    }
}
