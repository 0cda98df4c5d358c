// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Identity Gate
//!
//! A CPF format check plus a mock "PIX payment" confirmation that must
//! succeed before a privacy request can be sealed and submitted.
//!
//! ## Flow
//!
//! 1. A PIX charge is created; its transaction id becomes the attempt id
//! 2. The gate issues instructions for that attempt (`UNVERIFIED`)
//! 3. The submitter enters their CPF; the configured verifier decides
//!    (`VERIFIED`, `FAILED`, or `EXPIRED` in real mode)
//! 4. The submit path consumes the verified attempt exactly once
//!
//! This is a believable friction step, not proof of personhood or payment.

pub mod accounts;
pub mod cpf;
pub mod gate;
pub mod pix;
pub mod verifier;

pub use accounts::{normalize_account, AccountDirectory, InMemoryAccounts};
pub use cpf::{mask_cpf, normalize_cpf, validate_cpf, CpfHasher};
pub use gate::{
    GateError, VerificationGate, VerificationState, VerifiedIdentity, DEFAULT_GATE_CAPACITY,
    DEFAULT_VERIFICATION_WINDOW,
};
pub use pix::{PixCharge, PixError, PixMockGateway};
pub use verifier::{
    generate_identity_verification, validate_identity, verifier_for, IdentityCheck,
    IdentityVerificationResult, IdentityVerifier, MockVerifier, RealVerifier,
    VerificationInstructions, VerifierMode,
};
