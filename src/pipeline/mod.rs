// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Request Encryption Pipeline
//!
//! Glue between the identity gate, the sealed box and the storage adapter.
//!
//! ## Submit
//!
//! A consumed [`VerifiedIdentity`](crate::identity::VerifiedIdentity) plus
//! the form fields become a [`RequestEnvelope`], which is sealed to the
//! active company's public key. Only the blob and non-sensitive metadata are
//! stored. Any crypto failure aborts the submission.
//!
//! ## Reveal
//!
//! The company supplies its private key locally. The key is checked against
//! one sample ciphertext before anything else is decrypted; after that each
//! record is opened independently and failures are counted, not fatal.

pub mod envelope;
pub mod reveal;
pub mod submit;

pub use envelope::RequestEnvelope;
pub use reveal::{
    load_sealed_records, parse_private_key, reveal_company_requests, RevealFailure,
    RevealFailureKind, RevealReport, RevealedRequest, SealedRecord, UnlockedSession,
};
pub use submit::{RequestSubmitter, SubmitReceipt, SubmitRequest};

use thiserror::Error;

use crate::crypto::CryptoError;
use crate::identity::GateError;
use crate::storage::StorageError;

/// Pipeline errors.
///
/// Messages are safe to show to users; none of them says why a decryption
/// failed.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Private key input did not decode to exactly 32 bytes.
    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(CryptoError),

    /// Registered or supplied public key is malformed.
    #[error("Invalid public key: {0}")]
    InvalidPublicKey(CryptoError),

    /// The private key failed to open the sample ciphertext.
    #[error("Decryption failed: wrong key or corrupted data")]
    KeyRejected,

    /// Decryption succeeded but the payload is not a request envelope.
    #[error("Request payload is corrupted")]
    Parse(String),

    /// Sealing failed; nothing was stored.
    #[error("Encryption failed")]
    EncryptionFailed,

    #[error(transparent)]
    Gate(#[from] GateError),

    /// The submitted CPF is not the one that passed verification.
    #[error("CPF does not match the verified identity")]
    IdentityMismatch,

    /// The request names a different account than the one verified.
    #[error("Account does not match the verified identity")]
    AccountMismatch,

    #[error("A company key is already registered")]
    KeyAlreadyRegistered,

    #[error("No company is registered")]
    CompanyNotRegistered,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::company::{register_company, CompanyKeyMaterial};
    use crate::identity::{CpfHasher, MockVerifier, VerificationGate, DEFAULT_VERIFICATION_WINDOW};
    use crate::storage::{AccessKind, FsAdapter, OpaqueStorage, StoragePaths};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn fs_adapter() -> (TempDir, FsAdapter) {
        let temp = TempDir::new().unwrap();
        let mut storage = OpaqueStorage::new(StoragePaths::new(temp.path()));
        storage.initialize().unwrap();
        (temp, FsAdapter::new(storage).unwrap())
    }

    #[tokio::test]
    async fn submit_then_reveal_with_backup() {
        let (_temp, adapter) = fs_adapter();
        let material = CompanyKeyMaterial::generate("Acme").unwrap();
        register_company(&adapter, &material.registration()).unwrap();

        let gate = VerificationGate::new(Arc::new(MockVerifier), DEFAULT_VERIFICATION_WINDOW, 8);
        gate.issue("tx");
        gate.verify("tx", "123.456.789-00", None).unwrap();
        let identity = gate.consume("tx").unwrap();

        let hasher = CpfHasher::new(b"k".to_vec());
        let receipt = RequestSubmitter::new(&adapter, &hasher)
            .submit(
                &identity,
                SubmitRequest {
                    kind: AccessKind::DataPortability,
                    reason: "Move my data".to_string(),
                    description: "Export as JSON".to_string(),
                    cpf: "123.456.789-00".to_string(),
                    user_email: None,
                },
            )
            .unwrap();

        let backup = material.backup();
        let report = reveal_company_requests(&adapter, &backup.private_key)
            .await
            .unwrap();
        assert_eq!(report.failure_count(), 0);
        assert_eq!(report.revealed[0].request_id, receipt.request_id);
        assert_eq!(report.revealed[0].envelope.kind, AccessKind::DataPortability);
        assert_eq!(report.revealed[0].envelope.description, "Export as JSON");

        let other = CompanyKeyMaterial::generate("Other").unwrap().backup();
        let refused = reveal_company_requests(&adapter, &other.private_key).await;
        assert!(matches!(refused, Err(PipelineError::KeyRejected)));
    }
}
