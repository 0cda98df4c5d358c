// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Submit path: verified identity + form fields -> sealed blob + metadata.

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use super::{PipelineError, RequestEnvelope, Result};
use crate::crypto::{seal, PublicKeyBytes};
use crate::identity::{normalize_account, normalize_cpf, validate_cpf, CpfHasher, VerifiedIdentity};
use crate::storage::{AccessKind, RequestStatus, StorageAdapter, StoredCompany, StoredRequest};

const MAX_REASON: usize = 500;
const MAX_DESCRIPTION: usize = 5_000;

/// Form fields supplied by the data subject.
#[derive(Clone)]
pub struct SubmitRequest {
    pub kind: AccessKind,
    pub reason: String,
    pub description: String,
    pub cpf: String,
    pub user_email: Option<String>,
}

/// What the submitter gets back. Never includes plaintext.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitReceipt {
    pub request_id: String,
    pub encrypted: bool,
    pub company_id: String,
    pub ciphertext_len: usize,
    pub created_at: DateTime<Utc>,
}

/// Seals requests for the active company and hands them to storage.
pub struct RequestSubmitter<'a> {
    storage: &'a dyn StorageAdapter,
    cpf_hasher: &'a CpfHasher,
}

impl<'a> RequestSubmitter<'a> {
    pub fn new(storage: &'a dyn StorageAdapter, cpf_hasher: &'a CpfHasher) -> Self {
        Self {
            storage,
            cpf_hasher,
        }
    }

    /// Everything `submit` checks before sealing: form fields, the CPF and
    /// account against the verified identity, and the company key.
    ///
    /// Run it on an unspent identity so a request that cannot be stored
    /// does not use up the verification.
    pub fn check(&self, identity: &VerifiedIdentity, request: &SubmitRequest) -> Result<()> {
        self.prepare(identity, request).map(|_| ())
    }

    /// Seal and store one request.
    ///
    /// `identity` must come from consuming a verified gate attempt; its CPF
    /// has to match the one typed into the form.
    pub fn submit(
        &self,
        identity: &VerifiedIdentity,
        request: SubmitRequest,
    ) -> Result<SubmitReceipt> {
        self.submit_at(identity, request, Utc::now())
    }

    fn prepare(
        &self,
        identity: &VerifiedIdentity,
        request: &SubmitRequest,
    ) -> Result<(StoredCompany, PublicKeyBytes)> {
        request.validate()?;
        if normalize_cpf(&request.cpf) != identity.cpf() {
            return Err(PipelineError::IdentityMismatch);
        }
        if let Some(account) = identity.account() {
            let named = request.user_email.as_deref().map(normalize_account);
            if named.as_deref() != Some(account) {
                return Err(PipelineError::AccountMismatch);
            }
        }

        let company = self
            .storage
            .active_company()?
            .ok_or(PipelineError::CompanyNotRegistered)?;
        let recipient = PublicKeyBytes::from_base64(&company.public_key)
            .map_err(PipelineError::InvalidPublicKey)?;
        Ok((company, recipient))
    }

    pub fn submit_at(
        &self,
        identity: &VerifiedIdentity,
        request: SubmitRequest,
        now: DateTime<Utc>,
    ) -> Result<SubmitReceipt> {
        let (company, recipient) = self.prepare(identity, &request)?;

        let request_id = uuid::Uuid::new_v4().to_string();
        let envelope = RequestEnvelope {
            kind: request.kind,
            reason: request.reason.trim().to_string(),
            description: request.description.trim().to_string(),
            cpf: request.cpf.trim().to_string(),
            user_email: request.user_email.unwrap_or_default(),
            timestamp: Some(now),
            request_id: request_id.clone(),
        };

        let plaintext = envelope.to_json()?;
        let sealed = seal(plaintext.as_bytes(), &recipient).map_err(|e| {
            tracing::warn!(request_id = %request_id, error = %e, "Sealing request failed");
            PipelineError::EncryptionFailed
        })?;
        drop(plaintext);

        let ciphertext_ref = self.storage.put_ciphertext(&request_id, &sealed)?;
        let metadata = StoredRequest {
            request_id: request_id.clone(),
            company_id: company.company_id.clone(),
            kind: request.kind,
            status: RequestStatus::Pending,
            cpf_hash: self.cpf_hasher.hash(identity.cpf()),
            verification_hash: identity.verification_hash().to_string(),
            mock_verification: identity.is_mock(),
            ciphertext_ref: Some(ciphertext_ref),
            ciphertext_len: Some(sealed.len()),
            created_at: now,
            updated_at: now,
        };
        self.storage.put_request_metadata(&metadata)?;

        tracing::info!(
            request_id = %request_id,
            company_id = %company.company_id,
            kind = ?request.kind,
            bytes = sealed.len(),
            "Request sealed and stored"
        );

        Ok(SubmitReceipt {
            request_id,
            encrypted: true,
            company_id: company.company_id,
            ciphertext_len: sealed.len(),
            created_at: now,
        })
    }
}

impl SubmitRequest {
    /// Field checks that need no identity or storage.
    pub fn validate(&self) -> Result<()> {
        let reason = self.reason.trim();
        if reason.is_empty() {
            return Err(PipelineError::InvalidRequest("reason is required".to_string()));
        }
        if reason.chars().count() > MAX_REASON {
            return Err(PipelineError::InvalidRequest(format!(
                "reason exceeds {MAX_REASON} characters"
            )));
        }
        if self.description.trim().chars().count() > MAX_DESCRIPTION {
            return Err(PipelineError::InvalidRequest(format!(
                "description exceeds {MAX_DESCRIPTION} characters"
            )));
        }
        if !validate_cpf(&self.cpf) {
            return Err(PipelineError::InvalidRequest("CPF is malformed".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{generate_key_pair, open, SEAL_OVERHEAD};
    use crate::identity::{MockVerifier, VerificationGate, DEFAULT_VERIFICATION_WINDOW};
    use crate::storage::InMemoryStore;
    use std::sync::Arc;

    fn verified(cpf: &str) -> VerifiedIdentity {
        let gate = VerificationGate::new(Arc::new(MockVerifier), DEFAULT_VERIFICATION_WINDOW, 4);
        gate.issue("tx");
        gate.verify("tx", cpf, None).unwrap();
        gate.consume("tx").unwrap()
    }

    fn form(cpf: &str) -> SubmitRequest {
        SubmitRequest {
            kind: AccessKind::DataAccess,
            reason: "I want a copy".to_string(),
            description: String::new(),
            cpf: cpf.to_string(),
            user_email: Some("ana@example.com".to_string()),
        }
    }

    #[test]
    fn seals_to_company_key_and_stores_hash_only() {
        let store = InMemoryStore::new();
        let hasher = CpfHasher::new(b"test-key".to_vec());
        let pair = generate_key_pair().unwrap();
        store
            .register_company("Acme", &pair.public_key_base64())
            .unwrap();

        let identity = verified("123.456.789-00");
        let receipt = RequestSubmitter::new(&store, &hasher)
            .submit(&identity, form("123.456.789-00"))
            .unwrap();
        assert!(receipt.encrypted);

        let blob = store.get_ciphertext(&receipt.request_id).unwrap().unwrap();
        assert_eq!(blob.len(), receipt.ciphertext_len);
        assert!(blob.len() > SEAL_OVERHEAD);

        let opened = open(&blob, &pair.public_key, &pair.secret_key).unwrap();
        let envelope = RequestEnvelope::from_json(std::str::from_utf8(&opened).unwrap()).unwrap();
        assert_eq!(envelope.cpf, "123.456.789-00");
        assert_eq!(envelope.request_id, receipt.request_id);
        assert_eq!(envelope.user_email, "ana@example.com");

        let meta = store
            .get_request_metadata(&receipt.request_id)
            .unwrap()
            .unwrap();
        assert_eq!(meta.cpf_hash, hasher.hash("12345678900"));
        assert!(meta.mock_verification);
        let serialized = serde_json::to_string(&meta).unwrap();
        assert!(!serialized.contains("12345678900"));
        assert!(!serialized.contains("123.456.789-00"));
    }

    #[test]
    fn cpf_must_match_verified_identity() {
        let store = InMemoryStore::new();
        let hasher = CpfHasher::new(b"k".to_vec());
        store
            .register_company("Acme", &generate_key_pair().unwrap().public_key_base64())
            .unwrap();

        let identity = verified("123.456.789-00");
        let result =
            RequestSubmitter::new(&store, &hasher).submit(&identity, form("529.982.247-25"));
        assert!(matches!(result, Err(PipelineError::IdentityMismatch)));
    }

    #[test]
    fn account_must_match_verified_account() {
        let store = InMemoryStore::new();
        let hasher = CpfHasher::new(b"k".to_vec());
        store
            .register_company("Acme", &generate_key_pair().unwrap().public_key_base64())
            .unwrap();

        let gate = VerificationGate::new(Arc::new(MockVerifier), DEFAULT_VERIFICATION_WINDOW, 4);
        gate.issue("tx");
        gate.verify_account("tx", "123.456.789-00", "Ana@Example.com", None)
            .unwrap();
        let identity = gate.consume("tx").unwrap();
        let submitter = RequestSubmitter::new(&store, &hasher);

        let mut other = form("123.456.789-00");
        other.user_email = Some("bruno@example.com".to_string());
        assert!(matches!(
            submitter.submit(&identity, other),
            Err(PipelineError::AccountMismatch)
        ));

        let mut missing = form("123.456.789-00");
        missing.user_email = None;
        assert!(matches!(
            submitter.check(&identity, &missing),
            Err(PipelineError::AccountMismatch)
        ));

        submitter
            .submit(&identity, form("123.456.789-00"))
            .expect("same account, different case");
    }

    #[test]
    fn check_stores_nothing() {
        let store = InMemoryStore::new();
        let hasher = CpfHasher::new(b"k".to_vec());
        let submitter = RequestSubmitter::new(&store, &hasher);
        let identity = verified("123.456.789-00");

        assert!(matches!(
            submitter.check(&identity, &form("12345678900")),
            Err(PipelineError::CompanyNotRegistered)
        ));

        store
            .register_company("Acme", &generate_key_pair().unwrap().public_key_base64())
            .unwrap();
        submitter.check(&identity, &form("12345678900")).unwrap();

        let company = store.active_company().unwrap().unwrap();
        assert!(store
            .list_requests_for_company(&company.company_id)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn requires_registered_company() {
        let store = InMemoryStore::new();
        let hasher = CpfHasher::new(b"k".to_vec());
        let result = RequestSubmitter::new(&store, &hasher)
            .submit(&verified("123.456.789-00"), form("12345678900"));
        assert!(matches!(result, Err(PipelineError::CompanyNotRegistered)));
    }

    #[test]
    fn malformed_company_key_aborts_without_storing() {
        let store = InMemoryStore::new();
        let hasher = CpfHasher::new(b"k".to_vec());
        store.register_company("Acme", "c2hvcnQ=").unwrap();

        let result = RequestSubmitter::new(&store, &hasher)
            .submit(&verified("123.456.789-00"), form("12345678900"));
        assert!(matches!(result, Err(PipelineError::InvalidPublicKey(_))));

        let company = store.active_company().unwrap().unwrap();
        assert!(store
            .list_requests_for_company(&company.company_id)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn empty_reason_is_rejected() {
        let store = InMemoryStore::new();
        let hasher = CpfHasher::new(b"k".to_vec());
        let mut request = form("12345678900");
        request.reason = "   ".to_string();

        let result =
            RequestSubmitter::new(&store, &hasher).submit(&verified("12345678900"), request);
        assert!(matches!(result, Err(PipelineError::InvalidRequest(_))));
    }
}
