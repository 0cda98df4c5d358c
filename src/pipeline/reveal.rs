// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Reveal path: the company opens its requests with a locally held key.
//!
//! Unlocking is strict: the key must decode to 32 bytes and open one sample
//! ciphertext, or the whole session is refused. Decrypting the batch is
//! lenient: each record stands alone and failures are reported per record.

use std::sync::Arc;

use serde::Serialize;
use utoipa::ToSchema;

use super::{PipelineError, RequestEnvelope, Result};
use crate::crypto::{open, PublicKeyBytes, SecretKeyBytes};
use crate::storage::StorageAdapter;

/// A stored request as the reveal path sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedRecord {
    pub request_id: String,
    pub ciphertext: Option<Vec<u8>>,
}

/// Why a single record could not be revealed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RevealFailureKind {
    /// Wrong key or tampered blob.
    Decryption,
    /// Opened fine but is not a request envelope.
    Parse,
    /// Metadata exists but no blob was stored.
    MissingCiphertext,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RevealFailure {
    pub request_id: String,
    pub kind: RevealFailureKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevealedRequest {
    pub request_id: String,
    pub envelope: RequestEnvelope,
}

/// Outcome of a batch reveal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RevealReport {
    pub revealed: Vec<RevealedRequest>,
    pub failures: Vec<RevealFailure>,
}

impl RevealReport {
    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    fn push(
        &mut self,
        request_id: String,
        outcome: std::result::Result<RequestEnvelope, RevealFailureKind>,
    ) {
        match outcome {
            Ok(envelope) => self.revealed.push(RevealedRequest {
                request_id,
                envelope,
            }),
            Err(kind) => {
                tracing::warn!(
                    request_id = %request_id,
                    kind = ?kind,
                    "Skipping request that could not be revealed"
                );
                self.failures.push(RevealFailure { request_id, kind });
            }
        }
    }
}

/// Parse a pasted private key.
///
/// Accepts standard and URL-safe base64, with or without padding. Anything
/// that does not decode to exactly 32 bytes is rejected here, before any
/// decryption is attempted.
pub fn parse_private_key(input: &str) -> Result<SecretKeyBytes> {
    SecretKeyBytes::from_base64(input).map_err(PipelineError::InvalidPrivateKey)
}

/// A private key that has been checked against the company's data.
pub struct UnlockedSession {
    public_key: PublicKeyBytes,
    secret_key: Arc<SecretKeyBytes>,
}

impl UnlockedSession {
    /// Validate `private_key` against the company public key.
    ///
    /// With a `sample` ciphertext the key must open it. Without one (no
    /// requests yet) the key must derive the registered public key.
    pub fn unlock(public_key: &str, private_key: &str, sample: Option<&[u8]>) -> Result<Self> {
        let secret_key = parse_private_key(private_key)?;
        let public_key =
            PublicKeyBytes::from_base64(public_key).map_err(PipelineError::InvalidPublicKey)?;

        match sample {
            Some(ciphertext) => {
                open(ciphertext, &public_key, &secret_key).map_err(|_| PipelineError::KeyRejected)?;
            }
            None if secret_key.public_key() != public_key => {
                return Err(PipelineError::KeyRejected);
            }
            None => {}
        }

        tracing::info!(fingerprint = %public_key.fingerprint(), "Company key unlocked");
        Ok(Self {
            public_key,
            secret_key: Arc::new(secret_key),
        })
    }

    pub fn public_key(&self) -> &PublicKeyBytes {
        &self.public_key
    }

    /// Open and parse one record.
    pub fn decrypt_one(
        &self,
        record: &SealedRecord,
    ) -> std::result::Result<RequestEnvelope, RevealFailureKind> {
        decrypt_record(&self.public_key, &self.secret_key, record)
    }

    /// Decrypt every record in order. Failures are collected, never fatal.
    pub fn decrypt_all(&self, records: &[SealedRecord]) -> RevealReport {
        let mut report = RevealReport::default();
        for record in records {
            report.push(record.request_id.clone(), self.decrypt_one(record));
        }
        report
    }

    /// Decrypt records on the blocking pool.
    ///
    /// Every task is awaited; a record whose task dies is reported as a
    /// decryption failure and its siblings are unaffected. Output order
    /// matches input order.
    pub async fn decrypt_all_concurrent(&self, records: Vec<SealedRecord>) -> RevealReport {
        let handles: Vec<_> = records
            .into_iter()
            .map(|record| {
                let public_key = self.public_key;
                let secret_key = Arc::clone(&self.secret_key);
                let request_id = record.request_id.clone();
                let handle = tokio::task::spawn_blocking(move || {
                    decrypt_record(&public_key, &secret_key, &record)
                });
                (request_id, handle)
            })
            .collect();

        let mut report = RevealReport::default();
        for (request_id, handle) in handles {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::error!(request_id = %request_id, error = %e, "Reveal task failed");
                    Err(RevealFailureKind::Decryption)
                }
            };
            report.push(request_id, outcome);
        }
        report
    }
}

fn decrypt_record(
    public_key: &PublicKeyBytes,
    secret_key: &SecretKeyBytes,
    record: &SealedRecord,
) -> std::result::Result<RequestEnvelope, RevealFailureKind> {
    let ciphertext = record
        .ciphertext
        .as_deref()
        .ok_or(RevealFailureKind::MissingCiphertext)?;
    let opened =
        open(ciphertext, public_key, secret_key).map_err(|_| RevealFailureKind::Decryption)?;
    let json = std::str::from_utf8(&opened).map_err(|_| RevealFailureKind::Parse)?;
    RequestEnvelope::from_json(json).map_err(|_| RevealFailureKind::Parse)
}

/// Fetch the company public key and every sealed record, newest first.
pub fn load_sealed_records(
    storage: &dyn StorageAdapter,
) -> Result<(String, String, Vec<SealedRecord>)> {
    let company = storage
        .active_company()?
        .ok_or(PipelineError::CompanyNotRegistered)?;

    let mut records = Vec::new();
    for meta in storage.list_requests_for_company(&company.company_id)? {
        let ciphertext = storage.get_ciphertext(&meta.request_id)?;
        records.push(SealedRecord {
            request_id: meta.request_id,
            ciphertext,
        });
    }
    Ok((company.company_id, company.public_key, records))
}

/// Load, unlock with the newest stored ciphertext, and decrypt everything.
pub async fn reveal_company_requests(
    storage: &dyn StorageAdapter,
    private_key: &str,
) -> Result<RevealReport> {
    let (company_id, public_key, records) = load_sealed_records(storage)?;
    let sample = records.iter().find_map(|r| r.ciphertext.as_deref());

    let session = UnlockedSession::unlock(&public_key, private_key, sample)?;
    let report = session.decrypt_all_concurrent(records).await;

    tracing::info!(
        company_id = %company_id,
        revealed = report.revealed.len(),
        failed = report.failure_count(),
        "Batch reveal finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{codec, generate_key_pair, seal, CryptoError, KeyPair};
    use crate::storage::AccessKind;

    fn sealed_envelope(pair: &KeyPair, id: &str) -> Vec<u8> {
        let envelope = RequestEnvelope {
            kind: AccessKind::DataAccess,
            reason: "copy".to_string(),
            description: String::new(),
            cpf: "123.456.789-00".to_string(),
            user_email: String::new(),
            timestamp: None,
            request_id: id.to_string(),
        };
        seal(envelope.to_json().unwrap().as_bytes(), &pair.public_key).unwrap()
    }

    fn record(id: &str, ciphertext: Option<Vec<u8>>) -> SealedRecord {
        SealedRecord {
            request_id: id.to_string(),
            ciphertext,
        }
    }

    #[test]
    fn key_size_is_checked_before_decrypting() {
        let pair = generate_key_pair().unwrap();
        let public = pair.public_key_base64();

        for len in [31usize, 33] {
            let pasted = codec::encode(&vec![7u8; len]);
            let result = UnlockedSession::unlock(&public, &pasted, Some(b"not even a ciphertext"));
            match result {
                Err(PipelineError::InvalidPrivateKey(CryptoError::InvalidKeyLength {
                    actual, ..
                })) => assert_eq!(actual, len),
                Err(other) => panic!("expected a key length error, got {other:?}"),
                Ok(_) => panic!("a {len}-byte key was accepted"),
            }
        }
    }

    #[test]
    fn url_safe_private_key_is_accepted() {
        let pair = generate_key_pair().unwrap();
        let url_safe = pair
            .secret_key_base64()
            .replace('+', "-")
            .replace('/', "_")
            .trim_end_matches('=')
            .to_string();

        let sample = sealed_envelope(&pair, "r1");
        let session = UnlockedSession::unlock(&pair.public_key_base64(), &url_safe, Some(&sample));
        assert!(session.is_ok());
    }

    #[test]
    fn wrong_key_is_rejected_at_unlock() {
        let company = generate_key_pair().unwrap();
        let other = generate_key_pair().unwrap();
        let sample = sealed_envelope(&company, "r1");

        let result = UnlockedSession::unlock(
            &company.public_key_base64(),
            &other.secret_key_base64(),
            Some(&sample),
        );
        assert!(matches!(result, Err(PipelineError::KeyRejected)));

        let no_sample =
            UnlockedSession::unlock(&company.public_key_base64(), &other.secret_key_base64(), None);
        assert!(matches!(no_sample, Err(PipelineError::KeyRejected)));
    }

    #[test]
    fn batch_tolerates_per_record_failures() {
        let company = generate_key_pair().unwrap();
        let stale = generate_key_pair().unwrap();

        let records = vec![
            record("ok-1", Some(sealed_envelope(&company, "ok-1"))),
            record("stale", Some(sealed_envelope(&stale, "stale"))),
            record("ok-2", Some(sealed_envelope(&company, "ok-2"))),
        ];

        let session = UnlockedSession::unlock(
            &company.public_key_base64(),
            &company.secret_key_base64(),
            records[0].ciphertext.as_deref(),
        )
        .unwrap();
        let report = session.decrypt_all(&records);

        assert_eq!(report.revealed.len(), 2);
        assert_eq!(report.failure_count(), 1);
        assert_eq!(report.failures[0].request_id, "stale");
        assert_eq!(report.failures[0].kind, RevealFailureKind::Decryption);
    }

    #[test]
    fn parse_and_missing_blob_are_reported_distinctly() {
        let company = generate_key_pair().unwrap();
        let garbage = seal(b"definitely not json", &company.public_key).unwrap();

        let session = UnlockedSession::unlock(
            &company.public_key_base64(),
            &company.secret_key_base64(),
            None,
        )
        .unwrap();
        let report = session.decrypt_all(&[record("junk", Some(garbage)), record("gone", None)]);

        assert!(report.revealed.is_empty());
        assert_eq!(report.failures[0].kind, RevealFailureKind::Parse);
        assert_eq!(report.failures[1].kind, RevealFailureKind::MissingCiphertext);
    }

    #[tokio::test]
    async fn concurrent_batch_matches_sequential() {
        let company = generate_key_pair().unwrap();
        let stale = generate_key_pair().unwrap();

        let mut records: Vec<_> = (0..16)
            .map(|i| {
                let id = format!("r-{i}");
                let sealed = sealed_envelope(&company, &id);
                record(&id, Some(sealed))
            })
            .collect();
        records[5] = record("r-5", Some(sealed_envelope(&stale, "r-5")));

        let session = UnlockedSession::unlock(
            &company.public_key_base64(),
            &company.secret_key_base64(),
            records[0].ciphertext.as_deref(),
        )
        .unwrap();

        let sequential = session.decrypt_all(&records);
        let concurrent = session.decrypt_all_concurrent(records).await;

        assert_eq!(concurrent, sequential);
        assert_eq!(concurrent.revealed.len(), 15);
        assert_eq!(concurrent.failures[0].request_id, "r-5");
    }
}
