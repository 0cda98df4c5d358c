// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Company Key Lifecycle
//!
//! A company generates one key pair on its own machine, keeps the private
//! key in a backup file it controls, and registers only the public key with
//! the server. Registration is one-shot per deployment. There is no
//! rotation and no recovery: a lost private key means the sealed requests
//! stay sealed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use zeroize::Zeroize;

use crate::crypto::{generate_key_pair, CryptoError, KeyPair, PublicKeyBytes, SecretKeyBytes};
use crate::pipeline::PipelineError;
use crate::storage::{StorageAdapter, StorageError, StoredCompany};

pub const BACKUP_INSTRUCTIONS: &str = "Store this file offline. The private key is the only way \
to decrypt privacy requests sent to your company. It is never sent to the server and cannot be \
recovered if lost. Compare the fingerprint with the one shown on the dashboard.";

/// Freshly generated company key material. Lives on the company's machine.
#[derive(Debug)]
pub struct CompanyKeyMaterial {
    pub company_name: String,
    pub key_pair: KeyPair,
    pub generated_at: DateTime<Utc>,
}

impl CompanyKeyMaterial {
    pub fn generate(company_name: &str) -> Result<Self, CryptoError> {
        Ok(Self {
            company_name: company_name.trim().to_string(),
            key_pair: generate_key_pair()?,
            generated_at: Utc::now(),
        })
    }

    pub fn fingerprint(&self) -> String {
        self.key_pair.public_key.fingerprint()
    }

    /// The export file handed to the operator.
    pub fn backup(&self) -> KeyBackup {
        KeyBackup {
            company_name: self.company_name.clone(),
            public_key: self.key_pair.public_key_base64(),
            private_key: self.key_pair.secret_key_base64(),
            fingerprint: self.fingerprint(),
            generated_at: self.generated_at,
            instructions: BACKUP_INSTRUCTIONS.to_string(),
        }
    }

    /// What gets sent to the server. Carries no secret.
    pub fn registration(&self) -> CompanyRegistration {
        CompanyRegistration {
            name: self.company_name.clone(),
            public_key: self.key_pair.public_key_base64(),
        }
    }
}

/// Key backup export format.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyBackup {
    pub company_name: String,
    pub public_key: String,
    pub private_key: String,
    pub fingerprint: String,
    pub generated_at: DateTime<Utc>,
    pub instructions: String,
}

impl KeyBackup {
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Parse the private key and check it belongs to the stored public key.
    pub fn secret_key(&self) -> Result<SecretKeyBytes, PipelineError> {
        let secret = SecretKeyBytes::from_base64(&self.private_key)
            .map_err(PipelineError::InvalidPrivateKey)?;
        let public =
            PublicKeyBytes::from_base64(&self.public_key).map_err(PipelineError::InvalidPublicKey)?;
        if secret.public_key() != public {
            return Err(PipelineError::KeyRejected);
        }
        Ok(secret)
    }
}

impl std::fmt::Debug for KeyBackup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyBackup")
            .field("company_name", &self.company_name)
            .field("fingerprint", &self.fingerprint)
            .field("private_key", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl Drop for KeyBackup {
    fn drop(&mut self) {
        self.private_key.zeroize();
    }
}

/// Company registration payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompanyRegistration {
    pub name: String,
    /// Base64 X25519 public key (standard or URL-safe alphabet)
    pub public_key: String,
}

/// Register the deployment's only company.
///
/// The key must decode to exactly 32 bytes and is stored in canonical
/// standard base64. A second registration fails with `KeyAlreadyRegistered`.
pub fn register_company(
    storage: &dyn StorageAdapter,
    registration: &CompanyRegistration,
) -> Result<StoredCompany, PipelineError> {
    let name = registration.name.trim();
    if name.is_empty() {
        return Err(PipelineError::InvalidRequest("company name is required".to_string()));
    }
    let public_key = PublicKeyBytes::from_base64(&registration.public_key)
        .map_err(PipelineError::InvalidPublicKey)?;

    let company_id = match storage.register_company(name, &public_key.to_base64()) {
        Ok(id) => id,
        Err(StorageError::AlreadyExists(_)) => return Err(PipelineError::KeyAlreadyRegistered),
        Err(e) => return Err(e.into()),
    };

    let company = storage
        .active_company()?
        .filter(|c| c.company_id == company_id)
        .ok_or_else(|| StorageError::NotFound(format!("Company {company_id}")))?;

    tracing::info!(
        company_id = %company.company_id,
        fingerprint = %company.fingerprint,
        "Company registered"
    );
    Ok(company)
}
