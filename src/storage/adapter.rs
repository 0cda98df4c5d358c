// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Storage adapter seam between the request pipeline and persistence.
//!
//! The pipeline only ever hands the adapter sealed blobs and metadata, so
//! any implementation is zero-knowledge with respect to request contents.

use std::sync::Mutex;

use chrono::Utc;

use super::repository::{
    CompanyRepository, CompanyStatus, RequestRepository, StoredCompany, StoredRequest,
};
use super::{OpaqueStorage, StorageError, StorageResult};
use crate::crypto::key_fingerprint;

/// Persistence operations the request pipeline relies on.
pub trait StorageAdapter: Send + Sync {
    /// Store a sealed blob for a request. Returns the blob reference.
    fn put_ciphertext(&self, request_id: &str, blob: &[u8]) -> StorageResult<String>;

    fn get_ciphertext(&self, request_id: &str) -> StorageResult<Option<Vec<u8>>>;

    /// Create or replace request metadata.
    fn put_request_metadata(&self, metadata: &StoredRequest) -> StorageResult<()>;

    fn get_request_metadata(&self, request_id: &str) -> StorageResult<Option<StoredRequest>>;

    fn active_company(&self) -> StorageResult<Option<StoredCompany>>;

    /// Register the deployment's company. Fails if one is already active.
    fn register_company(&self, name: &str, public_key: &str) -> StorageResult<String>;

    /// Metadata for every request addressed to a company, newest first.
    fn list_requests_for_company(&self, company_id: &str) -> StorageResult<Vec<StoredRequest>>;

    /// Public key of the active company.
    fn get_company_public_key(&self) -> StorageResult<String> {
        self.active_company()?
            .map(|c| c.public_key)
            .ok_or_else(|| StorageError::NotFound("Active company".to_string()))
    }

    fn health_check(&self) -> StorageResult<()> {
        Ok(())
    }
}

/// Build the record for a newly registered company.
pub(crate) fn new_company(name: &str, public_key: &str) -> StorageResult<StoredCompany> {
    let name = name.trim();
    if name.is_empty() {
        return Err(StorageError::InvalidInput("company name is empty".to_string()));
    }
    if public_key.trim().is_empty() {
        return Err(StorageError::InvalidInput("public key is empty".to_string()));
    }

    Ok(StoredCompany {
        company_id: uuid::Uuid::new_v4().to_string(),
        name: name.to_string(),
        public_key: public_key.to_string(),
        fingerprint: key_fingerprint(public_key),
        status: CompanyStatus::Active,
        registered_at: Utc::now(),
    })
}

/// Filesystem-backed adapter.
pub struct FsAdapter {
    storage: OpaqueStorage,
    registration: Mutex<()>,
}

impl FsAdapter {
    /// Wrap an initialized storage root.
    pub fn new(storage: OpaqueStorage) -> StorageResult<Self> {
        if !storage.is_initialized() {
            return Err(StorageError::NotInitialized);
        }
        Ok(Self {
            storage,
            registration: Mutex::new(()),
        })
    }

    pub fn storage(&self) -> &OpaqueStorage {
        &self.storage
    }
}

impl StorageAdapter for FsAdapter {
    fn put_ciphertext(&self, request_id: &str, blob: &[u8]) -> StorageResult<String> {
        RequestRepository::new(&self.storage).put_ciphertext(request_id, blob)
    }

    fn get_ciphertext(&self, request_id: &str) -> StorageResult<Option<Vec<u8>>> {
        RequestRepository::new(&self.storage).get_ciphertext(request_id)
    }

    fn put_request_metadata(&self, metadata: &StoredRequest) -> StorageResult<()> {
        RequestRepository::new(&self.storage).put(metadata)
    }

    fn get_request_metadata(&self, request_id: &str) -> StorageResult<Option<StoredRequest>> {
        match RequestRepository::new(&self.storage).get(request_id) {
            Ok(request) => Ok(Some(request)),
            Err(StorageError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn active_company(&self) -> StorageResult<Option<StoredCompany>> {
        CompanyRepository::new(&self.storage).active()
    }

    fn register_company(&self, name: &str, public_key: &str) -> StorageResult<String> {
        let company = new_company(name, public_key)?;
        let _guard = self.registration.lock().unwrap_or_else(|e| e.into_inner());
        CompanyRepository::new(&self.storage).create(&company)?;
        Ok(company.company_id)
    }

    fn list_requests_for_company(&self, company_id: &str) -> StorageResult<Vec<StoredRequest>> {
        RequestRepository::new(&self.storage).list_by_company(company_id)
    }

    fn health_check(&self) -> StorageResult<()> {
        self.storage.health_check()
    }
}
