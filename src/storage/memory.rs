// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-memory storage adapter.
//!
//! Used when no data directory is configured and throughout the tests.
//! Contents are lost on restart.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::adapter::{new_company, StorageAdapter};
use super::repository::{CompanyStatus, StoredCompany, StoredRequest};
use super::{StorageError, StorageResult};

#[derive(Default)]
struct Inner {
    companies: Vec<StoredCompany>,
    requests: HashMap<String, StoredRequest>,
    ciphertexts: HashMap<String, Vec<u8>>,
}

#[derive(Default)]
pub struct InMemoryStore {
    inner: RwLock<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl StorageAdapter for InMemoryStore {
    fn put_ciphertext(&self, request_id: &str, blob: &[u8]) -> StorageResult<String> {
        let mut inner = self.write();
        if inner.ciphertexts.contains_key(request_id) {
            return Err(StorageError::AlreadyExists(format!("Ciphertext {request_id}")));
        }
        inner
            .ciphertexts
            .insert(request_id.to_string(), blob.to_vec());
        Ok(request_id.to_string())
    }

    fn get_ciphertext(&self, request_id: &str) -> StorageResult<Option<Vec<u8>>> {
        Ok(self.read().ciphertexts.get(request_id).cloned())
    }

    fn put_request_metadata(&self, metadata: &StoredRequest) -> StorageResult<()> {
        self.write()
            .requests
            .insert(metadata.request_id.clone(), metadata.clone());
        Ok(())
    }

    fn get_request_metadata(&self, request_id: &str) -> StorageResult<Option<StoredRequest>> {
        Ok(self.read().requests.get(request_id).cloned())
    }

    fn active_company(&self) -> StorageResult<Option<StoredCompany>> {
        Ok(self
            .read()
            .companies
            .iter()
            .find(|c| c.status == CompanyStatus::Active)
            .cloned())
    }

    fn register_company(&self, name: &str, public_key: &str) -> StorageResult<String> {
        let company = new_company(name, public_key)?;
        let mut inner = self.write();
        if let Some(active) = inner
            .companies
            .iter()
            .find(|c| c.status == CompanyStatus::Active)
        {
            return Err(StorageError::AlreadyExists(format!(
                "Active company {}",
                active.company_id
            )));
        }
        let id = company.company_id.clone();
        inner.companies.push(company);
        Ok(id)
    }

    fn list_requests_for_company(&self, company_id: &str) -> StorageResult<Vec<StoredRequest>> {
        let mut requests: Vec<StoredRequest> = self
            .read()
            .requests
            .values()
            .filter(|r| r.company_id == company_id)
            .cloned()
            .collect();
        requests.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(requests)
    }
}
