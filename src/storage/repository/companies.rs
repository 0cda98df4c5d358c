// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Company repository.
//!
//! A deployment serves exactly one active company. Only the company's
//! public key is stored; the matching private key never reaches the server.
//!
//! ## Storage Layout
//!
//! ```text
//! /data/companies/{company_id}.json
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::super::{OpaqueStorage, StorageError, StorageResult};

/// Company registration status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum CompanyStatus {
    /// Receives new requests
    #[default]
    Active,
    /// Replaced by an administrator outside this service
    Retired,
}

/// Company record stored as JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct StoredCompany {
    /// Unique company identifier (UUID)
    pub company_id: String,
    /// Display name
    pub name: String,
    /// Base64 X25519 public key requests are sealed to
    pub public_key: String,
    /// Human-checkable key fingerprint
    pub fingerprint: String,
    pub status: CompanyStatus,
    pub registered_at: DateTime<Utc>,
}

/// Repository for company records.
pub struct CompanyRepository<'a> {
    storage: &'a OpaqueStorage,
}

impl<'a> CompanyRepository<'a> {
    pub fn new(storage: &'a OpaqueStorage) -> Self {
        Self { storage }
    }

    pub fn exists(&self, company_id: &str) -> bool {
        self.storage.exists(self.storage.paths().company(company_id))
    }

    pub fn get(&self, company_id: &str) -> StorageResult<StoredCompany> {
        let path = self.storage.paths().company(company_id);
        if !self.storage.exists(&path) {
            return Err(StorageError::NotFound(format!("Company {company_id}")));
        }
        self.storage.read_json(path)
    }

    pub fn list_all(&self) -> StorageResult<Vec<StoredCompany>> {
        let ids = self
            .storage
            .list_files(self.storage.paths().companies_dir(), "json")?;

        let mut companies = Vec::with_capacity(ids.len());
        for id in ids {
            companies.push(self.get(&id)?);
        }
        Ok(companies)
    }

    /// The active company, if one has been registered.
    pub fn active(&self) -> StorageResult<Option<StoredCompany>> {
        Ok(self
            .list_all()?
            .into_iter()
            .find(|c| c.status == CompanyStatus::Active))
    }

    /// Persist a new active company.
    ///
    /// Fails with `AlreadyExists` if any company is already active. Callers
    /// serialize registrations so the check and the write do not race.
    pub fn create(&self, company: &StoredCompany) -> StorageResult<()> {
        if let Some(active) = self.active()? {
            return Err(StorageError::AlreadyExists(format!(
                "Active company {}",
                active.company_id
            )));
        }
        if self.exists(&company.company_id) {
            return Err(StorageError::AlreadyExists(format!(
                "Company {}",
                company.company_id
            )));
        }

        self.storage
            .write_json(self.storage.paths().company(&company.company_id), company)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StoragePaths;
    use tempfile::TempDir;

    fn setup() -> (TempDir, OpaqueStorage) {
        let temp = TempDir::new().unwrap();
        let mut storage = OpaqueStorage::new(StoragePaths::new(temp.path()));
        storage.initialize().unwrap();
        (temp, storage)
    }

    fn company(id: &str) -> StoredCompany {
        StoredCompany {
            company_id: id.to_string(),
            name: "Acme Ltda".to_string(),
            public_key: "pk".to_string(),
            fingerprint: "PK".to_string(),
            status: CompanyStatus::Active,
            registered_at: Utc::now(),
        }
    }

    #[test]
    fn create_and_get() {
        let (_temp, storage) = setup();
        let repo = CompanyRepository::new(&storage);

        assert!(repo.active().unwrap().is_none());
        repo.create(&company("c1")).unwrap();

        assert!(repo.exists("c1"));
        assert_eq!(repo.get("c1").unwrap().name, "Acme Ltda");
        assert_eq!(repo.active().unwrap().unwrap().company_id, "c1");
    }

    #[test]
    fn second_active_company_is_rejected() {
        let (_temp, storage) = setup();
        let repo = CompanyRepository::new(&storage);

        repo.create(&company("c1")).unwrap();
        let result = repo.create(&company("c2"));

        assert!(matches!(result, Err(StorageError::AlreadyExists(_))));
        assert!(!repo.exists("c2"));
    }

    #[test]
    fn retired_company_does_not_block_registration() {
        let (_temp, storage) = setup();
        let repo = CompanyRepository::new(&storage);

        let mut retired = company("old");
        retired.status = CompanyStatus::Retired;
        storage
            .write_json(storage.paths().company("old"), &retired)
            .unwrap();

        repo.create(&company("new")).unwrap();
        assert_eq!(repo.active().unwrap().unwrap().company_id, "new");
        assert_eq!(repo.list_all().unwrap().len(), 2);
    }

    #[test]
    fn get_missing_company() {
        let (_temp, storage) = setup();
        let repo = CompanyRepository::new(&storage);
        assert!(matches!(repo.get("nope"), Err(StorageError::NotFound(_))));
    }
}
