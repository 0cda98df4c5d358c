// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Privacy request repository.
//!
//! ## Storage Layout
//!
//! ```text
//! /data/requests/{request_id}.json      # Non-sensitive metadata
//! /data/ciphertexts/{request_id}.sealed # Sealed envelope, write-once
//! ```
//!
//! ## Security
//!
//! - Metadata holds a keyed CPF hash, never the CPF itself
//! - The sealed blob is opaque to this process

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::super::{OpaqueStorage, StorageError, StorageResult};

/// Kind of privacy request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccessKind {
    DataAccess,
    DataDeletion,
    DataCorrection,
    DataPortability,
}

/// Processing status of a request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Rejected,
}

/// Request metadata. Everything here is visible to the operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StoredRequest {
    pub request_id: String,
    pub company_id: String,
    #[serde(rename = "type")]
    pub kind: AccessKind,
    pub status: RequestStatus,
    /// Keyed hash of the submitter's CPF
    pub cpf_hash: String,
    /// Identity gate audit hash
    pub verification_hash: String,
    pub mock_verification: bool,
    /// Reference to the sealed blob, once stored
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ciphertext_ref: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ciphertext_len: Option<usize>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Repository for request metadata and sealed blobs.
pub struct RequestRepository<'a> {
    storage: &'a OpaqueStorage,
}

impl<'a> RequestRepository<'a> {
    pub fn new(storage: &'a OpaqueStorage) -> Self {
        Self { storage }
    }

    pub fn exists(&self, request_id: &str) -> bool {
        self.storage.exists(self.storage.paths().request_meta(request_id))
    }

    pub fn get(&self, request_id: &str) -> StorageResult<StoredRequest> {
        let path = self.storage.paths().request_meta(request_id);
        if !self.storage.exists(&path) {
            return Err(StorageError::NotFound(format!("Request {request_id}")));
        }
        self.storage.read_json(path)
    }

    /// Create or replace the metadata record.
    pub fn put(&self, request: &StoredRequest) -> StorageResult<()> {
        self.storage
            .write_json(self.storage.paths().request_meta(&request.request_id), request)
    }

    /// All requests addressed to a company, newest first.
    pub fn list_by_company(&self, company_id: &str) -> StorageResult<Vec<StoredRequest>> {
        let ids = self
            .storage
            .list_files(self.storage.paths().requests_dir(), "json")?;

        let mut requests = Vec::new();
        for id in ids {
            let request = self.get(&id)?;
            if request.company_id == company_id {
                requests.push(request);
            }
        }
        requests.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(requests)
    }

    /// Store a sealed blob. A blob is written at most once per request.
    pub fn put_ciphertext(&self, request_id: &str, blob: &[u8]) -> StorageResult<String> {
        self.storage
            .write_raw_once(self.storage.paths().ciphertext(request_id), blob)?;
        Ok(request_id.to_string())
    }

    pub fn get_ciphertext(&self, request_id: &str) -> StorageResult<Option<Vec<u8>>> {
        match self.storage.read_raw(self.storage.paths().ciphertext(request_id)) {
            Ok(blob) => Ok(Some(blob)),
            Err(StorageError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
