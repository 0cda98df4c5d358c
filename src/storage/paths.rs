// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Path constants and utilities for the opaque storage layout.

use std::path::{Path, PathBuf};

/// Default base directory for persistent storage.
pub const DATA_ROOT: &str = "/data";

/// Storage path utilities.
#[derive(Debug, Clone)]
pub struct StoragePaths {
    root: PathBuf,
}

impl Default for StoragePaths {
    fn default() -> Self {
        Self::new(DATA_ROOT)
    }
}

impl StoragePaths {
    /// Create a new StoragePaths with a custom root (useful for testing).
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Root directory for all data.
    pub fn root(&self) -> &Path {
        &self.root
    }

    // ========== Company Paths ==========

    /// Directory containing registered companies.
    pub fn companies_dir(&self) -> PathBuf {
        self.root.join("companies")
    }

    /// Path to a company record.
    pub fn company(&self, company_id: &str) -> PathBuf {
        self.companies_dir().join(format!("{company_id}.json"))
    }

    // ========== Request Paths ==========

    /// Directory containing request metadata.
    pub fn requests_dir(&self) -> PathBuf {
        self.root.join("requests")
    }

    /// Path to a request's metadata file.
    pub fn request_meta(&self, request_id: &str) -> PathBuf {
        self.requests_dir().join(format!("{request_id}.json"))
    }

    /// Directory containing sealed ciphertext blobs.
    pub fn ciphertexts_dir(&self) -> PathBuf {
        self.root.join("ciphertexts")
    }

    /// Path to a request's sealed blob.
    pub fn ciphertext(&self, request_id: &str) -> PathBuf {
        self.ciphertexts_dir().join(format!("{request_id}.sealed"))
    }

    // ========== Audit Log Paths ==========

    /// Directory containing audit logs.
    pub fn audit_dir(&self) -> PathBuf {
        self.root.join("audit")
    }

    /// Directory for a specific date's audit logs.
    pub fn audit_date_dir(&self, date: &str) -> PathBuf {
        self.audit_dir().join(date)
    }

    /// Path to a daily audit events file (JSONL format).
    pub fn audit_events_file(&self, date: &str) -> PathBuf {
        self.audit_date_dir(date).join("events.jsonl")
    }
}
