// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Opaque Storage Module
//!
//! Persists sealed request blobs and non-sensitive metadata. Nothing this
//! module stores can be turned back into a request without the company's
//! private key, which never reaches the server.
//!
//! ## Storage Layout
//!
//! ```text
//! $DATA_DIR/
//!   companies/
//!     {company_id}.json      # Name, public key, fingerprint
//!   requests/
//!     {request_id}.json      # Type, status, timestamps, CPF hash
//!   ciphertexts/
//!     {request_id}.sealed    # crypto_box_seal output, write-once
//!   audit/
//!     {date}/events.jsonl    # Daily audit logs
//! ```
//!
//! ## Adapters
//!
//! - [`FsAdapter`] - the layout above, atomic writes, serialized registration
//! - [`InMemoryStore`] - same contract, process lifetime only

pub mod adapter;
pub mod audit;
pub mod memory;
pub mod opaque_fs;
pub mod paths;
pub mod repository;

pub use adapter::{FsAdapter, StorageAdapter};
pub use audit::{AuditEvent, AuditEventType, AuditRepository};
pub use memory::InMemoryStore;
pub use opaque_fs::{OpaqueStorage, StorageError, StorageResult};
pub use paths::StoragePaths;
pub use repository::{
    AccessKind, CompanyRepository, CompanyStatus, RequestRepository, RequestStatus,
    StoredCompany, StoredRequest,
};
