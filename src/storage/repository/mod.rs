// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Repository layer providing typed access to opaque storage.
//!
//! Each repository provides operations for a specific entity type,
//! using the OpaqueStorage for all file operations.

pub mod companies;
pub mod requests;

pub use companies::{CompanyRepository, CompanyStatus, StoredCompany};
pub use requests::{AccessKind, RequestRepository, RequestStatus, StoredRequest};
