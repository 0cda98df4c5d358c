// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Audit logging for security-sensitive operations.
//!
//! Company registration, identity gate outcomes, request submission and
//! ciphertext retrieval are recorded as JSONL under the data root. Events
//! carry identifiers and hashes only; never a CPF, an email or plaintext.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{OpaqueStorage, StorageError, StorageResult};

/// Types of auditable events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    // Company events
    CompanyRegistered,
    CompanyRegistrationRejected,

    // Identity gate events
    PixChargeCreated,
    IdentityVerified,
    IdentityVerificationFailed,
    IdentityVerificationExpired,

    // Request events
    RequestSubmitted,
    RequestRejected,
    CiphertextRetrieved,
    RequestsListed,
}

/// An audit log entry.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuditEvent {
    /// Unique event ID.
    pub event_id: String,
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
    /// Type of event.
    pub event_type: AuditEventType,
    /// Opaque actor identifier (company id, gate attempt id).
    pub actor: Option<String>,
    /// Resource affected (request_id, company_id).
    pub resource_id: Option<String>,
    /// Resource type (request, company, verification).
    pub resource_type: Option<String>,
    /// Additional details as JSON.
    #[schema(value_type = Option<Object>)]
    pub details: Option<serde_json::Value>,
    /// Whether the operation succeeded.
    pub success: bool,
    /// Error message if operation failed.
    pub error: Option<String>,
}

impl AuditEvent {
    pub fn new(event_type: AuditEventType) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event_type,
            actor: None,
            resource_id: None,
            resource_type: None,
            details: None,
            success: true,
            error: None,
        }
    }

    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }

    pub fn with_resource(
        mut self,
        resource_type: impl Into<String>,
        resource_id: impl Into<String>,
    ) -> Self {
        self.resource_type = Some(resource_type.into());
        self.resource_id = Some(resource_id.into());
        self
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Mark as failed with error message.
    pub fn failed(mut self, error: impl Into<String>) -> Self {
        self.success = false;
        self.error = Some(error.into());
        self
    }
}

/// Repository for audit events.
pub struct AuditRepository<'a> {
    storage: &'a OpaqueStorage,
}

impl<'a> AuditRepository<'a> {
    pub fn new(storage: &'a OpaqueStorage) -> Self {
        Self { storage }
    }

    /// Append an event to the daily JSONL file.
    pub fn log(&self, event: &AuditEvent) -> StorageResult<()> {
        let date = event.timestamp.format("%Y-%m-%d").to_string();
        let path = self.storage.paths().audit_events_file(&date);

        let mut line = serde_json::to_vec(event)?;
        line.push(b'\n');
        self.storage.append_raw(&path, &line)
    }

    /// Read audit events for a specific date.
    pub fn read_events(&self, date: &str) -> StorageResult<Vec<AuditEvent>> {
        let path = self.storage.paths().audit_events_file(date);
        let content = self.storage.read_raw(&path)?;

        let content = String::from_utf8(content).map_err(|e| {
            StorageError::IntegrityViolation(format!("Invalid UTF-8 in audit log: {e}"))
        })?;

        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(StorageError::from))
            .collect()
    }
}

/// Record an audit event if an audit store is configured.
///
/// `$storage` is an `Option<&OpaqueStorage>`; failures are logged and
/// otherwise ignored so auditing never fails a request.
#[macro_export]
macro_rules! audit_log {
    ($storage:expr, $event:expr) => {{
        if let Some(storage) = $storage {
            let repo = $crate::storage::AuditRepository::new(storage);
            if let Err(e) = repo.log(&$event) {
                tracing::warn!(error = %e, "Failed to write audit event");
            }
        }
    }};
    ($storage:expr, $event_type:expr, $resource_type:expr, $resource_id:expr) => {{
        $crate::audit_log!(
            $storage,
            $crate::storage::AuditEvent::new($event_type)
                .with_resource($resource_type, $resource_id)
        )
    }};
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StoragePaths;
    use tempfile::TempDir;

    fn setup() -> (TempDir, OpaqueStorage) {
        let temp = TempDir::new().unwrap();
        let paths = StoragePaths::new(temp.path());
        let mut storage = OpaqueStorage::new(paths);
        storage.initialize().unwrap();
        (temp, storage)
    }

    #[test]
    fn create_audit_event() {
        let event = AuditEvent::new(AuditEventType::RequestSubmitted)
            .with_actor("company_1")
            .with_resource("request", "req_abc");

        assert_eq!(event.event_type, AuditEventType::RequestSubmitted);
        assert_eq!(event.actor.as_deref(), Some("company_1"));
        assert_eq!(event.resource_type.as_deref(), Some("request"));
        assert_eq!(event.resource_id.as_deref(), Some("req_abc"));
        assert!(event.success);
    }

    #[test]
    fn failed_event() {
        let event = AuditEvent::new(AuditEventType::CompanyRegistrationRejected)
            .failed("already registered");

        assert!(!event.success);
        assert_eq!(event.error.as_deref(), Some("already registered"));
    }

    #[test]
    fn log_and_read_events() {
        let (_temp, storage) = setup();
        let repo = AuditRepository::new(&storage);

        repo.log(&AuditEvent::new(AuditEventType::CompanyRegistered).with_resource("company", "c1"))
            .unwrap();
        repo.log(&AuditEvent::new(AuditEventType::RequestSubmitted).with_resource("request", "r1"))
            .unwrap();

        let today = Utc::now().format("%Y-%m-%d").to_string();
        let events = repo.read_events(&today).unwrap();

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type, AuditEventType::CompanyRegistered);
        assert_eq!(events[1].event_type, AuditEventType::RequestSubmitted);
    }

    #[test]
    fn macro_is_noop_without_storage() {
        let none: Option<&OpaqueStorage> = None;
        crate::audit_log!(none, AuditEventType::RequestsListed, "company", "c1");

        let (_temp, storage) = setup();
        crate::audit_log!(Some(&storage), AuditEventType::RequestsListed, "company", "c1");
        let today = Utc::now().format("%Y-%m-%d").to_string();
        assert_eq!(AuditRepository::new(&storage).read_events(&today).unwrap().len(), 1);
    }
}
