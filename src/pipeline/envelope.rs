// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Plaintext request envelope.
//!
//! Exists only in memory: built right before sealing on the submit side,
//! parsed right after opening on the company side.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use zeroize::Zeroizing;

use super::PipelineError;
use crate::identity::mask_cpf;
use crate::storage::AccessKind;

/// The fields a company sees once it opens a request.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RequestEnvelope {
    #[serde(rename = "type")]
    pub kind: AccessKind,
    pub reason: String,
    #[serde(default)]
    pub description: String,
    pub cpf: String,
    #[serde(default)]
    pub user_email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub request_id: String,
}

impl RequestEnvelope {
    /// Canonical JSON form. The buffer is wiped when dropped.
    pub fn to_json(&self) -> Result<Zeroizing<String>, PipelineError> {
        serde_json::to_string(self)
            .map(Zeroizing::new)
            .map_err(|_| PipelineError::EncryptionFailed)
    }

    /// Parse an opened envelope.
    pub fn from_json(json: &str) -> Result<Self, PipelineError> {
        serde_json::from_str(json).map_err(|e| PipelineError::Parse(e.to_string()))
    }
}

impl std::fmt::Debug for RequestEnvelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestEnvelope")
            .field("kind", &self.kind)
            .field("cpf", &mask_cpf(&self.cpf))
            .field("timestamp", &self.timestamp)
            .field("request_id", &self.request_id)
            .finish_non_exhaustive()
    }
}
