// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::crypto::CryptoError;
use crate::identity::{GateError, PixError};
use crate::pipeline::PipelineError;
use crate::storage::StorageError;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    pub fn gone(message: impl Into<String>) -> Self {
        Self::new(StatusCode::GONE, message)
    }

    pub fn unprocessable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.message,
        });
        (self.status, body).into_response()
    }
}

impl From<StorageError> for ApiError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::NotFound(entity) => ApiError::not_found(format!("Not found: {entity}")),
            StorageError::AlreadyExists(entity) => {
                ApiError::conflict(format!("Already exists: {entity}"))
            }
            StorageError::InvalidInput(msg) => ApiError::bad_request(msg),
            other => {
                tracing::error!(error = %other, "Storage failure");
                ApiError::internal("Storage error")
            }
        }
    }
}

impl From<CryptoError> for ApiError {
    fn from(e: CryptoError) -> Self {
        match e {
            CryptoError::Decode(_)
            | CryptoError::InvalidKeyLength { .. }
            | CryptoError::InvalidNonceLength { .. } => ApiError::bad_request(e.to_string()),
            CryptoError::DecryptionFailed | CryptoError::InvalidPlaintext => {
                ApiError::unprocessable(CryptoError::DecryptionFailed.to_string())
            }
            CryptoError::EncryptionFailed => ApiError::unprocessable("Encryption failed"),
            CryptoError::Initialization(_) => {
                tracing::error!(error = %e, "Crypto backend unavailable");
                ApiError::internal("Crypto backend unavailable")
            }
        }
    }
}

impl From<GateError> for ApiError {
    fn from(e: GateError) -> Self {
        match e {
            GateError::Unknown(_) => ApiError::not_found("Verification not found"),
            GateError::VerificationFailed | GateError::NotVerified => {
                ApiError::forbidden(e.to_string())
            }
            GateError::VerificationExpired => ApiError::gone(e.to_string()),
            GateError::AlreadyAttempted | GateError::AlreadyConsumed => {
                ApiError::conflict(e.to_string())
            }
        }
    }
}

impl From<PixError> for ApiError {
    fn from(e: PixError) -> Self {
        ApiError::bad_request(e.to_string())
    }
}

impl From<PipelineError> for ApiError {
    fn from(e: PipelineError) -> Self {
        match e {
            PipelineError::InvalidPrivateKey(_)
            | PipelineError::InvalidPublicKey(_)
            | PipelineError::InvalidRequest(_) => ApiError::bad_request(e.to_string()),
            PipelineError::KeyRejected => ApiError::unprocessable(e.to_string()),
            PipelineError::Parse(_) => ApiError::unprocessable(e.to_string()),
            PipelineError::EncryptionFailed => ApiError::unprocessable(e.to_string()),
            PipelineError::Gate(gate) => gate.into(),
            PipelineError::IdentityMismatch | PipelineError::AccountMismatch => {
                ApiError::forbidden(e.to_string())
            }
            PipelineError::KeyAlreadyRegistered => ApiError::conflict(e.to_string()),
            PipelineError::CompanyNotRegistered => ApiError::not_found(e.to_string()),
            PipelineError::Storage(storage) => storage.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[test]
    fn constructors_set_status_and_message() {
        let nf = ApiError::not_found("missing");
        assert_eq!(nf.status, StatusCode::NOT_FOUND);
        assert_eq!(nf.message, "missing");

        assert_eq!(ApiError::conflict("x").status, StatusCode::CONFLICT);
        assert_eq!(ApiError::gone("x").status, StatusCode::GONE);
        assert_eq!(ApiError::forbidden("x").status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn into_response_returns_json_body() {
        let response = ApiError::bad_request("bad data").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8(body_bytes.to_vec()).unwrap();
        assert_eq!(body, r#"{"error":"bad data"}"#);
    }

    #[test]
    fn domain_errors_map_to_status() {
        let cases: Vec<(ApiError, StatusCode)> = vec![
            (PipelineError::KeyAlreadyRegistered.into(), StatusCode::CONFLICT),
            (GateError::VerificationExpired.into(), StatusCode::GONE),
            (GateError::VerificationFailed.into(), StatusCode::FORBIDDEN),
            (CryptoError::Decode("x".into()).into(), StatusCode::BAD_REQUEST),
            (CryptoError::DecryptionFailed.into(), StatusCode::UNPROCESSABLE_ENTITY),
            (PipelineError::CompanyNotRegistered.into(), StatusCode::NOT_FOUND),
            (PipelineError::AccountMismatch.into(), StatusCode::FORBIDDEN),
            (
                StorageError::Io(std::io::Error::other("disk")).into(),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (error, status) in cases {
            assert_eq!(error.status, status, "{}", error.message);
        }
    }

    #[test]
    fn internal_details_are_not_leaked() {
        let error: ApiError = StorageError::Io(std::io::Error::other("/srv/secret/path")).into();
        assert!(!error.message.contains("/srv"));

        let error: ApiError = CryptoError::InvalidPlaintext.into();
        assert_eq!(error.message, "Decryption failed: wrong key or corrupted data");
    }
}
