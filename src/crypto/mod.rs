// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Asymmetric Crypto Primitives
//!
//! Curve25519 sealed boxes and authenticated boxes (XSalsa20-Poly1305), plus
//! the hashing and fingerprint helpers used around them. The wire format is
//! libsodium-compatible, so ciphertexts produced by a browser running
//! `crypto_box_seal` open here and vice versa.
//!
//! ## Usage
//!
//! - [`sealed_box`] - anonymous encryption to a recipient public key
//! - [`authenticated`] - sender-authenticated encryption with an explicit nonce
//! - [`hash`] - deterministic digests and display fingerprints
//! - [`keys`] - key pairs and private key input handling
//!
//! Every operation that touches key material goes through
//! [`ensure_initialized`] first. The readiness check runs once per process;
//! concurrent first callers wait on the same initialization and all observe
//! its outcome.
//!
//! ## Security
//!
//! - Secret keys are zeroized on drop and never printed by `Debug`
//! - Authentication failures surface as [`CryptoError::DecryptionFailed`],
//!   never as empty plaintext
//! - Error messages do not say *why* a decryption failed

pub mod authenticated;
pub mod codec;
pub mod hash;
pub mod keys;
pub mod readiness;
pub mod sealed_box;

pub use authenticated::{
    decrypt_box, encrypt_box, generate_nonce, AuthenticatedCiphertext, NONCE_SIZE,
};
pub use hash::{hash_bytes, hash_data, key_fingerprint, FINGERPRINT_LEN};
pub use keys::{
    generate_key_pair, KeyPair, PublicKeyBytes, SecretKeyBytes, SecretKeyInput, KEY_SIZE,
};
pub use readiness::ensure_initialized;
pub use sealed_box::{decrypt_sealed_box, encrypt_sealed_box, open, seal, SEAL_OVERHEAD};

use thiserror::Error;

/// Errors raised by the crypto primitives.
///
/// `Clone` so the one-time readiness outcome can be handed to every waiter.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CryptoError {
    /// Input was not valid base64.
    #[error("Invalid base64 input: {0}")]
    Decode(String),

    /// Key decoded to the wrong number of bytes.
    #[error("Invalid key length: expected {expected} bytes, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    /// Nonce decoded to the wrong number of bytes.
    #[error("Invalid nonce length: expected {expected} bytes, got {actual}")]
    InvalidNonceLength { expected: usize, actual: usize },

    /// Authentication failed: wrong key or tampered ciphertext.
    #[error("Decryption failed: wrong key or corrupted data")]
    DecryptionFailed,

    /// Encryption could not be completed.
    #[error("Encryption failed")]
    EncryptionFailed,

    /// Decryption succeeded but the plaintext is not UTF-8 text.
    #[error("Decrypted payload is not valid UTF-8")]
    InvalidPlaintext,

    /// The process-wide readiness check failed.
    #[error("Crypto initialization failed: {0}")]
    Initialization(String),
}

impl CryptoError {
    /// Whether this is a malformed-input error (bad base64 or wrong size).
    pub fn is_decode_error(&self) -> bool {
        matches!(
            self,
            CryptoError::Decode(_)
                | CryptoError::InvalidKeyLength { .. }
                | CryptoError::InvalidNonceLength { .. }
        )
    }
}

/// Result type for crypto operations.
pub type Result<T> = std::result::Result<T, CryptoError>;
