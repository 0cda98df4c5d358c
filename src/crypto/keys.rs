// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Curve25519 key material.
//!
//! Public keys are plain 32-byte values and freely copyable. Secret keys are
//! zeroized on drop, redacted in `Debug`, and intentionally not `Clone`;
//! share them behind an `Arc` when several tasks need the same key.

use crypto_box::{PublicKey, SecretKey};
use rand::rngs::OsRng;
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::{codec, ensure_initialized, hash::key_fingerprint, CryptoError, Result};

/// Size of Curve25519 public and secret keys in bytes.
pub const KEY_SIZE: usize = 32;

/// Curve25519 public key.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKeyBytes([u8; KEY_SIZE]);

impl PublicKeyBytes {
    /// Create from raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let arr = <[u8; KEY_SIZE]>::try_from(bytes).map_err(|_| CryptoError::InvalidKeyLength {
            expected: KEY_SIZE,
            actual: bytes.len(),
        })?;
        Ok(Self(arr))
    }

    /// Parse standard or URL-safe base64.
    pub fn from_base64(input: &str) -> Result<Self> {
        Ok(Self(codec::decode_array::<KEY_SIZE>(input)?))
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }

    pub fn to_base64(&self) -> String {
        codec::encode(&self.0)
    }

    /// Human-comparable fingerprint of the base64 form.
    pub fn fingerprint(&self) -> String {
        key_fingerprint(&self.to_base64())
    }

    pub(crate) fn to_box_key(self) -> PublicKey {
        PublicKey::from(self.0)
    }
}

impl std::fmt::Debug for PublicKeyBytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PublicKeyBytes({})", self.fingerprint())
    }
}

/// Curve25519 secret key.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SecretKeyBytes([u8; KEY_SIZE]);

impl SecretKeyBytes {
    /// Create from raw bytes. Anything other than exactly 32 bytes is rejected.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let arr = <[u8; KEY_SIZE]>::try_from(bytes).map_err(|_| CryptoError::InvalidKeyLength {
            expected: KEY_SIZE,
            actual: bytes.len(),
        })?;
        Ok(Self(arr))
    }

    /// Parse standard or URL-safe base64 (e.g. a key pasted by a user).
    pub fn from_base64(input: &str) -> Result<Self> {
        let mut bytes = codec::decode(input)?;
        let parsed = Self::from_bytes(&bytes);
        bytes.zeroize();
        parsed
    }

    /// Derive the matching public key.
    pub fn public_key(&self) -> PublicKeyBytes {
        PublicKeyBytes(*self.to_box_key().public_key().as_bytes())
    }

    /// Base64 form, for the local key backup only.
    pub fn to_base64(&self) -> String {
        codec::encode(&self.0)
    }

    pub(crate) fn to_box_key(&self) -> SecretKey {
        SecretKey::from(self.0)
    }
}

impl std::fmt::Debug for SecretKeyBytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SecretKeyBytes([REDACTED])")
    }
}

/// A secret key as handed to a decrypt call.
///
/// Browsers paste base64; host key stores hand over raw bytes; in-process
/// callers already hold a parsed key.
#[derive(Debug, Clone, Copy)]
pub enum SecretKeyInput<'a> {
    Base64(&'a str),
    Raw(&'a [u8]),
    Parsed(&'a SecretKeyBytes),
}

impl SecretKeyInput<'_> {
    pub(crate) fn to_box_key(self) -> Result<SecretKey> {
        match self {
            SecretKeyInput::Base64(s) => Ok(SecretKeyBytes::from_base64(s)?.to_box_key()),
            SecretKeyInput::Raw(b) => Ok(SecretKeyBytes::from_bytes(b)?.to_box_key()),
            SecretKeyInput::Parsed(k) => Ok(k.to_box_key()),
        }
    }
}

impl<'a> From<&'a str> for SecretKeyInput<'a> {
    fn from(value: &'a str) -> Self {
        SecretKeyInput::Base64(value)
    }
}

impl<'a> From<&'a String> for SecretKeyInput<'a> {
    fn from(value: &'a String) -> Self {
        SecretKeyInput::Base64(value.as_str())
    }
}

impl<'a> From<&'a [u8]> for SecretKeyInput<'a> {
    fn from(value: &'a [u8]) -> Self {
        SecretKeyInput::Raw(value)
    }
}

impl<'a> From<&'a [u8; KEY_SIZE]> for SecretKeyInput<'a> {
    fn from(value: &'a [u8; KEY_SIZE]) -> Self {
        SecretKeyInput::Raw(value.as_slice())
    }
}

impl<'a> From<&'a SecretKeyBytes> for SecretKeyInput<'a> {
    fn from(value: &'a SecretKeyBytes) -> Self {
        SecretKeyInput::Parsed(value)
    }
}

/// A Curve25519 key pair.
#[derive(Debug)]
pub struct KeyPair {
    pub public_key: PublicKeyBytes,
    pub secret_key: SecretKeyBytes,
}

impl KeyPair {
    pub fn public_key_base64(&self) -> String {
        self.public_key.to_base64()
    }

    pub fn secret_key_base64(&self) -> String {
        self.secret_key.to_base64()
    }
}

/// Generate a fresh, uniformly random key pair.
pub fn generate_key_pair() -> Result<KeyPair> {
    ensure_initialized()?;
    let secret = SecretKey::generate(&mut OsRng);
    let public_key = PublicKeyBytes(*secret.public_key().as_bytes());
    Ok(KeyPair {
        public_key,
        secret_key: SecretKeyBytes(secret.to_bytes()),
    })
}
